//! 16-bit stereo WAV via hound.

use crate::error::{ExportError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use loopwave_core::StereoWaveform;
use std::io::{Seek, Write};
use std::path::Path;

const BITS_PER_SAMPLE: u16 = 16;

/// Float sample to 16-bit PCM with clipping.
#[inline]
pub fn to_pcm16(sample: f32) -> i16 {
    let clamped = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    (clamped * 32767.0) as i16
}

/// Write `wave` as 16-bit stereo PCM.
///
/// `sample_rate` must match the waveform's own rate.
pub fn write_audio(path: impl AsRef<Path>, sample_rate: u32, wave: &StereoWaveform) -> Result<()> {
    let path = path.as_ref();
    check_rate(sample_rate, wave)?;

    let mut writer = WavWriter::create(path, spec(sample_rate))?;
    write_samples(&mut writer, wave)?;
    writer.finalize()?;

    tracing::info!(
        "Wrote {} ({} frames, {:.2}s @ {} Hz)",
        path.display(),
        wave.frames(),
        wave.duration_seconds(),
        sample_rate
    );
    Ok(())
}

/// Encode `wave` as an in-memory WAV file.
pub fn encode_wav_memory(wave: &StereoWaveform) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let cursor = std::io::Cursor::new(&mut buffer);
        let mut writer = WavWriter::new(cursor, spec(wave.sample_rate()))?;
        write_samples(&mut writer, wave)?;
        writer.finalize()?;
    }
    Ok(buffer)
}

/// Read a 16-bit stereo WAV back into a waveform.
pub fn read_audio(path: impl AsRef<Path>) -> Result<StereoWaveform> {
    let reader = WavReader::open(path.as_ref())?;
    let spec = reader.spec();
    if spec.channels != StereoWaveform::CHANNELS as u16
        || spec.bits_per_sample != BITS_PER_SAMPLE
        || spec.sample_format != SampleFormat::Int
    {
        return Err(ExportError::InvalidData(format!(
            "expected 16-bit stereo PCM, found {} channel(s) at {} bits",
            spec.channels, spec.bits_per_sample
        )));
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let (left, right): (Vec<f32>, Vec<f32>) = samples
        .chunks_exact(2)
        .map(|pair| (pair[0] as f32 / 32767.0, pair[1] as f32 / 32767.0))
        .unzip();

    StereoWaveform::from_channels(&left, &right, spec.sample_rate)
        .map_err(|e| ExportError::InvalidData(e.to_string()))
}

fn spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: StereoWaveform::CHANNELS as u16,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    }
}

fn check_rate(sample_rate: u32, wave: &StereoWaveform) -> Result<()> {
    if sample_rate == 0 || sample_rate != wave.sample_rate() {
        return Err(ExportError::InvalidData(format!(
            "write rate {} Hz does not match waveform rate {} Hz",
            sample_rate,
            wave.sample_rate()
        )));
    }
    Ok(())
}

fn write_samples<W: Write + Seek>(writer: &mut WavWriter<W>, wave: &StereoWaveform) -> Result<()> {
    let mut pcm = writer.get_i16_writer(wave.samples().len() as u32);
    for &sample in wave.samples() {
        pcm.write_sample(to_pcm16(sample));
    }
    pcm.flush()?;
    Ok(())
}
