//! Two-stage decode of latent blocks into an interleaved stereo waveform.

use crate::{Error, Result};
use loopwave_codec::SpectralCodec;
use loopwave_core::layout::{merge_batch_into_time, slice_depth, split_time_into_batch, squeeze_channel};
use loopwave_core::{LatentModel, StereoWaveform, SynthConfig};
use loopwave_neural::BatchedInferenceRunner;
use ndarray::Array4;

/// Latent steps per second-stage decoder block.
pub const DECODER_BLOCK_STEPS: usize = 8;

/// Sub-blocks each decoder chunk is cut into along time.
const FOLD_PARTS: usize = 2;

/// The two decoder stages.
///
/// `stage2` maps latent blocks to spectral features, `stage1` maps spectral
/// blocks of `shape` frames to normalized magnitude and phase.
#[derive(Clone, Copy)]
pub struct Decoders<'a> {
    pub stage1: &'a dyn LatentModel,
    pub stage2: &'a dyn LatentModel,
}

impl std::fmt::Debug for Decoders<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoders")
            .field("stage1", &self.stage1.name())
            .field("stage2", &self.stage2.name())
            .finish()
    }
}

/// Turns `[blocks, 1, 8, 2 * latdepth]` latent blocks into audio.
///
/// Each channel takes its own `latdepth` slice of the latent depth, runs
/// through both decoder stages and is reconstructed independently; the two
/// channels are then interleaved and clipped to `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct WaveformAssembler {
    codec: SpectralCodec,
    latdepth: usize,
    shape: usize,
}

impl WaveformAssembler {
    pub fn new(config: &SynthConfig) -> Result<Self> {
        let codec = SpectralCodec::new(config)?;
        Ok(Self {
            codec,
            latdepth: config.latdepth,
            shape: config.shape,
        })
    }

    pub fn codec(&self) -> &SpectralCodec {
        &self.codec
    }

    pub fn latdepth(&self) -> usize {
        self.latdepth
    }

    pub fn shape(&self) -> usize {
        self.shape
    }

    pub fn assemble(
        &self,
        blocks: &Array4<f32>,
        decoders: Decoders<'_>,
        runner: &BatchedInferenceRunner,
    ) -> Result<StereoWaveform> {
        let (count, _, steps, depth) = blocks.dim();
        if steps != DECODER_BLOCK_STEPS {
            return Err(Error::Assembler(format!(
                "latent blocks must be {} steps long, got {}",
                DECODER_BLOCK_STEPS, steps
            )));
        }
        if depth != StereoWaveform::CHANNELS * self.latdepth {
            return Err(Error::Assembler(format!(
                "latent depth {} is not {} channels of depth {}",
                depth,
                StereoWaveform::CHANNELS,
                self.latdepth
            )));
        }
        tracing::debug!("Assembling {} latent blocks of depth {}", count, depth);

        let left = self.decode_channel(blocks, 0, decoders, runner)?;
        let right = self.decode_channel(blocks, 1, decoders, runner)?;
        StereoWaveform::from_channels(&left, &right, self.codec.sample_rate()).map_err(Error::assembler)
    }

    fn decode_channel(
        &self,
        blocks: &Array4<f32>,
        channel: usize,
        decoders: Decoders<'_>,
        runner: &BatchedInferenceRunner,
    ) -> Result<Vec<f32>> {
        let latent = slice_depth(blocks, channel * self.latdepth, self.latdepth).map_err(Error::assembler)?;
        let features = runner.run_folded(decoders.stage2, latent.view(), FOLD_PARTS)?;

        let timeline = merge_batch_into_time(&features);
        let spectral_blocks = split_time_into_batch(&timeline, self.shape).map_err(Error::assembler)?;
        tracing::debug!(
            "Channel {}: stage 2 {:?} -> {} spectral blocks",
            channel,
            features.dim(),
            spectral_blocks.dim().0
        );

        let (magnitude, phase) = runner.run_folded_dual(decoders.stage1, spectral_blocks.view(), FOLD_PARTS)?;
        let magnitude = squeeze_channel(magnitude).map_err(Error::assembler)?;
        let phase = squeeze_channel(phase).map_err(Error::assembler)?;
        tracing::debug!("Channel {}: magnitude {:?}", channel, magnitude.dim());

        Ok(self.codec.reconstruct_waveform(&magnitude, &phase)?)
    }
}
