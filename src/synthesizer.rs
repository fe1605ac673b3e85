//! Synthesis facade: latent fields in, stereo waveforms out.

use crate::assembler::{Decoders, WaveformAssembler, DECODER_BLOCK_STEPS};
use crate::{Error, Result};
use loopwave_codec::SpectralCodec;
use loopwave_core::layout::{merge_batch_into_time, split_time_into_batch, truncate_time};
use loopwave_core::{LatentModel, StereoWaveform, SynthConfig};
use loopwave_latent::{LatentCoordinateField, LatentFieldGenerator};
use loopwave_neural::{BatchedInferenceRunner, CancelToken, ExecutionMode};
use ndarray::{Array2, Array4, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Generator and decoder capabilities for one synthesizer.
///
/// A set built with [`decoders_only`](Self::decoders_only) can decode
/// external latents but not generate.
#[derive(Clone)]
pub struct ModelSet {
    generator: Option<Arc<dyn LatentModel>>,
    decoder: Arc<dyn LatentModel>,
    decoder2: Arc<dyn LatentModel>,
}

impl ModelSet {
    /// `decoder` is the first (spectral) stage, `decoder2` the second
    /// (latent) stage.
    pub fn new(
        generator: Arc<dyn LatentModel>,
        decoder: Arc<dyn LatentModel>,
        decoder2: Arc<dyn LatentModel>,
    ) -> Self {
        Self {
            generator: Some(generator),
            decoder,
            decoder2,
        }
    }

    pub fn decoders_only(decoder: Arc<dyn LatentModel>, decoder2: Arc<dyn LatentModel>) -> Self {
        Self {
            generator: None,
            decoder,
            decoder2,
        }
    }

    pub fn generator(&self) -> Option<&dyn LatentModel> {
        self.generator.as_deref()
    }

    pub fn decoders(&self) -> Decoders<'_> {
        Decoders {
            stage1: self.decoder.as_ref(),
            stage2: self.decoder2.as_ref(),
        }
    }
}

impl std::fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSet")
            .field("generator", &self.generator.as_ref().map(|g| g.name().to_string()))
            .field("decoder", &self.decoder.name())
            .field("decoder2", &self.decoder2.name())
            .finish()
    }
}

/// Long-form and loopable stereo synthesis.
///
/// Holds everything derived from [`SynthConfig`] (codec matrices, latent
/// field geometry); models are passed per call so one synthesizer can drive
/// several generators.
///
/// # Example
///
/// ```ignore
/// use loopwave::prelude::*;
///
/// let synth = Synthesizer::builder().config(SynthConfig::default()).build()?;
/// let mut rng = ChaCha8Rng::seed_from_u64(42);
/// let field = synth.build_latent_field_loop(4, 2.0, &mut rng)?;
/// let wave = synth.generate_waveform(&field, &models, 64)?;
/// ```
#[derive(Debug, Clone)]
pub struct Synthesizer {
    config: SynthConfig,
    assembler: WaveformAssembler,
    latent: LatentFieldGenerator,
    mode: ExecutionMode,
    cancel: Option<CancelToken>,
}

impl Synthesizer {
    pub fn builder() -> SynthesizerBuilder {
        SynthesizerBuilder::default()
    }

    pub fn new(config: SynthConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn codec(&self) -> &SpectralCodec {
        self.assembler.codec()
    }

    pub fn latent_generator(&self) -> &LatentFieldGenerator {
        &self.latent
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Run the generator over `field`, then decode its output to audio.
    pub fn generate_waveform(
        &self,
        field: &LatentCoordinateField,
        models: &ModelSet,
        batch_size: usize,
    ) -> Result<StereoWaveform> {
        let generator = models.generator().ok_or(Error::MissingModel("generator"))?;
        let runner = self.runner(batch_size)?;

        let input = field.to_model_input();
        let generated = runner.run(generator, input.view())?;
        tracing::debug!("Generator {:?} -> {:?}", input.dim(), generated.dim());

        let timeline = merge_batch_into_time(&generated);
        let blocks = split_time_into_batch(&timeline, DECODER_BLOCK_STEPS).map_err(Error::assembler)?;
        let wave = self.assembler.assemble(&blocks, models.decoders(), &runner)?;

        tracing::info!(
            "Generated {:.2}s of audio from {} latent block(s)",
            wave.duration_seconds(),
            field.block_count()
        );
        Ok(wave)
    }

    /// Decode an external `[time, depth]` latent, skipping the generator.
    ///
    /// Trailing steps beyond the last multiple of 8 are dropped.
    pub fn decode_waveform(
        &self,
        latent: &Array2<f32>,
        models: &ModelSet,
        batch_size: usize,
    ) -> Result<StereoWaveform> {
        let steps = latent.nrows();
        if steps < DECODER_BLOCK_STEPS {
            return Err(Error::Assembler(format!(
                "latent has {} steps, at least {} are needed",
                steps, DECODER_BLOCK_STEPS
            )));
        }
        let dropped = steps % DECODER_BLOCK_STEPS;
        if dropped != 0 {
            tracing::warn!(
                "Latent length {} is not a multiple of {}; dropping {} trailing step(s)",
                steps,
                DECODER_BLOCK_STEPS,
                dropped
            );
        }

        let runner = self.runner(batch_size)?;
        let wrapped: Array4<f32> = latent.to_owned().insert_axis(Axis(0)).insert_axis(Axis(0));
        let kept = truncate_time(&wrapped, DECODER_BLOCK_STEPS);
        let blocks = split_time_into_batch(&kept, DECODER_BLOCK_STEPS).map_err(Error::assembler)?;
        let wave = self.assembler.assemble(&blocks, models.decoders(), &runner)?;

        tracing::info!(
            "Decoded {} latent steps to {:.2}s of audio",
            steps - dropped,
            wave.duration_seconds()
        );
        Ok(wave)
    }

    /// One generator window at a random crop phase.
    pub fn sample_window<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Array2<f32>> {
        Ok(self.latent.sample_window(rng)?)
    }

    pub fn build_latent_field_multi<R: Rng + ?Sized>(
        &self,
        block_count: usize,
        truncation: f32,
        rng: &mut R,
    ) -> Result<LatentCoordinateField> {
        Ok(self.latent.build_latent_field_multi(block_count, truncation, rng)?)
    }

    pub fn build_latent_field_loop<R: Rng + ?Sized>(
        &self,
        block_count: usize,
        truncation: f32,
        rng: &mut R,
    ) -> Result<LatentCoordinateField> {
        Ok(self.latent.build_latent_field_loop(block_count, truncation, rng)?)
    }

    /// `seconds` of long-form audio from a freshly seeded latent field.
    ///
    /// Enough generator blocks are built to cover the duration and the
    /// result is trimmed to exactly `seconds * sample_rate` frames.
    pub fn generate_seconds(
        &self,
        models: &ModelSet,
        seconds: f32,
        truncation: f32,
        seed: u64,
    ) -> Result<StereoWaveform> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.render_seconds(models, seconds, truncation, &mut rng)
    }

    pub(crate) fn render_seconds<R: Rng + ?Sized>(
        &self,
        models: &ModelSet,
        seconds: f32,
        truncation: f32,
        rng: &mut R,
    ) -> Result<StereoWaveform> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(Error::LatentField(loopwave_latent::Error::InvalidRequest(format!(
                "duration {} must be positive",
                seconds
            ))));
        }
        let blocks = self.config.blocks_for_seconds(seconds);
        let field = self.build_latent_field_multi(blocks, truncation, rng)?;
        let wave = self.generate_waveform(&field, models, self.config.batch_size)?;

        let frames = (seconds as f64 * self.config.sample_rate as f64).round() as usize;
        Ok(wave.truncated(frames))
    }

    /// `[mel_bins, time]` display matrix of the first `seconds` of `wave`.
    pub fn preview_spectrogram(&self, wave: &StereoWaveform, seconds: f32) -> Result<Array2<f32>> {
        Ok(self.codec().preview_spectrogram(wave, seconds)?)
    }

    fn runner(&self, batch_size: usize) -> Result<BatchedInferenceRunner> {
        let runner = BatchedInferenceRunner::new(batch_size)?.with_mode(self.mode);
        Ok(match &self.cancel {
            Some(token) => runner.with_cancel_token(token.clone()),
            None => runner,
        })
    }
}

/// Builder for [`Synthesizer`].
///
/// Chunks run sequentially unless the `parallel` feature is enabled or
/// [`execution_mode`](Self::execution_mode) says otherwise.
#[derive(Debug, Clone)]
pub struct SynthesizerBuilder {
    config: SynthConfig,
    mode: ExecutionMode,
    cancel: Option<CancelToken>,
}

impl Default for SynthesizerBuilder {
    fn default() -> Self {
        Self {
            config: SynthConfig::default(),
            mode: if cfg!(feature = "parallel") {
                ExecutionMode::Parallel
            } else {
                ExecutionMode::Sequential
            },
            cancel: None,
        }
    }
}

impl SynthesizerBuilder {
    pub fn config(mut self, config: SynthConfig) -> Self {
        self.config = config;
        self
    }

    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Every request checks `token` between chunks and fails with
    /// [`RunnerError::Cancelled`](loopwave_neural::RunnerError::Cancelled)
    /// once it is set.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> Result<Synthesizer> {
        self.config.validate()?;
        let assembler = WaveformAssembler::new(&self.config)?;
        let latent = LatentFieldGenerator::from_config(&self.config)?;

        tracing::info!(
            "Synthesizer ready: {} Hz, hop {}, latlen {}, {:?}",
            self.config.sample_rate,
            self.config.hop,
            self.config.latlen,
            self.mode
        );

        Ok(Synthesizer {
            config: self.config,
            assembler,
            latent,
            mode: self.mode,
            cancel: self.cancel,
        })
    }
}
