//! Directory-level entry points: generate N files, decode a folder of latents.

use crate::synthesizer::{ModelSet, Synthesizer};
use crate::Result;
use loopwave_core::StereoWaveform;
use loopwave_export::{read_latent, write_audio};
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

const LATENT_EXTENSION: &str = "npy";

impl Synthesizer {
    /// Write `count` files of `seconds` audio each into `dir`, named
    /// `{i}_{YYYYmmdd-HHMMSS}.wav`.
    ///
    /// One RNG seeded from `seed` is threaded through every sample, so the
    /// whole batch is reproducible.
    pub fn generate_to_dir(
        &self,
        models: &ModelSet,
        count: usize,
        seconds: f32,
        seed: u64,
        dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        tracing::info!("Generating {} sample(s) of {}s into {}", count, seconds, dir.display());

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut written = Vec::with_capacity(count);
        for i in 0..count {
            let wave = self.render_seconds(models, seconds, self.config().truncation, &mut rng)?;
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            let path = dir.join(format!("{}_{}.wav", i, stamp));
            write_audio(&path, self.config().sample_rate, &wave)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Decode every `*.npy` latent in `input_dir` to `{stem}.wav` in
    /// `output_dir`.
    ///
    /// Every latent is loaded and decoded before the first file is written: a
    /// missing, malformed or wrongly shaped latent fails the whole batch and
    /// no audio is written.
    pub fn decode_dir(
        &self,
        models: &ModelSet,
        input_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>> {
        let input_dir = input_dir.as_ref();
        let output_dir = output_dir.as_ref();

        let paths = latent_files(input_dir)?;
        tracing::info!("Decoding {} latent file(s) from {}", paths.len(), input_dir.display());

        let latents: Vec<(String, Array2<f32>)> = paths
            .iter()
            .map(|path| -> Result<(String, Array2<f32>)> { Ok((file_stem(path), read_latent(path)?)) })
            .collect::<Result<_>>()?;

        let waves: Vec<(String, StereoWaveform)> = latents
            .into_iter()
            .map(|(stem, latent)| -> Result<(String, StereoWaveform)> {
                Ok((stem, self.decode_waveform(&latent, models, self.config().batch_size)?))
            })
            .collect::<Result<_>>()?;

        std::fs::create_dir_all(output_dir)?;
        let mut written = Vec::with_capacity(waves.len());
        for (stem, wave) in &waves {
            let path = output_dir.join(format!("{}.wav", stem));
            write_audio(&path, self.config().sample_rate, wave)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// `*.npy` files directly inside `dir`, sorted by path.
fn latent_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == LATENT_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
