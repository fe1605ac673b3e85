//! Latent trajectories stored as `.npy` arrays.

use crate::error::{ExportError, Result};
use ndarray::{Array2, ArrayD, Ix2};
use ndarray_npy::{ReadNpyError, ReadNpyExt, WriteNpyExt};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Load a `[time, depth]` latent array.
///
/// `f32` and `f64` element types are accepted; `f64` is narrowed.
pub fn read_latent(path: impl AsRef<Path>) -> Result<Array2<f32>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ExportError::NotFound(path.display().to_string()));
    }

    let data = match ArrayD::<f32>::read_npy(BufReader::new(File::open(path)?)) {
        Ok(arr) => arr,
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let wide = ArrayD::<f64>::read_npy(BufReader::new(File::open(path)?))
                .map_err(|e| invalid(path, e.to_string()))?;
            wide.mapv(|v| v as f32)
        }
        Err(ReadNpyError::Io(e)) => return Err(ExportError::Io(e)),
        Err(e) => return Err(invalid(path, e.to_string())),
    };

    let shape = data.shape().to_vec();
    let latent = data
        .into_dimensionality::<Ix2>()
        .map_err(|_| invalid(path, format!("expected a 2-D array, found shape {:?}", shape)))?;

    tracing::debug!("Loaded latent {} with shape {:?}", path.display(), latent.dim());
    Ok(latent)
}

/// Save a `[time, depth]` latent array as `f32` `.npy`.
pub fn write_latent(path: impl AsRef<Path>, latent: &Array2<f32>) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(File::create(path)?);
    latent
        .write_npy(writer)
        .map_err(|e| ExportError::InvalidData(e.to_string()))?;
    Ok(())
}

fn invalid(path: &Path, reason: String) -> ExportError {
    ExportError::InvalidLatent {
        path: path.display().to_string(),
        reason,
    }
}
