use crate::{Error, Result};
use ndarray::{Array2, Array3, Array4, ArrayView2, Axis};

/// `fac` consecutive generator windows, `[blocks, latlen, depth]`.
///
/// Block `i + 1` continues where block `i` ends, so
/// [`timeline`](Self::timeline) is one continuous trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentCoordinateField {
    blocks: Array3<f32>,
}

impl LatentCoordinateField {
    pub fn new(blocks: Array3<f32>) -> Result<Self> {
        let (count, latlen, depth) = blocks.dim();
        if count == 0 || latlen == 0 || depth == 0 {
            return Err(Error::Shape(format!(
                "latent field needs non-empty blocks, got {:?}",
                blocks.dim()
            )));
        }
        Ok(Self { blocks })
    }

    /// Split a `[blocks * latlen, depth]` trajectory into windows.
    pub fn from_timeline(timeline: Array2<f32>, latlen: usize) -> Result<Self> {
        let (steps, depth) = timeline.dim();
        if latlen == 0 || steps % latlen != 0 {
            return Err(Error::Shape(format!(
                "{} steps do not split into windows of {}",
                steps, latlen
            )));
        }
        let owned = timeline.as_standard_layout().into_owned();
        Self::new(owned.into_shape_with_order((steps / latlen, latlen, depth))?)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.dim().0
    }

    pub fn latlen(&self) -> usize {
        self.blocks.dim().1
    }

    pub fn depth(&self) -> usize {
        self.blocks.dim().2
    }

    pub fn time_steps(&self) -> usize {
        self.block_count() * self.latlen()
    }

    pub fn blocks(&self) -> &Array3<f32> {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> ArrayView2<'_, f32> {
        self.blocks.index_axis(Axis(0), index)
    }

    /// `[blocks * latlen, depth]`
    pub fn timeline(&self) -> Array2<f32> {
        let (count, latlen, depth) = self.blocks.dim();
        Array2::from_shape_fn((count * latlen, depth), |(t, d)| {
            self.blocks[[t / latlen, t % latlen, d]]
        })
    }

    /// Generator input layout `[blocks, 1, latlen, depth]`.
    pub fn to_model_input(&self) -> Array4<f32> {
        self.blocks.clone().insert_axis(Axis(1))
    }
}
