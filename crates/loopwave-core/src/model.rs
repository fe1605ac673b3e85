//! Model capability abstraction: framework-agnostic inference.
//!
//! Generator and decoder networks are external collaborators. They are reached
//! only through [`LatentModel`], which consumes and produces `ndarray` tensors
//! laid out `[batch, channel, time, depth]`. Framework adapters (Burn, ONNX
//! Runtime, candle) convert internally.

use ndarray::{Array4, ArrayView4};
use thiserror::Error;

/// Output of a single model invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Single(Array4<f32>),
    /// Two co-indexed streams, e.g. magnitude and phase.
    Dual(Array4<f32>, Array4<f32>),
}

impl ModelOutput {
    pub fn into_single(self) -> Result<Array4<f32>, InferenceError> {
        match self {
            ModelOutput::Single(x) => Ok(x),
            ModelOutput::Dual(..) => Err(InferenceError::UnexpectedOutput {
                expected: 1,
                found: 2,
            }),
        }
    }

    pub fn into_dual(self) -> Result<(Array4<f32>, Array4<f32>), InferenceError> {
        match self {
            ModelOutput::Dual(a, b) => Ok((a, b)),
            ModelOutput::Single(_) => Err(InferenceError::UnexpectedOutput {
                expected: 2,
                found: 1,
            }),
        }
    }

    /// Batch size of the first stream.
    pub fn batch_len(&self) -> usize {
        match self {
            ModelOutput::Single(x) | ModelOutput::Dual(x, _) => x.dim().0,
        }
    }
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Forward pass failed: {0}")]
    ForwardFailed(String),

    #[error("Invalid model input: {0}")]
    InvalidInput(String),

    #[error("Model returned {found} output stream(s), expected {expected}")]
    UnexpectedOutput { expected: usize, found: usize },
}

/// A model capability: generator, encoder or decoder stage.
///
/// `inputs` holds one or more co-indexed tensors sharing the batch axis.
/// `training` is always `false` when called from loopwave.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the batched runner may invoke the
/// same model from several worker threads on disjoint chunks.
pub trait LatentModel: Send + Sync {
    fn name(&self) -> &str;

    fn invoke(
        &self,
        inputs: &[ArrayView4<'_, f32>],
        training: bool,
    ) -> Result<ModelOutput, InferenceError>;
}

pub type ForwardFn = Box<
    dyn Fn(&[ArrayView4<'_, f32>]) -> Result<ModelOutput, InferenceError> + Send + Sync,
>;

/// [`LatentModel`] backed by a closure.
pub struct FnModel {
    name: String,
    forward: ForwardFn,
}

impl FnModel {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[ArrayView4<'_, f32>]) -> Result<ModelOutput, InferenceError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            forward: Box::new(f),
        }
    }

    /// One input tensor, one output tensor.
    pub fn single<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ArrayView4<'_, f32>) -> Result<Array4<f32>, InferenceError> + Send + Sync + 'static,
    {
        Self::new(name, move |inputs: &[ArrayView4<'_, f32>]| {
            let input = only_input(inputs)?;
            f(input.view()).map(ModelOutput::Single)
        })
    }

    /// One input tensor, two output tensors.
    pub fn dual<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(ArrayView4<'_, f32>) -> Result<(Array4<f32>, Array4<f32>), InferenceError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, move |inputs: &[ArrayView4<'_, f32>]| {
            let input = only_input(inputs)?;
            f(input.view()).map(|(a, b)| ModelOutput::Dual(a, b))
        })
    }
}

impl LatentModel for FnModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(
        &self,
        inputs: &[ArrayView4<'_, f32>],
        _training: bool,
    ) -> Result<ModelOutput, InferenceError> {
        (self.forward)(inputs)
    }
}

impl std::fmt::Debug for FnModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnModel").field("name", &self.name).finish()
    }
}

fn only_input<'a, 'b>(
    inputs: &'a [ArrayView4<'b, f32>],
) -> Result<&'a ArrayView4<'b, f32>, InferenceError> {
    match inputs {
        [input] => Ok(input),
        _ => Err(InferenceError::InvalidInput(format!(
            "expected 1 input tensor, got {}",
            inputs.len()
        ))),
    }
}
