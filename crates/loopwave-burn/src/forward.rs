//! Opaque forward-pass wrapper.

use burn::prelude::*;
use burn::tensor::backend::Backend;
use parking_lot::Mutex;

/// Result of one Burn forward pass.
pub enum BurnOutput<B: Backend> {
    Single(Tensor<B, 4>),
    Dual(Tensor<B, 4>, Tensor<B, 4>),
}

type ForwardBox<B> = Box<dyn Fn(Tensor<B, 4>) -> BurnOutput<B> + Send>;

/// Wraps a forward function as `Tensor<B, 4> -> BurnOutput<B>`.
///
/// Burn modules are `Send` but not necessarily `Sync`, so calls are
/// serialized behind a lock.
pub(crate) struct BurnForward<B: Backend> {
    forward_fn: Mutex<ForwardBox<B>>,
}

impl<B: Backend> BurnForward<B> {
    pub fn from_forward(f: impl Fn(Tensor<B, 4>) -> BurnOutput<B> + Send + 'static) -> Self {
        Self {
            forward_fn: Mutex::new(Box::new(f)),
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> BurnOutput<B> {
        (self.forward_fn.lock())(input)
    }
}
