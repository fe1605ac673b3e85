//! Burn adapter for loopwave models.
//!
//! Wraps a Burn forward pass `Tensor<B, 4> -> Tensor<B, 4>` (or a pair of
//! tensors) as a [`LatentModel`](loopwave_core::LatentModel). Models run on
//! NdArray (CPU) by default; the `gpu` feature adds wgpu placement.
//!
//! ```rust,ignore
//! let decoder = BurnModel::cpu_dual("decoder-stage1", move |x| net.forward(x));
//! let synth = Synthesizer::builder().stage1(decoder).build()?;
//! ```

mod convert;
mod dispatch;
mod forward;

pub use dispatch::{BurnModel, DevicePlacement};
pub use forward::BurnOutput;
