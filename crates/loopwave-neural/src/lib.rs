//! # loopwave-neural
//!
//! Runs a fixed-batch-size [`LatentModel`](loopwave_core::LatentModel) over
//! inputs of any batch length.
//!
//! The batch axis is cut into chunks `[i*B, min((i+1)*B, N))`, each chunk is
//! passed to the model, and the outputs are concatenated in chunk order.
//! Chunks may run on a rayon worker pool; results are placed by position, so
//! both execution modes return identical tensors.
//!
//! ```rust
//! use loopwave_core::FnModel;
//! use loopwave_neural::BatchedInferenceRunner;
//! use ndarray::Array4;
//!
//! let identity = FnModel::single("identity", |x| Ok(x.to_owned()));
//! let runner = BatchedInferenceRunner::new(4).unwrap();
//! let input = Array4::<f32>::zeros((10, 1, 2, 3));
//! let output = runner.run(&identity, input.view()).unwrap();
//! assert_eq!(output.dim().0, 10);
//! ```

mod error;
pub use error::{Result, RunnerError};

mod cancel;
pub use cancel::CancelToken;

mod runner;
pub use runner::{BatchedInferenceRunner, ExecutionMode};
