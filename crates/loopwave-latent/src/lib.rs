//! # loopwave-latent
//!
//! Builds long, smoothly interpolated latent trajectories for a generator
//! whose context window is fixed at `latlen` steps.
//!
//! Anchors are random vectors made of a per-anchor local part and a global
//! part shared by every anchor of one request. The trajectory between them is
//! linear, then centered (each step averaged with its successor) so the
//! generator's receptive-field center lands between two steps.
//!
//! - [`LatentFieldGenerator::sample_window`]: one `latlen` window at a random
//!   quarter-phase offset
//! - [`LatentFieldGenerator::build_latent_field_multi`]: `fac` consecutive
//!   windows for long-form output
//! - [`LatentFieldGenerator::build_latent_field_loop`]: `fac` windows whose
//!   first and last steps coincide
//!
//! All randomness comes from the caller's `Rng`:
//!
//! ```rust
//! use loopwave_latent::LatentFieldGenerator;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let generator = LatentFieldGenerator::new(16, 24, 4).unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let field = generator.build_latent_field_multi(3, 2.0, &mut rng).unwrap();
//! assert_eq!(field.time_steps(), 48);
//! ```

mod error;
pub use error::{Error, Result};

mod field;
pub use field::LatentCoordinateField;

mod generator;
pub use generator::{LatentFieldGenerator, CROP_PHASES, GLOBAL_DEPTH};

mod sampling;
pub use sampling::{standard_normal_vec, truncated_normal, truncated_normal_vec};
