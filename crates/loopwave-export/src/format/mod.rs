//! File formats.

pub mod npy;
pub mod wav;
