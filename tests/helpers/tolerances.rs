//! Tolerance constants for audio testing.

/// Floating point rounding errors (exact restacking, identity models).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Silence threshold (~-80dB).
/// Values below this are considered silent.
pub const SILENCE_THRESHOLD: f32 = 0.0001;

/// 16-bit quantization step size.
/// Use when reading back 16-bit WAV output.
pub const INT16_EPSILON: f32 = 1.0 / 32768.0;
