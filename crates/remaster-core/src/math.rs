//! Decibel conversion and denormal flushing.

use core::f32::consts::LN_10;

/// Smallest magnitude [`linear_to_db`] distinguishes from silence (-200 dB).
pub const DB_FLOOR_LINEAR: f32 = 1e-10;

/// Amplitude ratio for a level in dB.
///
/// ```rust
/// use remaster_core::db_to_linear;
///
/// assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    libm::expf(db * (LN_10 / 20.0))
}

/// Level in dB of an amplitude ratio; magnitudes below
/// [`DB_FLOOR_LINEAR`] read as -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    libm::logf(linear.max(DB_FLOOR_LINEAR)) * (20.0 / LN_10)
}

/// Zero anything smaller than 1e-20 so decaying feedback paths stay off
/// the subnormal slow path.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}
