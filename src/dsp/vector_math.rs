//! Elementwise operations over sample buffers.
//!
//! Every function works in place on the buffer it receives (or writes into `dst` for the
//! two out-of-place helpers) and never allocates, so they are safe to call from the audio
//! thread. Buffers passed together must have the same length; only the common prefix is
//! touched otherwise.

/// Sets every sample of the buffer to `value`.
pub fn fill(buf: &mut [f32], value: f32) {
    buf.iter_mut().for_each(|x| *x = value);
}

/// Copies `src` into `dst`.
pub fn copy(dst: &mut [f32], src: &[f32]) {
    dst.iter_mut().zip(src).for_each(|(d, s)| *d = *s);
}

/// Writes `src * factor` into `dst`.
pub fn scale(dst: &mut [f32], src: &[f32], factor: f32) {
    dst.iter_mut().zip(src).for_each(|(d, s)| *d = *s * factor);
}

pub fn add_scalar(buf: &mut [f32], value: f32) {
    buf.iter_mut().for_each(|x| *x += value);
}

pub fn mul_scalar(buf: &mut [f32], value: f32) {
    buf.iter_mut().for_each(|x| *x *= value);
}

/// Elementwise product, `buf[i] *= other[i]`.
pub fn mul(buf: &mut [f32], other: &[f32]) {
    buf.iter_mut().zip(other).for_each(|(x, o)| *x *= *o);
}

pub fn powi(buf: &mut [f32], exponent: i32) {
    buf.iter_mut().for_each(|x| *x = x.powi(exponent));
}

pub fn sin(buf: &mut [f32]) {
    buf.iter_mut().for_each(|x| *x = x.sin());
}

/// Fractional part, `x - floor(x)`. Unlike [`f32::fract`] the result is never negative.
pub fn fract(buf: &mut [f32]) {
    buf.iter_mut().for_each(|x| *x -= x.floor());
}
