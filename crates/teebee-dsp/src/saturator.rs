/// Largest magnitude passed to `tanh`; beyond this the curve is flat anyway.
pub const SOFT_CLIP_LIMIT: f64 = 6.0;

/// Hyperbolic tangent saturation with the argument clamped to
/// `±SOFT_CLIP_LIMIT` so extreme drive settings stay numerically tame.
#[inline]
pub fn soft_clip(sample: f64) -> f64 {
    sample.clamp(-SOFT_CLIP_LIMIT, SOFT_CLIP_LIMIT).tanh()
}
