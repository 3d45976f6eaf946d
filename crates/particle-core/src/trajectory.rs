//! The parabolic path every particle follows.

/// Next path height for a particle at path position `x`.
///
/// `y = x * (-a * x + b)`: a parabola through the origin that opens downward
/// for positive `a`. The sign of `b` picks the launch side, which is why a
/// particle's rate must share it.
#[inline]
pub fn advance(x: f32, a: f32, b: f32) -> f32 {
    x * (-a * x + b)
}
