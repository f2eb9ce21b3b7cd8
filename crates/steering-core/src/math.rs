//! Small helpers over `[f64; 2]` plane vectors.

pub type Vec2 = [f64; 2];

pub(crate) const EPSILON: f64 = 1e-9;

#[inline]
pub fn add(a: Vec2, b: Vec2) -> Vec2 {
    [a[0] + b[0], a[1] + b[1]]
}

#[inline]
pub fn sub(a: Vec2, b: Vec2) -> Vec2 {
    [a[0] - b[0], a[1] - b[1]]
}

#[inline]
pub fn scale(a: Vec2, s: f64) -> Vec2 {
    [a[0] * s, a[1] * s]
}

#[inline]
pub fn dot(a: Vec2, b: Vec2) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

/// 2D cross product (z component of the 3D cross).
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f64 {
    a[0] * b[1] - a[1] * b[0]
}

#[inline]
pub fn length_sq(a: Vec2) -> f64 {
    dot(a, a)
}

#[inline]
pub fn length(a: Vec2) -> f64 {
    length_sq(a).sqrt()
}

#[inline]
pub fn distance_sq(a: Vec2, b: Vec2) -> f64 {
    length_sq(sub(a, b))
}

/// Unit vector along `a`, or `None` when `a` is (near) zero or not finite.
pub fn normalize(a: Vec2) -> Option<Vec2> {
    let len = length(a);
    if len > EPSILON && len.is_finite() {
        Some(scale(a, 1.0 / len))
    } else {
        None
    }
}

/// Clamp the length of `a` to `max_len`.
pub fn truncate(a: Vec2, max_len: f64) -> Vec2 {
    let len_sq = length_sq(a);
    if len_sq > max_len * max_len {
        let s = max_len / len_sq.sqrt();
        scale(a, s)
    } else {
        a
    }
}

/// `a` rotated by -90 degrees: the right-hand side of a forward vector.
#[inline]
pub fn perp_right(a: Vec2) -> Vec2 {
    [a[1], -a[0]]
}

/// Rotate `a` by `angle` radians counter-clockwise.
pub fn rotate(a: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    [a[0] * cos - a[1] * sin, a[0] * sin + a[1] * cos]
}

#[inline]
pub fn is_finite(a: Vec2) -> bool {
    a[0].is_finite() && a[1].is_finite()
}
