//! Linear blending for keyframe values.

use crate::{Mat4, Vec3};

/// A value that can be blended linearly between two keyframes.
///
/// `t` is the normalized position between `a` (0.0) and `b` (1.0). Callers
/// may pass values outside that range; implementations extrapolate.
pub trait Lerp: Sized {
    fn lerp(a: &Self, b: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Vec3 {
    #[inline]
    fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        a.lerp(*b, t)
    }
}

/// Component-wise blend of all 16 entries. The result is not re-orthonormalized.
impl Lerp for Mat4 {
    fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        let a = a.to_cols_array();
        let b = b.to_cols_array();
        let mut out = [0.0f32; 16];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = <f32 as Lerp>::lerp(&a[i], &b[i], t);
        }
        Mat4::from_cols_array(&out)
    }
}
