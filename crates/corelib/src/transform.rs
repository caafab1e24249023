use crate::{EulerRot, Lerp, Mat4, Quat, Vec3};

/// Pose of an animated object: translation, Euler rotation (radians, XYZ
/// order) and per-axis scale. Stored unpacked so keyframes blend field-wise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation_euler: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation_euler: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    #[inline]
    pub const fn identity() -> Self {
        Self::IDENTITY
    }

    #[inline]
    pub fn from_trs(translation: Vec3, rotation_euler: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation_euler,
            scale,
        }
    }

    pub fn with_translation(self, translation: Vec3) -> Self {
        Self { translation, ..self }
    }

    pub fn with_rotation(self, rotation_euler: Vec3) -> Self {
        Self {
            rotation_euler,
            ..self
        }
    }

    pub fn with_scale(self, scale: Vec3) -> Self {
        Self { scale, ..self }
    }

    pub fn rotation(&self) -> Quat {
        let r = self.rotation_euler;
        Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z)
    }

    /// `T * R * S`, column-major.
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation(), self.translation)
    }

    /// Inverse transpose of [`Transform::matrix`], for moving normals.
    pub fn normal_matrix(&self) -> Mat4 {
        self.matrix().inverse().transpose()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Field-wise blend. Euler angles are blended linearly, so keyframes should
/// stay within half a turn of each other.
impl Lerp for Transform {
    fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        Self {
            translation: a.translation.lerp(b.translation, t),
            rotation_euler: a.rotation_euler.lerp(b.rotation_euler, t),
            scale: a.scale.lerp(b.scale, t),
        }
    }
}
