//! Core types: math re-exports, Transform, keyframe sampling.

pub use glam::{EulerRot, Mat4, Quat, Vec3, vec3};

pub mod interpolate;
pub mod sampler;
pub mod transform;

pub use interpolate::Lerp;
pub use sampler::{Interpolation, SampleError, Sampler, SamplerValue};
pub use transform::Transform;
