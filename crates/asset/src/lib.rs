//! Mesh assets: procedural construction, compact buffers and the TDM/TDB codec.
//! Builder: attribute pools + batching into per-material polygon groups.
//! Buffers: fixed-width float/short packers and width-promoting index packers.
//! Codec: versioned, endian-aware binary envelope for meshes, materials and models.

pub mod buffer;
pub mod builder;
pub mod codec;
pub mod error;
pub mod material;
pub mod merge;
pub mod mesh;
pub mod obj;
pub mod pool;

pub use buffer::{ElementWidth, Endian, FloatBuffer, IndexBufferBuilder, TypedBuffer};
pub use builder::{BuilderConfig, MeshBuilder, NormalPolicy};
pub use codec::{Model, WriteOptions};
pub use error::{BuilderError, CodecError, IndexOverflow, MergeError};
pub use material::{Material, NamedMaterial};
pub use merge::MeshMerger;
pub use mesh::{Mesh, MeshPolygons, PrimitiveMode};
