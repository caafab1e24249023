//! TDM/TDB binary asset format.
//!
//! # Layout
//! ```text
//! 0x00: magic [u8; 3]   "TDM" scene model, "TDB" single mesh or material
//! 0x03: version u8
//! 0x04: flags u8        bit0 = big-endian payload
//! 0x05: payload         multi-byte values in the order given by the flags
//! ```
//!
//! Mesh payload:
//! ```text
//! u16 group_count
//! per group:
//!   material index      u8 (TDB) / u16 (TDM), all ones = no material
//!   u8  flags           bit0 = normals, bit1 = texture coordinates
//!   u8  primitive mode  1 = points, 2 = lines, 3 = triangles
//!   i32 vertex_count
//!   f32 positions[3 × vertex_count]
//!   f32 normals[3 × vertex_count]      if flagged
//!   f32 tex_coords[2 × vertex_count]   if flagged
//!   i32 index_count
//!   indices[index_count]  1 byte if vertex_count ≤ 256, 2 if ≤ 65536, else 4
//! material table count  u8 (TDB) / u16 (TDM)
//! per entry: u16 length + UTF-8 name
//! ```
//!
//! Material payload: ambient, diffuse, specular and emission as four
//! `round(c × 255)` bytes each, `f32` shininess, then `u8` texture name length
//! (0 = none) followed by the UTF-8 name.
//!
//! Model payload (TDM): `u16` material count, per entry a `u16`-length name and
//! a material payload; `u16` mesh count, per entry a `u16`-length id and a mesh
//! payload.

use std::io::{Read, Write};
use std::ops::RangeInclusive;

use bitflags::bitflags;
use byteorder::{BigEndian, LittleEndian};

use crate::buffer::Endian;
use crate::error::CodecError;
use crate::material::{Material, NamedMaterial};
use crate::mesh::Mesh;

mod reader;
mod writer;

use reader::Decoder;
use writer::Encoder;

/// Version written by default.
pub const FORMAT_VERSION: u8 = 1;

/// Versions this implementation reads.
pub const SUPPORTED_VERSIONS: RangeInclusive<u8> = 1..=FORMAT_VERSION;

/// Envelope kind, identified by the magic tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Container {
    /// "TDM": a scene model holding several meshes and named materials.
    Model,
    /// "TDB": one discrete asset, a mesh or a material.
    Asset,
}

impl Container {
    pub const fn magic(self) -> [u8; 3] {
        match self {
            Container::Model => *b"TDM",
            Container::Asset => *b"TDB",
        }
    }

    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        match magic {
            b"TDM" => Some(Container::Model),
            b"TDB" => Some(Container::Asset),
            _ => None,
        }
    }

    /// Largest material table entry count, also the "no material" sentinel.
    const fn table_limit(self) -> u16 {
        match self {
            Container::Model => u16::MAX,
            Container::Asset => u8::MAX as u16,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HeaderFlags: u8 {
        const BIG_ENDIAN = 1 << 0;
    }
}

/// Decoded envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub container: Container,
    pub version: u8,
    pub endian: Endian,
}

impl Header {
    pub const SIZE: usize = 5;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    pub endian: Endian,
    pub version: u8,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            endian: Endian::Little,
            version: FORMAT_VERSION,
        }
    }
}

impl WriteOptions {
    pub fn big_endian() -> Self {
        Self {
            endian: Endian::Big,
            ..Self::default()
        }
    }
}

/// Scene model stored in a TDM container.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<NamedMaterial>,
}

impl Model {
    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials
            .iter()
            .find(|m| m.name == name)
            .map(|m| &m.material)
    }

    pub fn mesh(&self, id: &str) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.id() == id)
    }
}

/// Write `mesh` as a TDB asset. The mesh id is not stored.
pub fn write_mesh<W: Write>(
    writer: W,
    mesh: &Mesh,
    options: &WriteOptions,
) -> Result<(), CodecError> {
    match options.endian {
        Endian::Little => Encoder::<W, LittleEndian>::new(writer).asset_mesh(mesh, options),
        Endian::Big => Encoder::<W, BigEndian>::new(writer).asset_mesh(mesh, options),
    }
}

/// Write `material` as a TDB asset.
pub fn write_material<W: Write>(
    writer: W,
    material: &Material,
    options: &WriteOptions,
) -> Result<(), CodecError> {
    match options.endian {
        Endian::Little => Encoder::<W, LittleEndian>::new(writer).asset_material(material, options),
        Endian::Big => Encoder::<W, BigEndian>::new(writer).asset_material(material, options),
    }
}

/// Write `model` as a TDM container.
pub fn write_model<W: Write>(
    writer: W,
    model: &Model,
    options: &WriteOptions,
) -> Result<(), CodecError> {
    match options.endian {
        Endian::Little => Encoder::<W, LittleEndian>::new(writer).model(model, options),
        Endian::Big => Encoder::<W, BigEndian>::new(writer).model(model, options),
    }
}

/// Read and validate the 5-byte envelope.
///
/// Fails with [`CodecError::InvalidMagic`] when the tag is not `expected`'s and
/// with [`CodecError::UnsupportedVersion`] outside `versions`.
pub fn read_header<R: Read>(
    reader: &mut R,
    expected: Container,
    versions: &RangeInclusive<u8>,
) -> Result<Header, CodecError> {
    let mut raw = [0u8; Header::SIZE];
    reader.read_exact(&mut raw).map_err(|source| CodecError::Io {
        context: "reading header",
        offset: 0,
        source,
    })?;

    let found = [raw[0], raw[1], raw[2]];
    if found != expected.magic() {
        return Err(CodecError::InvalidMagic {
            expected: expected.magic(),
            found,
        });
    }

    let version = raw[3];
    if !versions.contains(&version) {
        return Err(CodecError::UnsupportedVersion {
            version,
            min: *versions.start(),
            max: *versions.end(),
        });
    }

    let flags = HeaderFlags::from_bits(raw[4]).ok_or(CodecError::Format {
        reason: "reserved header flag bits are set",
    })?;
    let endian = if flags.contains(HeaderFlags::BIG_ENDIAN) {
        Endian::Big
    } else {
        Endian::Little
    };

    log::debug!(
        "Read {:?} header: version {}, {:?} endian",
        expected,
        version,
        endian
    );
    Ok(Header {
        container: expected,
        version,
        endian,
    })
}

/// Read a TDB mesh. TDB does not store ids, so the caller names the mesh.
pub fn read_mesh<R: Read>(
    mut reader: R,
    id: impl Into<String>,
    versions: RangeInclusive<u8>,
) -> Result<Mesh, CodecError> {
    let header = read_header(&mut reader, Container::Asset, &versions)?;
    let id = id.into();
    match header.endian {
        Endian::Little => Decoder::<R, LittleEndian>::new(reader).mesh(id, Container::Asset),
        Endian::Big => Decoder::<R, BigEndian>::new(reader).mesh(id, Container::Asset),
    }
}

/// Read a TDB material.
pub fn read_material<R: Read>(
    mut reader: R,
    versions: RangeInclusive<u8>,
) -> Result<Material, CodecError> {
    let header = read_header(&mut reader, Container::Asset, &versions)?;
    match header.endian {
        Endian::Little => Decoder::<R, LittleEndian>::new(reader).material(),
        Endian::Big => Decoder::<R, BigEndian>::new(reader).material(),
    }
}

/// Read a TDM scene model.
pub fn read_model<R: Read>(
    mut reader: R,
    versions: RangeInclusive<u8>,
) -> Result<Model, CodecError> {
    let header = read_header(&mut reader, Container::Model, &versions)?;
    match header.endian {
        Endian::Little => Decoder::<R, LittleEndian>::new(reader).model(),
        Endian::Big => Decoder::<R, BigEndian>::new(reader).model(),
    }
}

#[cfg(test)]
mod tests;
