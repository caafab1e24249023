use std::io::{self, Read};
use std::marker::PhantomData;

use byteorder::{ByteOrder, ReadBytesExt};

use super::{Container, Header, Model};
use crate::buffer::{ElementWidth, FloatBuffer, FloatBufferBuilder, IndexBufferBuilder};
use crate::error::CodecError;
use crate::material::{Material, NamedMaterial, dequantize_channel};
use crate::mesh::{GroupFlags, Mesh, MeshPolygons, PrimitiveMode};

/// Byte-order-specialised reader positioned right after the envelope.
pub(super) struct Decoder<R, B> {
    reader: R,
    offset: u64,
    _order: PhantomData<B>,
}

impl<R: Read, B: ByteOrder> Decoder<R, B> {
    pub(super) fn new(reader: R) -> Self {
        Self {
            reader,
            offset: Header::SIZE as u64,
            _order: PhantomData,
        }
    }

    pub(super) fn model(mut self) -> Result<Model, CodecError> {
        let material_count = self.u16("reading material count")?;
        let mut materials = Vec::with_capacity(material_count as usize);
        for _ in 0..material_count {
            let name = self.string_u16("material name")?;
            materials.push(NamedMaterial::new(name, self.material_payload()?));
        }

        let mesh_count = self.u16("reading mesh count")?;
        let mut meshes = Vec::with_capacity(mesh_count as usize);
        for _ in 0..mesh_count {
            let id = self.string_u16("mesh id")?;
            meshes.push(self.mesh_payload(id, Container::Model)?);
        }

        log::debug!(
            "Read model with {} meshes and {} materials ({} bytes)",
            meshes.len(),
            materials.len(),
            self.offset
        );
        Ok(Model { meshes, materials })
    }

    pub(super) fn mesh(mut self, id: String, container: Container) -> Result<Mesh, CodecError> {
        self.mesh_payload(id, container)
    }

    pub(super) fn material(mut self) -> Result<Material, CodecError> {
        self.material_payload()
    }

    fn mesh_payload(&mut self, id: String, container: Container) -> Result<Mesh, CodecError> {
        let limit = container.table_limit();
        let group_count = self.u16("reading group count")?;
        let mut groups = Vec::with_capacity(group_count as usize);

        for _ in 0..group_count {
            let material = match self.table_value(container)? {
                m if m == limit => None,
                m => Some(m as usize),
            };

            let raw_flags = self.u8("reading group flags")?;
            let flags = GroupFlags::from_bits(raw_flags).ok_or(CodecError::Format {
                reason: "unknown group flag bits",
            })?;
            let raw_mode = self.u8("reading primitive mode")?;
            let primitive = PrimitiveMode::try_from(raw_mode)
                .map_err(|_| CodecError::UnknownPrimitiveMode(raw_mode))?;

            let vertex_count = self.count("reading vertex count")?;
            let positions = self.floats("reading positions", vertex_count * 3)?;
            let normals = if flags.contains(GroupFlags::NORMALS) {
                Some(self.floats("reading normals", vertex_count * 3)?)
            } else {
                None
            };
            let tex_coords = if flags.contains(GroupFlags::TEX_COORDS) {
                Some(self.floats("reading texture coordinates", vertex_count * 2)?)
            } else {
                None
            };

            let index_count = self.count("reading index count")?;
            let width = ElementWidth::for_vertex_count(vertex_count);
            let mut indices = IndexBufferBuilder::new().with_min_width(width);
            for _ in 0..index_count {
                let index = match width {
                    ElementWidth::Byte => self.u8("reading indices")? as u32,
                    ElementWidth::Short => self.u16("reading indices")? as u32,
                    ElementWidth::Int => self.take("reading indices", 4, |r| r.read_u32::<B>())?,
                };
                indices.add(index);
            }

            let group = MeshPolygons::new(
                material,
                primitive,
                positions,
                normals,
                tex_coords,
                indices.build(),
            )
            .map_err(|reason| CodecError::Format { reason })?;
            groups.push(group);
        }

        let table_len = self.table_value(container)?;
        let mut materials = Vec::with_capacity(table_len as usize);
        for _ in 0..table_len {
            materials.push(self.string_u16("material name")?);
        }

        let mesh =
            Mesh::new(id, groups, materials).map_err(|reason| CodecError::Format { reason })?;
        log::debug!(
            "Read mesh '{}': {} groups, {} vertices, {} indices",
            mesh.id(),
            mesh.groups().len(),
            mesh.vertex_count(),
            mesh.index_count()
        );
        Ok(mesh)
    }

    fn material_payload(&mut self) -> Result<Material, CodecError> {
        let mut colors = [[0.0f32; 4]; 4];
        for color in &mut colors {
            let mut quad = [0u8; 4];
            self.take("reading material colors", quad.len(), |r| r.read_exact(&mut quad))?;
            *color = quad.map(dequantize_channel);
        }
        let [ambient, diffuse, specular, emission] = colors;
        let shininess = self.take("reading shininess", 4, |r| r.read_f32::<B>())?;

        let texture_len = self.u8("reading texture name")? as usize;
        let diffuse_texture = if texture_len == 0 {
            None
        } else {
            Some(self.utf8("texture name", texture_len)?)
        };

        Ok(Material {
            ambient,
            diffuse,
            specular,
            emission,
            shininess,
            diffuse_texture,
        })
    }

    fn table_value(&mut self, container: Container) -> Result<u16, CodecError> {
        match container {
            Container::Asset => self.u8("reading material index").map(u16::from),
            Container::Model => self.u16("reading material index"),
        }
    }

    fn floats(&mut self, context: &'static str, len: usize) -> Result<FloatBuffer, CodecError> {
        let mut builder = FloatBufferBuilder::new();
        for _ in 0..len {
            builder.add(self.take(context, 4, |r| r.read_f32::<B>())?);
        }
        Ok(builder.build())
    }

    /// Non-negative `i32` element count.
    fn count(&mut self, context: &'static str) -> Result<usize, CodecError> {
        let raw = self.take(context, 4, |r| r.read_i32::<B>())?;
        usize::try_from(raw).map_err(|_| CodecError::Format {
            reason: "negative element count",
        })
    }

    fn string_u16(&mut self, context: &'static str) -> Result<String, CodecError> {
        let len = self.u16("reading string length")? as usize;
        self.utf8(context, len)
    }

    fn utf8(&mut self, context: &'static str, len: usize) -> Result<String, CodecError> {
        let mut raw = vec![0u8; len];
        self.take("reading string", len, |r| r.read_exact(&mut raw))?;
        String::from_utf8(raw).map_err(|source| CodecError::Utf8 { context, source })
    }

    fn u8(&mut self, context: &'static str) -> Result<u8, CodecError> {
        self.take(context, 1, |r| r.read_u8())
    }

    fn u16(&mut self, context: &'static str) -> Result<u16, CodecError> {
        self.take(context, 2, |r| r.read_u16::<B>())
    }

    fn take<T>(
        &mut self,
        context: &'static str,
        len: usize,
        op: impl FnOnce(&mut R) -> io::Result<T>,
    ) -> Result<T, CodecError> {
        let offset = self.offset;
        let value = op(&mut self.reader).map_err(|source| CodecError::Io {
            context,
            offset,
            source,
        })?;
        self.offset += len as u64;
        Ok(value)
    }
}
