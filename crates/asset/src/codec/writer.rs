use std::io::{self, Write};
use std::marker::PhantomData;

use byteorder::{ByteOrder, WriteBytesExt};

use super::{Container, HeaderFlags, Model, WriteOptions};
use crate::buffer::{ElementWidth, Endian, FloatBuffer};
use crate::error::CodecError;
use crate::material::{Material, quantize_channel};
use crate::mesh::Mesh;

/// Byte-order-specialised writer that tracks how far into the stream it is.
pub(super) struct Encoder<W, B> {
    writer: W,
    offset: u64,
    _order: PhantomData<B>,
}

impl<W: Write, B: ByteOrder> Encoder<W, B> {
    pub(super) fn new(writer: W) -> Self {
        Self {
            writer,
            offset: 0,
            _order: PhantomData,
        }
    }

    pub(super) fn asset_mesh(
        mut self,
        mesh: &Mesh,
        options: &WriteOptions,
    ) -> Result<(), CodecError> {
        self.header(Container::Asset, options)?;
        self.mesh(mesh, Container::Asset)?;
        self.finish()
    }

    pub(super) fn asset_material(
        mut self,
        material: &Material,
        options: &WriteOptions,
    ) -> Result<(), CodecError> {
        self.header(Container::Asset, options)?;
        self.material(material)?;
        self.finish()
    }

    pub(super) fn model(mut self, model: &Model, options: &WriteOptions) -> Result<(), CodecError> {
        self.header(Container::Model, options)?;

        self.count_u16("materials", model.materials.len())?;
        for entry in &model.materials {
            self.string_u16("material name", &entry.name)?;
            self.material(&entry.material)?;
        }

        self.count_u16("meshes", model.meshes.len())?;
        for mesh in &model.meshes {
            self.string_u16("mesh id", mesh.id())?;
            self.mesh(mesh, Container::Model)?;
        }

        log::debug!(
            "Wrote model with {} meshes and {} materials ({} bytes)",
            model.meshes.len(),
            model.materials.len(),
            self.offset
        );
        self.finish()
    }

    fn header(&mut self, container: Container, options: &WriteOptions) -> Result<(), CodecError> {
        let mut flags = HeaderFlags::empty();
        flags.set(HeaderFlags::BIG_ENDIAN, options.endian == Endian::Big);

        let magic = container.magic();
        self.put("writing header", magic.len(), |w| w.write_all(&magic))?;
        self.u8("writing header", options.version)?;
        self.u8("writing header", flags.bits())
    }

    fn mesh(&mut self, mesh: &Mesh, container: Container) -> Result<(), CodecError> {
        let limit = container.table_limit();
        if mesh.materials().len() > limit as usize {
            return Err(CodecError::TooLarge {
                what: "material table entries",
                len: mesh.materials().len(),
                max: limit as usize,
            });
        }

        self.count_u16("groups", mesh.groups().len())?;
        for group in mesh.groups() {
            // Mesh::new guarantees the index is below the table length.
            let material = group.material().map_or(limit, |m| m as u16);
            self.table_value(container, material)?;
            self.u8("writing group flags", group.flags().bits())?;
            self.u8("writing primitive mode", group.primitive().into())?;

            let vertex_count = group.vertex_count();
            self.count_i32("vertices", vertex_count)?;
            self.floats("writing positions", group.positions())?;
            if let Some(normals) = group.normals() {
                self.floats("writing normals", normals)?;
            }
            if let Some(tex_coords) = group.tex_coords() {
                self.floats("writing texture coordinates", tex_coords)?;
            }

            self.count_i32("indices", group.index_count())?;
            let width = ElementWidth::for_vertex_count(vertex_count);
            for index in group.indices().iter() {
                match width {
                    ElementWidth::Byte => self.u8("writing indices", index as u8)?,
                    ElementWidth::Short => self.u16("writing indices", index as u16)?,
                    ElementWidth::Int => {
                        self.put("writing indices", 4, |w| w.write_u32::<B>(index))?
                    }
                }
            }
        }

        self.table_value(container, mesh.materials().len() as u16)?;
        for name in mesh.materials() {
            self.string_u16("material name", name)?;
        }

        log::debug!(
            "Wrote mesh '{}': {} groups, {} vertices, {} indices",
            mesh.id(),
            mesh.groups().len(),
            mesh.vertex_count(),
            mesh.index_count()
        );
        Ok(())
    }

    fn material(&mut self, material: &Material) -> Result<(), CodecError> {
        let colors = [
            &material.ambient,
            &material.diffuse,
            &material.specular,
            &material.emission,
        ];
        for color in colors {
            let quad = color.map(quantize_channel);
            self.put("writing material colors", quad.len(), |w| w.write_all(&quad))?;
        }
        self.put("writing shininess", 4, |w| w.write_f32::<B>(material.shininess))?;

        let texture = material.diffuse_texture.as_deref().unwrap_or("");
        if texture.len() > u8::MAX as usize {
            return Err(CodecError::TooLarge {
                what: "bytes in texture name",
                len: texture.len(),
                max: u8::MAX as usize,
            });
        }
        self.u8("writing texture name", texture.len() as u8)?;
        self.put("writing texture name", texture.len(), |w| w.write_all(texture.as_bytes()))
    }

    /// Material index or table count, one byte in TDB and two in TDM.
    fn table_value(&mut self, container: Container, value: u16) -> Result<(), CodecError> {
        match container {
            Container::Asset => self.u8("writing material index", value as u8),
            Container::Model => self.u16("writing material index", value),
        }
    }

    fn floats(&mut self, context: &'static str, buffer: &FloatBuffer) -> Result<(), CodecError> {
        for value in buffer.iter() {
            self.put(context, 4, |w| w.write_f32::<B>(value))?;
        }
        Ok(())
    }

    fn string_u16(&mut self, what: &'static str, value: &str) -> Result<(), CodecError> {
        if value.len() > u16::MAX as usize {
            return Err(CodecError::TooLarge {
                what,
                len: value.len(),
                max: u16::MAX as usize,
            });
        }
        self.u16("writing string length", value.len() as u16)?;
        self.put("writing string", value.len(), |w| w.write_all(value.as_bytes()))
    }

    fn count_u16(&mut self, what: &'static str, len: usize) -> Result<(), CodecError> {
        let count = u16::try_from(len).map_err(|_| CodecError::TooLarge {
            what,
            len,
            max: u16::MAX as usize,
        })?;
        self.u16("writing count", count)
    }

    fn count_i32(&mut self, what: &'static str, len: usize) -> Result<(), CodecError> {
        let count = i32::try_from(len).map_err(|_| CodecError::TooLarge {
            what,
            len,
            max: i32::MAX as usize,
        })?;
        self.put("writing count", 4, |w| w.write_i32::<B>(count))
    }

    fn u8(&mut self, context: &'static str, value: u8) -> Result<(), CodecError> {
        self.put(context, 1, |w| w.write_u8(value))
    }

    fn u16(&mut self, context: &'static str, value: u16) -> Result<(), CodecError> {
        self.put(context, 2, |w| w.write_u16::<B>(value))
    }

    fn put(
        &mut self,
        context: &'static str,
        len: usize,
        op: impl FnOnce(&mut W) -> io::Result<()>,
    ) -> Result<(), CodecError> {
        let offset = self.offset;
        op(&mut self.writer).map_err(|source| CodecError::Io {
            context,
            offset,
            source,
        })?;
        self.offset += len as u64;
        Ok(())
    }

    fn finish(mut self) -> Result<(), CodecError> {
        let offset = self.offset;
        self.writer.flush().map_err(|source| CodecError::Io {
            context: "flushing",
            offset,
            source,
        })
    }
}
