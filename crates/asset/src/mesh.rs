//! Immutable mesh values produced by the builder and the codec.

use bitflags::bitflags;
use glam::{Mat4, Vec3};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::buffer::{FloatBuffer, FloatBufferBuilder, TypedBuffer};

/// Primitive kind of a polygon group. The discriminant is the number of
/// vertices per element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PrimitiveMode {
    Points = 1,
    Lines = 2,
    Triangles = 3,
}

impl PrimitiveMode {
    #[inline]
    pub fn vertices_per_element(self) -> usize {
        self as usize
    }

    pub fn from_size(size: usize) -> Option<Self> {
        u8::try_from(size).ok().and_then(|s| Self::try_from(s).ok())
    }
}

bitflags! {
    /// Optional attribute streams carried by a group.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GroupFlags: u8 {
        const NORMALS = 1 << 0;
        const TEX_COORDS = 1 << 1;
    }
}

/// Vertex with position and optional normal/uv. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: Option<[f32; 3]>,
    pub uv: Option<[f32; 2]>,
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    fn around(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    fn grow(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// A batch of elements sharing material, primitive mode and attribute layout.
///
/// Attributes are flattened (`3×N` positions and normals, `2×N` uvs); indices
/// address this group's own vertices only.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshPolygons {
    material: Option<usize>,
    primitive: PrimitiveMode,
    positions: FloatBuffer,
    normals: Option<FloatBuffer>,
    tex_coords: Option<FloatBuffer>,
    indices: TypedBuffer,
}

impl MeshPolygons {
    /// Assemble a group, checking that buffer lengths agree and every index
    /// addresses an existing vertex.
    pub fn new(
        material: Option<usize>,
        primitive: PrimitiveMode,
        positions: FloatBuffer,
        normals: Option<FloatBuffer>,
        tex_coords: Option<FloatBuffer>,
        indices: TypedBuffer,
    ) -> Result<Self, &'static str> {
        if positions.len() % 3 != 0 {
            return Err("position buffer must hold (x, y, z) triples");
        }
        let vertex_count = positions.len() / 3;
        if normals.as_ref().is_some_and(|n| n.len() != vertex_count * 3) {
            return Err("normal buffer must hold one (x, y, z) triple per vertex");
        }
        if tex_coords.as_ref().is_some_and(|t| t.len() != vertex_count * 2) {
            return Err("texture coordinate buffer must hold one (u, v) pair per vertex");
        }
        if indices.len() % primitive.vertices_per_element() != 0 {
            return Err("index count must be a multiple of the primitive size");
        }
        if indices.iter().any(|i| i as usize >= vertex_count) {
            return Err("index addresses a vertex outside the group");
        }

        Ok(Self::from_parts(material, primitive, positions, normals, tex_coords, indices))
    }

    /// Assemble a group whose consistency the caller already guarantees.
    pub(crate) fn from_parts(
        material: Option<usize>,
        primitive: PrimitiveMode,
        positions: FloatBuffer,
        normals: Option<FloatBuffer>,
        tex_coords: Option<FloatBuffer>,
        indices: TypedBuffer,
    ) -> Self {
        Self {
            material,
            primitive,
            positions,
            normals,
            tex_coords,
            indices,
        }
    }

    /// Index into the owning mesh's material table; `None` for no material.
    #[inline]
    pub fn material(&self) -> Option<usize> {
        self.material
    }

    #[inline]
    pub fn primitive(&self) -> PrimitiveMode {
        self.primitive
    }

    pub fn flags(&self) -> GroupFlags {
        let mut flags = GroupFlags::empty();
        flags.set(GroupFlags::NORMALS, self.normals.is_some());
        flags.set(GroupFlags::TEX_COORDS, self.tex_coords.is_some());
        flags
    }

    #[inline]
    pub fn positions(&self) -> &FloatBuffer {
        &self.positions
    }

    #[inline]
    pub fn normals(&self) -> Option<&FloatBuffer> {
        self.normals.as_ref()
    }

    #[inline]
    pub fn tex_coords(&self) -> Option<&FloatBuffer> {
        self.tex_coords.as_ref()
    }

    #[inline]
    pub fn indices(&self) -> &TypedBuffer {
        &self.indices
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Number of points, lines or triangles.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.indices.len() / self.primitive.vertices_per_element()
    }

    /// Same material, primitive mode and attribute layout.
    pub fn is_compatible(&self, other: &MeshPolygons) -> bool {
        self.material == other.material
            && self.primitive == other.primitive
            && self.flags() == other.flags()
    }

    pub fn vertex(&self, index: usize) -> Option<MeshVertex> {
        if index >= self.vertex_count() {
            return None;
        }
        let read3 = |buf: &FloatBuffer| -> Option<[f32; 3]> {
            Some([buf.get(index * 3)?, buf.get(index * 3 + 1)?, buf.get(index * 3 + 2)?])
        };
        Some(MeshVertex {
            position: read3(&self.positions)?,
            normal: self.normals.as_ref().and_then(read3),
            uv: self
                .tex_coords
                .as_ref()
                .and_then(|t| Some([t.get(index * 2)?, t.get(index * 2 + 1)?])),
        })
    }

    /// Vertices in index order, one per element corner.
    pub fn indexed_vertices(&self) -> impl Iterator<Item = MeshVertex> + '_ {
        self.indices
            .iter()
            .filter_map(move |i| self.vertex(i as usize))
    }

    fn transformed(&self, matrix: &Mat4, normal_matrix: &Mat4) -> Self {
        let mut positions = FloatBufferBuilder::with_endian(self.positions.endian());
        for chunk in self.positions.to_vec().chunks_exact(3) {
            let p = matrix.transform_point3(Vec3::from_slice(chunk));
            positions.extend(p.to_array());
        }

        let normals = self.normals.as_ref().map(|normals| {
            let mut out = FloatBufferBuilder::with_endian(normals.endian());
            for chunk in normals.to_vec().chunks_exact(3) {
                let n = normal_matrix
                    .transform_vector3(Vec3::from_slice(chunk))
                    .normalize_or_zero();
                out.extend(n.to_array());
            }
            out.build()
        });

        Self {
            positions: positions.build(),
            normals,
            ..self.clone()
        }
    }
}

/// Indexed mesh made of polygon groups plus the material names they reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    id: String,
    groups: Vec<MeshPolygons>,
    materials: Vec<String>,
}

impl Mesh {
    /// Assemble a mesh, checking that every group's material index resolves.
    pub fn new(
        id: impl Into<String>,
        groups: Vec<MeshPolygons>,
        materials: Vec<String>,
    ) -> Result<Self, &'static str> {
        if groups
            .iter()
            .filter_map(MeshPolygons::material)
            .any(|m| m >= materials.len())
        {
            return Err("group references a material outside the material table");
        }
        Ok(Self::from_parts(id.into(), groups, materials))
    }

    pub(crate) fn from_parts(
        id: String,
        groups: Vec<MeshPolygons>,
        materials: Vec<String>,
    ) -> Self {
        Self {
            id,
            groups,
            materials,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..self
        }
    }

    #[inline]
    pub fn groups(&self) -> &[MeshPolygons] {
        &self.groups
    }

    #[inline]
    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    pub fn material_name(&self, group: &MeshPolygons) -> Option<&str> {
        group
            .material()
            .and_then(|m| self.materials.get(m))
            .map(String::as_str)
    }

    /// `true` when no group holds any element.
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.index_count() == 0)
    }

    pub fn vertex_count(&self) -> usize {
        self.groups.iter().map(MeshPolygons::vertex_count).sum()
    }

    pub fn index_count(&self) -> usize {
        self.groups.iter().map(MeshPolygons::index_count).sum()
    }

    /// Bounds of every vertex position; `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<Aabb> {
        let mut points = self.groups.iter().flat_map(|g| {
            let flat = g.positions().to_vec();
            flat.chunks_exact(3).map(Vec3::from_slice).collect::<Vec<_>>()
        });

        let mut bounds = Aabb::around(points.next()?);
        for p in points {
            bounds.grow(p);
        }
        Some(bounds)
    }

    /// Copy of the mesh with positions moved by `matrix` and normals by its
    /// inverse transpose.
    pub fn transformed(&self, matrix: &Mat4) -> Mesh {
        let normal_matrix = matrix.inverse().transpose();
        Mesh {
            id: self.id.clone(),
            groups: self
                .groups
                .iter()
                .map(|g| g.transformed(matrix, &normal_matrix))
                .collect(),
            materials: self.materials.clone(),
        }
    }
}
