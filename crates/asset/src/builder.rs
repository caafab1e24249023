//! Incremental mesh construction.
//!
//! [`MeshBuilder`] takes attribute values (returning pool handles) and
//! elements that reference those handles. Elements are gathered into a pending
//! batch; the batch is flushed into an immutable [`MeshPolygons`] group whenever
//! the material, primitive size or attribute layout changes, or when it would
//! grow past the configured index cap. [`MeshBuilder::build`] flushes what is
//! left and hands out the [`Mesh`].
//!
//! ```
//! use asset::builder::MeshBuilder;
//!
//! let mut builder = MeshBuilder::new();
//! let a = builder.add_vertex([0.0, 0.0, 0.0]);
//! let b = builder.add_vertex([1.0, 0.0, 0.0]);
//! let c = builder.add_vertex([1.0, 1.0, 0.0]);
//! let d = builder.add_vertex([0.0, 1.0, 0.0]);
//! builder.use_material("stone");
//! builder.add_element(4, &[a, b, c, d]).unwrap();
//!
//! let mesh = builder.build("quad");
//! assert_eq!(mesh.groups().len(), 1);
//! assert_eq!(mesh.groups()[0].element_count(), 2);
//! ```

use glam::Vec3;

use crate::buffer::{Endian, FloatBufferBuilder, IndexBufferBuilder};
use crate::error::{Attribute, BuilderError};
use crate::mesh::{Mesh, MeshPolygons, PrimitiveMode};
use crate::pool::{AttributePool, Handle, NormalPool, TexCoordPool, VertexPool};

/// Largest number of indices a pending batch may hold before it is flushed.
pub const DEFAULT_BATCH_INDEX_CAP: usize = 32_768;

/// What to do for polygons added without explicit normals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NormalPolicy {
    /// Generate one face normal per polygon (flat shading).
    #[default]
    Flat,
    /// Leave such polygons without normals.
    None,
}

#[derive(Clone, Copy, Debug)]
pub struct BuilderConfig {
    pub batch_index_cap: usize,
    pub normal_policy: NormalPolicy,
    /// Byte order of the buffers in built groups.
    pub endian: Endian,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            batch_index_cap: DEFAULT_BATCH_INDEX_CAP,
            normal_policy: NormalPolicy::Flat,
            endian: Endian::native(),
        }
    }
}

/// Everything that forces a flush when it changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BatchKey {
    material: Option<usize>,
    primitive: PrimitiveMode,
    normals: bool,
    tex_coords: bool,
}

/// Pending group being accumulated.
struct Batch {
    key: Option<BatchKey>,
    positions: FloatBufferBuilder,
    normals: FloatBufferBuilder,
    tex_coords: FloatBufferBuilder,
    indices: IndexBufferBuilder,
    next_index: u32,
}

impl Batch {
    fn new(endian: Endian) -> Self {
        Self {
            key: None,
            positions: FloatBufferBuilder::with_endian(endian),
            normals: FloatBufferBuilder::with_endian(endian),
            tex_coords: FloatBufferBuilder::with_endian(endian),
            indices: IndexBufferBuilder::with_endian(endian),
            next_index: 0,
        }
    }

    #[inline]
    fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Turn the accumulated data into a group and reset. `None` if nothing was added.
    fn finish(&mut self) -> Option<MeshPolygons> {
        let key = self.key.take()?;
        self.next_index = 0;

        let positions = self.positions.build();
        let normals = self.normals.build();
        let tex_coords = self.tex_coords.build();
        let indices = self.indices.build();
        if indices.is_empty() {
            return None;
        }

        Some(MeshPolygons::from_parts(
            key.material,
            key.primitive,
            positions,
            key.normals.then_some(normals),
            key.tex_coords.then_some(tex_coords),
            indices,
        ))
    }
}

/// Batching mesh builder. Reusable: [`MeshBuilder::build`] resets all state.
pub struct MeshBuilder {
    config: BuilderConfig,
    vertices: VertexPool,
    normals: NormalPool,
    tex_coords: TexCoordPool,
    materials: Vec<String>,
    current_material: Option<usize>,
    staged_normals: Option<Vec<Handle>>,
    staged_tex_coords: Option<Vec<Handle>>,
    batch: Batch,
    groups: Vec<MeshPolygons>,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self {
            config,
            vertices: AttributePool::new(),
            normals: AttributePool::new(),
            tex_coords: AttributePool::new(),
            materials: Vec::new(),
            current_material: None,
            staged_normals: None,
            staged_tex_coords: None,
            batch: Batch::new(config.endian),
            groups: Vec::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn add_vertex(&mut self, position: [f32; 3]) -> Handle {
        self.vertices.push(position)
    }

    pub fn add_normal(&mut self, normal: [f32; 3]) -> Handle {
        self.normals.push(normal)
    }

    pub fn add_tex_coord(&mut self, uv: [f32; 2]) -> Handle {
        self.tex_coords.push(uv)
    }

    #[inline]
    pub fn vertices(&self) -> &VertexPool {
        &self.vertices
    }

    #[inline]
    pub fn normals(&self) -> &NormalPool {
        &self.normals
    }

    #[inline]
    pub fn tex_coords(&self) -> &TexCoordPool {
        &self.tex_coords
    }

    /// Material names registered so far, in table order.
    #[inline]
    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    /// Switch to material `id`, registering it on first use.
    pub fn use_material(&mut self, id: &str) {
        let index = match self.materials.iter().position(|m| m == id) {
            Some(index) => index,
            None => {
                self.materials.push(id.to_owned());
                self.materials.len() - 1
            }
        };
        self.switch_material(Some(index));
    }

    /// Switch back to "no material".
    pub fn use_no_material(&mut self) {
        self.switch_material(None);
    }

    fn switch_material(&mut self, material: Option<usize>) {
        if material != self.current_material {
            self.flush();
            self.current_material = material;
        }
    }

    /// Stage per-vertex normals for the next [`MeshBuilder::add_element`] call only.
    pub fn use_normals(&mut self, handles: &[Handle]) {
        self.staged_normals = Some(handles.to_vec());
    }

    /// Stage per-vertex texture coordinates for the next [`MeshBuilder::add_element`] call only.
    pub fn use_tex_coords(&mut self, handles: &[Handle]) {
        self.staged_tex_coords = Some(handles.to_vec());
    }

    /// Add `vertices.len() / size` elements of `size` vertices each.
    ///
    /// Sizes 1, 2 and 3 add points, lines and triangles; larger sizes are
    /// polygons split into a triangle fan around their first vertex. Staged
    /// normals and texture coordinates must supply one handle per vertex
    /// handle. Staged attributes are consumed by this call even when it fails,
    /// and a failing call leaves the mesh untouched.
    pub fn add_element(&mut self, size: usize, vertices: &[Handle]) -> Result<(), BuilderError> {
        let normals = self.staged_normals.take();
        let tex_coords = self.staged_tex_coords.take();

        if size == 0 {
            return Err(BuilderError::InvalidPrimitiveSize(size));
        }
        if vertices.len() % size != 0 {
            return Err(BuilderError::ElementCount {
                size,
                count: vertices.len(),
            });
        }
        check_count(Attribute::Normal, normals.as_deref(), vertices.len())?;
        check_count(Attribute::TexCoord, tex_coords.as_deref(), vertices.len())?;
        check_handles(Attribute::Vertex, Some(vertices), self.vertices.len())?;
        check_handles(Attribute::Normal, normals.as_deref(), self.normals.len())?;
        check_handles(Attribute::TexCoord, tex_coords.as_deref(), self.tex_coords.len())?;

        for (i, element) in vertices.chunks_exact(size).enumerate() {
            let span = i * size..(i + 1) * size;
            let normals = normals.as_ref().map(|n| &n[span.clone()]);
            let tex_coords = tex_coords.as_ref().map(|t| &t[span]);
            self.add_polygon(element, normals, tex_coords);
        }
        Ok(())
    }

    /// Add one validated element, generating normals and fanning as needed.
    fn add_polygon(
        &mut self,
        vertices: &[Handle],
        normals: Option<&[Handle]>,
        tex_coords: Option<&[Handle]>,
    ) {
        let size = vertices.len();

        let generated;
        let normals = match normals {
            None if size >= 3 && self.config.normal_policy == NormalPolicy::Flat => {
                let normal = self.face_normal(vertices[0], vertices[1], vertices[2]);
                generated = vec![self.normals.push(normal); size];
                Some(generated.as_slice())
            }
            other => other,
        };

        if size <= 3 {
            // size is 1..=3 here
            if let Some(primitive) = PrimitiveMode::from_size(size) {
                self.append(primitive, vertices, normals, tex_coords);
            }
            return;
        }

        let fan = |attr: &[Handle], i: usize| [attr[0], attr[i], attr[i + 1]];
        for i in 1..size - 1 {
            let triangle = fan(vertices, i);
            let n = normals.map(|n| fan(n, i));
            let t = tex_coords.map(|t| fan(t, i));
            self.append(
                PrimitiveMode::Triangles,
                &triangle,
                n.as_ref().map(|n| n.as_slice()),
                t.as_ref().map(|t| t.as_slice()),
            );
        }
    }

    /// `normalize(cross(v1 - v0, v2 - v0))`, zero for degenerate faces.
    fn face_normal(&self, v0: Handle, v1: Handle, v2: Handle) -> [f32; 3] {
        let p0 = Vec3::from(self.vertices[v0]);
        let p1 = Vec3::from(self.vertices[v1]);
        let p2 = Vec3::from(self.vertices[v2]);
        (p1 - p0).cross(p2 - p0).normalize_or_zero().to_array()
    }

    fn append(
        &mut self,
        primitive: PrimitiveMode,
        vertices: &[Handle],
        normals: Option<&[Handle]>,
        tex_coords: Option<&[Handle]>,
    ) {
        let key = BatchKey {
            material: self.current_material,
            primitive,
            normals: normals.is_some(),
            tex_coords: tex_coords.is_some(),
        };

        let over_cap = self.batch.index_count() + vertices.len() > self.config.batch_index_cap;
        if self.batch.key.is_some_and(|pending| pending != key) || over_cap {
            self.flush();
        }
        self.batch.key = Some(key);

        for (i, &vertex) in vertices.iter().enumerate() {
            self.batch.positions.extend(self.vertices[vertex]);
            if let Some(normals) = normals {
                self.batch.normals.extend(self.normals[normals[i]]);
            }
            if let Some(tex_coords) = tex_coords {
                self.batch.tex_coords.extend(self.tex_coords[tex_coords[i]]);
            }
            self.batch.indices.add(self.batch.next_index);
            self.batch.next_index += 1;
        }
    }

    /// Finalize the pending batch, if any, into a group.
    fn flush(&mut self) {
        if let Some(group) = self.batch.finish() {
            log::debug!(
                "Flushed group {}: material {:?}, {:?}, {} vertices, {} indices ({} byte indices)",
                self.groups.len(),
                group.material().and_then(|m| self.materials.get(m)),
                group.primitive(),
                group.vertex_count(),
                group.index_count(),
                group.indices().width().bytes()
            );
            self.groups.push(group);
        }
    }

    /// Indices waiting in the pending batch.
    #[inline]
    pub fn pending_index_count(&self) -> usize {
        self.batch.index_count()
    }

    /// Groups finalized so far in this session.
    #[inline]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Flush and hand out the mesh. The builder is empty afterwards.
    pub fn build(&mut self, id: impl Into<String>) -> Mesh {
        self.flush();

        let mesh = Mesh::from_parts(
            id.into(),
            std::mem::take(&mut self.groups),
            std::mem::take(&mut self.materials),
        );

        self.vertices.clear();
        self.normals.clear();
        self.tex_coords.clear();
        self.current_material = None;
        self.staged_normals = None;
        self.staged_tex_coords = None;

        log::debug!(
            "Built mesh '{}': {} groups, {} vertices, {} indices",
            mesh.id(),
            mesh.groups().len(),
            mesh.vertex_count(),
            mesh.index_count()
        );
        mesh
    }
}

fn check_count(
    attribute: Attribute,
    handles: Option<&[Handle]>,
    expected: usize,
) -> Result<(), BuilderError> {
    match handles {
        Some(handles) if handles.len() != expected => Err(BuilderError::AttributeCount {
            attribute,
            expected,
            actual: handles.len(),
        }),
        _ => Ok(()),
    }
}

fn check_handles(
    attribute: Attribute,
    handles: Option<&[Handle]>,
    len: usize,
) -> Result<(), BuilderError> {
    let Some(handles) = handles else {
        return Ok(());
    };
    match handles.iter().find(|&&h| h as usize >= len) {
        Some(&handle) => Err(BuilderError::UnknownHandle {
            attribute,
            handle,
            len,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ElementWidth;
    use crate::mesh::GroupFlags;

    /// Builder with a unit quad in the XY plane: handles 0..4, counter-clockwise.
    fn quad_builder() -> MeshBuilder {
        let mut builder = MeshBuilder::new();
        builder.add_vertex([0.0, 0.0, 0.0]);
        builder.add_vertex([1.0, 0.0, 0.0]);
        builder.add_vertex([1.0, 1.0, 0.0]);
        builder.add_vertex([0.0, 1.0, 0.0]);
        builder
    }

    fn positions(group: &MeshPolygons) -> Vec<[f32; 3]> {
        group.indexed_vertices().map(|v| v.position).collect()
    }

    #[test]
    fn fan_triangulates_polygons() {
        let mut builder = MeshBuilder::new();
        for i in 0..14 {
            builder.add_vertex([i as f32, (i * i) as f32, 1.0]);
        }
        builder.add_element(4, &[10, 11, 12, 13]).unwrap();
        let mesh = builder.build("fan");

        assert_eq!(mesh.groups().len(), 1);
        let group = &mesh.groups()[0];
        assert_eq!(group.primitive(), PrimitiveMode::Triangles);
        assert_eq!(group.element_count(), 2);

        let expected: Vec<[f32; 3]> = [10, 11, 12, 10, 12, 13]
            .iter()
            .map(|&i: &i32| [i as f32, (i * i) as f32, 1.0])
            .collect();
        assert_eq!(positions(group), expected);
    }

    #[test]
    fn pentagon_fans_into_three_triangles() {
        let mut builder = quad_builder();
        builder.add_vertex([-0.5, 0.5, 0.0]);
        builder.add_element(5, &[0, 1, 2, 3, 4]).unwrap();
        let mesh = builder.build("pentagon");
        assert_eq!(mesh.groups()[0].element_count(), 3);
        let pos = positions(&mesh.groups()[0]);
        // every triangle starts at the first vertex
        assert!(pos.chunks(3).all(|tri| tri[0] == [0.0, 0.0, 0.0]));
        assert_eq!(pos[7], [0.0, 1.0, 0.0]);
        assert_eq!(pos[8], [-0.5, 0.5, 0.0]);
    }

    #[test]
    fn flat_normal_is_registered_once_per_polygon() {
        let mut builder = quad_builder();
        builder.add_element(4, &[0, 1, 2, 3]).unwrap();
        assert_eq!(builder.normals().len(), 1);
        assert_eq!(builder.normals()[0], [0.0, 0.0, 1.0]);

        let mesh = builder.build("quad");
        let group = &mesh.groups()[0];
        assert_eq!(group.flags(), GroupFlags::NORMALS);
        assert!(group.indexed_vertices().all(|v| v.normal == Some([0.0, 0.0, 1.0])));
    }

    #[test]
    fn degenerate_face_gets_zero_normal() {
        let mut builder = MeshBuilder::new();
        let a = builder.add_vertex([1.0, 1.0, 1.0]);
        builder.add_element(3, &[a, a, a]).unwrap();
        assert_eq!(builder.normals()[0], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn normal_policy_none_skips_generation() {
        let mut builder = MeshBuilder::with_config(BuilderConfig {
            normal_policy: NormalPolicy::None,
            ..BuilderConfig::default()
        });
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            builder.add_vertex(p);
        }
        builder.add_element(3, &[0, 1, 2]).unwrap();
        assert!(builder.normals().is_empty());
        let mesh = builder.build("bare");
        assert_eq!(mesh.groups()[0].flags(), GroupFlags::empty());
    }

    #[test]
    fn explicit_attributes_are_used() {
        let mut builder = quad_builder();
        let n = builder.add_normal([0.0, 1.0, 0.0]);
        let uv: Vec<Handle> = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]
            .into_iter()
            .map(|t| builder.add_tex_coord(t))
            .collect();

        builder.use_normals(&[n, n, n]);
        builder.use_tex_coords(&uv);
        builder.add_element(3, &[0, 1, 2]).unwrap();
        let mesh = builder.build("tri");

        let group = &mesh.groups()[0];
        assert_eq!(group.flags(), GroupFlags::NORMALS | GroupFlags::TEX_COORDS);
        let vertices: Vec<_> = group.indexed_vertices().collect();
        assert_eq!(vertices[1].normal, Some([0.0, 1.0, 0.0]));
        assert_eq!(vertices[2].uv, Some([1.0, 1.0]));
    }

    #[test]
    fn staged_attributes_apply_to_one_call() {
        let mut builder = quad_builder();
        let uv = builder.add_tex_coord([0.5, 0.5]);
        builder.use_tex_coords(&[uv, uv, uv]);
        builder.add_element(3, &[0, 1, 2]).unwrap();
        builder.add_element(3, &[0, 2, 3]).unwrap();
        let mesh = builder.build("split");

        // texcoord presence changed between the calls
        assert_eq!(mesh.groups().len(), 2);
        assert!(mesh.groups()[0].tex_coords().is_some());
        assert!(mesh.groups()[1].tex_coords().is_none());
    }

    #[test]
    fn material_switch_flushes_with_local_indices() {
        let mut builder = quad_builder();
        builder.use_material("A");
        builder.add_element(3, &[0, 1, 2]).unwrap();
        builder.add_element(3, &[0, 2, 3]).unwrap();
        builder.use_material("B");
        builder.add_element(3, &[0, 1, 2]).unwrap();
        builder.use_material("B");
        builder.add_element(2, &[0, 2]).unwrap();
        let mesh = builder.build("two");

        assert_eq!(mesh.materials(), ["A".to_owned(), "B".to_owned()]);
        assert_eq!(mesh.groups().len(), 3);

        let a = &mesh.groups()[0];
        assert_eq!(mesh.material_name(a), Some("A"));
        assert_eq!(a.indices().to_vec(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(a.vertex_count(), 6);

        let b = &mesh.groups()[1];
        assert_eq!(mesh.material_name(b), Some("B"));
        assert_eq!(b.indices().to_vec(), vec![0, 1, 2]);

        let lines = &mesh.groups()[2];
        assert_eq!(lines.primitive(), PrimitiveMode::Lines);
        assert_eq!(lines.material(), Some(1));
        assert!(lines.normals().is_none());
    }

    #[test]
    fn reselecting_material_reuses_table_entry() {
        let mut builder = quad_builder();
        builder.use_material("A");
        builder.use_material("B");
        builder.use_material("A");
        builder.add_element(1, &[0]).unwrap();
        builder.use_no_material();
        builder.add_element(1, &[1]).unwrap();
        let mesh = builder.build("points");
        assert_eq!(mesh.materials().len(), 2);
        assert_eq!(mesh.groups()[0].material(), Some(0));
        assert_eq!(mesh.groups()[1].material(), None);
    }

    #[test]
    fn soft_cap_splits_batches() {
        let mut builder = MeshBuilder::with_config(BuilderConfig {
            batch_index_cap: 6,
            ..BuilderConfig::default()
        });
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            builder.add_vertex(p);
        }
        builder.add_element(3, &[0, 1, 2, 0, 1, 2, 0, 1, 2]).unwrap();
        assert_eq!(builder.group_count(), 1);
        assert_eq!(builder.pending_index_count(), 3);

        let mesh = builder.build("capped");
        let counts: Vec<_> = mesh.groups().iter().map(|g| g.index_count()).collect();
        assert_eq!(counts, vec![6, 3]);
    }

    #[test]
    fn default_cap_keeps_groups_within_short_indices() {
        let mut builder = MeshBuilder::with_config(BuilderConfig {
            normal_policy: NormalPolicy::None,
            ..BuilderConfig::default()
        });
        let v = builder.add_vertex([0.0, 0.0, 0.0]);
        let handles = vec![v; DEFAULT_BATCH_INDEX_CAP + 10];
        builder.add_element(1, &handles).unwrap();
        let mesh = builder.build("cloud");

        assert_eq!(mesh.groups().len(), 2);
        let first = &mesh.groups()[0];
        assert_eq!(first.index_count(), DEFAULT_BATCH_INDEX_CAP);
        assert_eq!(first.indices().width(), ElementWidth::Short);
        assert_eq!(mesh.groups()[1].indices().width(), ElementWidth::Byte);
    }

    #[test]
    fn usage_errors_leave_state_untouched() {
        let mut builder = quad_builder();
        assert_eq!(
            builder.add_element(3, &[0, 1]),
            Err(BuilderError::ElementCount { size: 3, count: 2 })
        );
        assert_eq!(builder.add_element(0, &[]), Err(BuilderError::InvalidPrimitiveSize(0)));

        let n = builder.add_normal([0.0, 0.0, 1.0]);
        builder.use_normals(&[n, n]);
        assert_eq!(
            builder.add_element(3, &[0, 1, 2]),
            Err(BuilderError::AttributeCount {
                attribute: Attribute::Normal,
                expected: 3,
                actual: 2
            })
        );

        assert_eq!(
            builder.add_element(2, &[0, 9]),
            Err(BuilderError::UnknownHandle {
                attribute: Attribute::Vertex,
                handle: 9,
                len: 4
            })
        );

        assert_eq!(builder.pending_index_count(), 0);
        // the failed call consumed the staged normals
        builder.add_element(2, &[0, 1]).unwrap();
        let mesh = builder.build("after-errors");
        assert_eq!(mesh.groups().len(), 1);
        assert!(mesh.groups()[0].normals().is_none());
    }

    #[test]
    fn build_resets_for_reuse() {
        let mut builder = quad_builder();
        builder.use_material("A");
        builder.add_element(4, &[0, 1, 2, 3]).unwrap();
        let first = builder.build("first");
        assert_eq!(first.id(), "first");
        assert!(!first.is_empty());

        assert!(builder.vertices().is_empty());
        assert!(builder.normals().is_empty());
        assert!(builder.materials().is_empty());

        let second = builder.build("second");
        assert!(second.groups().is_empty());
        assert!(second.materials().is_empty());
    }
}
