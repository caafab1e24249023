use crate::buffer::{FloatBufferBuilder, IndexBufferBuilder};
use crate::error::{IndexOverflow, MergeError};
use crate::mesh::{Mesh, MeshPolygons};

pub enum MeshMerger {}

impl MeshMerger {
    /// Concatenate groups sharing material, primitive mode and attribute layout
    /// into one group. Vertex buffers are appended and every group's indices are
    /// rebased past the vertices that precede it.
    ///
    /// The result may exceed the builder's batch cap; it is meant for upload or
    /// collision building, not for further batching.
    pub fn merge_groups(groups: &[MeshPolygons]) -> Result<MeshPolygons, MergeError> {
        Self::merge_refs(&groups.iter().collect::<Vec<_>>())
    }

    /// Merge every set of compatible groups of `mesh`, keeping the order in
    /// which each combination first appears.
    pub fn merge_compatible(mesh: &Mesh) -> Result<Mesh, MergeError> {
        let mut buckets: Vec<Vec<&MeshPolygons>> = Vec::new();
        for group in mesh.groups() {
            match buckets.iter_mut().find(|b| b[0].is_compatible(group)) {
                Some(bucket) => bucket.push(group),
                None => buckets.push(vec![group]),
            }
        }

        let groups = buckets
            .iter()
            .map(|bucket| Self::merge_refs(bucket))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "Merged mesh '{}' from {} into {} groups",
            mesh.id(),
            mesh.groups().len(),
            groups.len()
        );
        Ok(Mesh::from_parts(mesh.id().to_owned(), groups, mesh.materials().to_vec()))
    }

    fn merge_refs(groups: &[&MeshPolygons]) -> Result<MeshPolygons, MergeError> {
        let first = *groups.first().ok_or(MergeError::Empty)?;
        if let Some(index) = groups.iter().position(|g| !first.is_compatible(g)) {
            return Err(MergeError::Incompatible { index });
        }

        let mut positions = FloatBufferBuilder::with_endian(first.positions().endian());
        let mut normals = first
            .normals()
            .map(|n| FloatBufferBuilder::with_endian(n.endian()));
        let mut tex_coords = first
            .tex_coords()
            .map(|t| FloatBufferBuilder::with_endian(t.endian()));
        let mut indices = IndexBufferBuilder::with_endian(first.indices().endian());

        let mut base = 0u32;
        for group in groups {
            positions.extend(group.positions().iter());
            if let (Some(out), Some(src)) = (normals.as_mut(), group.normals()) {
                out.extend(src.iter());
            }
            if let (Some(out), Some(src)) = (tex_coords.as_mut(), group.tex_coords()) {
                out.extend(src.iter());
            }

            indices.set_offset(base);
            for index in group.indices().iter() {
                indices.try_add(index)?;
            }
            let count = group.vertex_count();
            base = u32::try_from(count)
                .ok()
                .and_then(|count| base.checked_add(count))
                .ok_or(IndexOverflow {
                    value: count.try_into().unwrap_or(u32::MAX),
                    offset: base,
                })?;
        }

        Ok(MeshPolygons::from_parts(
            first.material(),
            first.primitive(),
            positions.build(),
            normals.as_mut().map(FloatBufferBuilder::build),
            tex_coords.as_mut().map(FloatBufferBuilder::build),
            indices.build(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ElementWidth;
    use crate::builder::{BuilderConfig, MeshBuilder, NormalPolicy};
    use crate::mesh::PrimitiveMode;

    /// Four groups: A triangles (198 vertices), A lines, B triangles,
    /// A triangles again (198 vertices).
    fn split_mesh() -> Mesh {
        let mut builder = MeshBuilder::with_config(BuilderConfig {
            normal_policy: NormalPolicy::None,
            ..BuilderConfig::default()
        });
        let a = builder.add_vertex([0.0, 0.0, 0.0]);
        let b = builder.add_vertex([1.0, 0.0, 0.0]);
        let c = builder.add_vertex([0.0, 1.0, 0.0]);
        let tri = [a, b, c];

        builder.use_material("A");
        builder.add_element(3, &tri.repeat(66)).unwrap();
        builder.add_element(2, &[a, b]).unwrap();
        builder.use_material("B");
        builder.add_element(3, &tri).unwrap();
        builder.use_material("A");
        builder.add_element(3, &tri.repeat(66)).unwrap();
        builder.build("split")
    }

    #[test]
    fn merges_compatible_groups_with_rebased_indices() {
        let mesh = split_mesh();
        assert_eq!(mesh.groups().len(), 4);

        let merged = MeshMerger::merge_compatible(&mesh).unwrap();
        assert_eq!(merged.groups().len(), 3);
        assert_eq!(merged.materials(), mesh.materials());

        let a = &merged.groups()[0];
        assert_eq!(a.primitive(), PrimitiveMode::Triangles);
        assert_eq!(a.vertex_count(), 396);
        let indices = a.indices().to_vec();
        assert!(indices.iter().copied().eq(0..396));
        // rebasing past 255 promoted the index width
        assert_eq!(a.indices().width(), ElementWidth::Short);

        assert_eq!(merged.groups()[1].primitive(), PrimitiveMode::Lines);
        assert_eq!(merged.groups()[2].material(), Some(1));
        assert_eq!(merged.vertex_count(), mesh.vertex_count());
    }

    #[test]
    fn rejects_incompatible_and_empty_input() {
        let mesh = split_mesh();
        assert_eq!(
            MeshMerger::merge_groups(mesh.groups()),
            Err(MergeError::Incompatible { index: 1 })
        );
        assert_eq!(MeshMerger::merge_groups(&[]), Err(MergeError::Empty));
    }
}
