//! Wavefront OBJ front-end: turns `v`/`vt`/`vn` records into pool entries and
//! `f`/`l`/`p`/`usemtl` records into [`MeshBuilder`] calls.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, anyhow};

use crate::builder::MeshBuilder;
use crate::mesh::Mesh;
use crate::pool::Handle;

/// Load an OBJ mesh from a file path. The mesh id is the file stem.
pub fn load_obj_from_path(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    let id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    load_obj_from_reader(BufReader::new(file), id)
}

/// Load an OBJ mesh from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R, id: impl Into<String>) -> Result<Mesh> {
    load_obj_with_builder(reader, &mut MeshBuilder::new(), id)
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str, id: impl Into<String>) -> Result<Mesh> {
    load_obj_from_reader(io::Cursor::new(contents), id)
}

/// Parse with a caller-configured builder (batch cap, normal policy, byte order).
///
/// The builder must be empty; OBJ indices are resolved against its pools.
pub fn load_obj_with_builder<R: BufRead>(
    reader: R,
    builder: &mut MeshBuilder,
    id: impl Into<String>,
) -> Result<Mesh> {
    if !builder.vertices().is_empty()
        || builder.pending_index_count() > 0
        || builder.group_count() > 0
    {
        anyhow::bail!("OBJ loading needs an empty mesh builder");
    }

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let tag = parts
            .next()
            .ok_or_else(|| anyhow!("Malformed OBJ line {}: '{}'", line_no + 1, trimmed))?;

        match tag {
            "v" => {
                builder.add_vertex(parse_floats(&mut parts, line_no, "vertex position")?);
            }
            "vt" => {
                builder.add_tex_coord(parse_floats(&mut parts, line_no, "texture coordinate")?);
            }
            "vn" => {
                builder.add_normal(parse_floats(&mut parts, line_no, "vertex normal")?);
            }
            "usemtl" => match parts.next() {
                Some(name) => builder.use_material(name),
                None => builder.use_no_material(),
            },
            "f" => {
                let corners = parts
                    .map(|part| parse_face_vertex(part, builder, line_no))
                    .collect::<Result<Vec<_>>>()?;
                if corners.len() < 3 {
                    log::warn!(
                        "Skipping face with {} vertices on line {}",
                        corners.len(),
                        line_no + 1
                    );
                    continue;
                }

                let positions: Vec<Handle> = corners.iter().map(|c| c.0).collect();
                // Optional attributes are kept only when every corner has them.
                if let Some(tex_coords) = corners.iter().map(|c| c.1).collect::<Option<Vec<_>>>() {
                    builder.use_tex_coords(&tex_coords);
                }
                if let Some(normals) = corners.iter().map(|c| c.2).collect::<Option<Vec<_>>>() {
                    builder.use_normals(&normals);
                }
                builder
                    .add_element(positions.len(), &positions)
                    .with_context(|| format!("Invalid face on line {}", line_no + 1))?;
            }
            "l" => {
                let points = parts
                    .map(|part| parse_face_vertex(part, builder, line_no).map(|c| c.0))
                    .collect::<Result<Vec<_>>>()?;
                if points.len() < 2 {
                    log::warn!(
                        "Skipping line with {} vertices on line {}",
                        points.len(),
                        line_no + 1
                    );
                    continue;
                }
                let segments: Vec<Handle> = points.windows(2).flatten().copied().collect();
                builder
                    .add_element(2, &segments)
                    .with_context(|| format!("Invalid line on line {}", line_no + 1))?;
            }
            "p" => {
                let points = parts
                    .map(|part| parse_face_vertex(part, builder, line_no).map(|c| c.0))
                    .collect::<Result<Vec<_>>>()?;
                if points.is_empty() {
                    continue;
                }
                builder
                    .add_element(1, &points)
                    .with_context(|| format!("Invalid point on line {}", line_no + 1))?;
            }
            _ => {
                // Ignore other directives (o/g/s/mtllib/etc.)
            }
        }
    }

    let mesh = builder.build(id);
    if mesh.is_empty() {
        anyhow::bail!("OBJ contained no elements");
    }
    log::debug!(
        "Loaded OBJ mesh '{}': {} groups, {} vertices",
        mesh.id(),
        mesh.groups().len(),
        mesh.vertex_count()
    );
    Ok(mesh)
}

/// Read the leading `N` components of a record; trailing ones (`w`, `vt` depth) are ignored.
fn parse_floats<'a, const N: usize>(
    parts: &mut impl Iterator<Item = &'a str>,
    line_no: usize,
    what: &str,
) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    for (axis, slot) in out.iter_mut().enumerate() {
        let token = parts.next().ok_or_else(|| {
            anyhow!("{} on line {} has {} of {} components", what, line_no + 1, axis, N)
        })?;
        *slot = token.parse::<f32>().with_context(|| {
            format!("Bad {} component '{}' on line {}", what, token, line_no + 1)
        })?;
    }
    Ok(out)
}

/// Resolve `v[/vt[/vn]]` to pool handles.
fn parse_face_vertex(
    token: &str,
    builder: &MeshBuilder,
    line_no: usize,
) -> Result<(Handle, Option<Handle>, Option<Handle>)> {
    let mut split = token.split('/');
    let pos = split
        .next()
        .ok_or_else(|| anyhow!("Malformed face element '{}' on line {}", token, line_no + 1))?;
    let pos_idx = resolve_index(pos, builder.vertices().len(), line_no)?;

    let tex_idx = match split.next() {
        Some(value) if !value.is_empty() => {
            Some(resolve_index(value, builder.tex_coords().len(), line_no)?)
        }
        _ => None,
    };

    let norm_idx = match split.next() {
        Some(value) if !value.is_empty() => {
            Some(resolve_index(value, builder.normals().len(), line_no)?)
        }
        _ => None,
    };

    Ok((pos_idx, tex_idx, norm_idx))
}

/// Map a 1-based (or negative, relative) OBJ index to a pool handle.
fn resolve_index(token: &str, len: usize, line_no: usize) -> Result<Handle> {
    let raw = token
        .parse::<i64>()
        .with_context(|| format!("Invalid index '{}' on line {}", token, line_no + 1))?;
    if raw == 0 {
        anyhow::bail!("OBJ indices are 1-based; found 0 on line {}", line_no + 1);
    }

    let idx = if raw > 0 { raw - 1 } else { len as i64 + raw };
    if idx < 0 || idx as usize >= len {
        anyhow::bail!(
            "OBJ index {} resolved out of bounds (len={}) on line {}",
            raw,
            len,
            line_no + 1
        );
    }

    Handle::try_from(idx)
        .map_err(|_| anyhow!("OBJ index {} does not fit a handle on line {}", raw, line_no + 1))
}
