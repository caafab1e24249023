//! Procedural demo shapes fed through the mesh builder.

use std::f32::consts::TAU;

use anyhow::Result;
use asset::{Material, Mesh, MeshBuilder, Model, NamedMaterial};
use corelib::transform::Transform;
use corelib::{Sampler, SamplerValue, Vec3};

/// Unit cube centered at the origin, one quad per face with UVs from 0 to 1.
/// Normals come from the builder's flat-normal generation.
pub fn cube(material: &str) -> Result<Mesh> {
    let mut builder = MeshBuilder::new();

    let corners = [
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
    ];
    let v: Vec<_> = corners.into_iter().map(|c| builder.add_vertex(c)).collect();

    let uv = [
        builder.add_tex_coord([0.0, 0.0]),
        builder.add_tex_coord([1.0, 0.0]),
        builder.add_tex_coord([1.0, 1.0]),
        builder.add_tex_coord([0.0, 1.0]),
    ];

    // Counter-clockwise seen from outside.
    let faces = [
        [v[0], v[1], v[2], v[3]], // front
        [v[5], v[4], v[7], v[6]], // back
        [v[4], v[0], v[3], v[7]], // left
        [v[1], v[5], v[6], v[2]], // right
        [v[3], v[2], v[6], v[7]], // top
        [v[4], v[5], v[1], v[0]], // bottom
    ];

    builder.use_material(material);
    for face in faces {
        builder.use_tex_coords(&uv);
        builder.add_element(4, &face)?;
    }
    Ok(builder.build("cube"))
}

/// Square line grid on the XZ plane with `cells` cells per side.
pub fn grid(material: &str, cells: u32, size: f32) -> Result<Mesh> {
    let mut builder = MeshBuilder::new();
    builder.use_material(material);

    let half = size * 0.5;
    let step = size / cells.max(1) as f32;
    for i in 0..=cells.max(1) {
        let t = -half + step * i as f32;
        let x0 = builder.add_vertex([t, 0.0, -half]);
        let x1 = builder.add_vertex([t, 0.0, half]);
        let z0 = builder.add_vertex([-half, 0.0, t]);
        let z1 = builder.add_vertex([half, 0.0, t]);
        builder.add_element(2, &[x0, x1, z0, z1])?;
    }
    Ok(builder.build("grid"))
}

/// Cube snapshots spinning once around Y, sampled from a linear transform track.
pub fn turntable(cube: &Mesh, frames: u32) -> Result<Vec<Mesh>> {
    let mut track: Sampler<Transform> = Sampler::interpolated();
    for (key, angle) in [(0.0, 0.0), (1.0, TAU * 0.5), (2.0, TAU)] {
        let pose = Transform::IDENTITY.with_rotation(Vec3::new(0.0, angle, 0.0));
        track.add_sample(key, SamplerValue::linear(pose))?;
    }

    let mut meshes = Vec::with_capacity(frames as usize);
    for frame in 0..frames {
        let time = 2.0 * frame as f32 / frames as f32;
        let Some(pose) = track.get_sample(time)? else {
            continue;
        };
        meshes.push(
            cube.transformed(&pose.matrix())
                .with_id(format!("{}.frame{}", cube.id(), frame)),
        );
    }
    Ok(meshes)
}

/// Cube, grid and optional turntable frames with their two materials.
pub fn demo_model(frames: u32) -> Result<Model> {
    let cube = cube("crate")?;
    let grid = grid("grid", 10, 10.0)?;

    let mut meshes = turntable(&cube, frames)?;
    meshes.insert(0, cube);
    meshes.insert(1, grid);

    Ok(Model {
        meshes,
        materials: vec![
            NamedMaterial::new(
                "crate",
                Material::default()
                    .with_diffuse([0.6, 0.4, 0.2, 1.0])
                    .with_specular([0.3, 0.3, 0.3, 1.0], 16.0)
                    .with_texture("crate.png"),
            ),
            NamedMaterial::new(
                "grid",
                Material {
                    emission: [0.5, 0.5, 0.5, 1.0],
                    ..Material::default()
                },
            ),
        ],
    })
}
