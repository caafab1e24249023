//! Entry point for tdmtool.
//! convert: Wavefront OBJ -> TDB mesh.
//! info: summary of a TDB/TDM file.
//! shapes: procedural demo scene written as TDM.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor};
use std::path::Path;

use anyhow::{Context, Result, bail};
use asset::codec::{self, Container, SUPPORTED_VERSIONS};
use asset::{Endian, Material, Mesh, WriteOptions};

mod shapes;

const USAGE: &str = "usage:
  tdmtool convert <in.obj> <out.tdb> [--big-endian] [--id=NAME]
  tdmtool info <file> [--material]
  tdmtool shapes <out.tdm> [--big-endian] [--frames=N]";

fn parse_write_options(args: &[String]) -> WriteOptions {
    if args.iter().any(|a| a == "--big-endian") {
        WriteOptions::big_endian()
    } else {
        WriteOptions::default()
    }
}

fn parse_id_arg(args: &[String]) -> Option<String> {
    args.iter()
        .find_map(|a| a.strip_prefix("--id="))
        .map(str::to_owned)
}

fn parse_frames_arg(args: &[String]) -> u32 {
    for arg in args {
        if let Some(v) = arg.strip_prefix("--frames=") {
            match v.parse::<u32>() {
                Ok(n) => return n,
                Err(_) => log::warn!("Ignoring invalid frame count '{}'", v),
            }
        }
    }
    0
}

fn positional(args: &[String]) -> Vec<&str> {
    args.iter()
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .collect()
}

fn create(path: &str) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
    Ok(BufWriter::new(file))
}

fn convert(args: &[String]) -> Result<()> {
    let [input, output] = positional(args)[..] else {
        bail!("convert needs an input OBJ and an output path\n{USAGE}");
    };
    let options = parse_write_options(args);

    let mut mesh = asset::obj::load_obj_from_path(input)?;
    if let Some(id) = parse_id_arg(args) {
        mesh = mesh.with_id(id);
    }

    codec::write_mesh(create(output)?, &mesh, &options)
        .with_context(|| format!("Failed to write {}", output))?;
    log::info!(
        "Converted '{}' ({} groups, {} vertices) to {} [{:?} endian]",
        mesh.id(),
        mesh.groups().len(),
        mesh.vertex_count(),
        output,
        options.endian
    );
    Ok(())
}

fn print_mesh(mesh: &Mesh) {
    println!(
        "mesh '{}': {} groups, {} vertices, {} indices",
        mesh.id(),
        mesh.groups().len(),
        mesh.vertex_count(),
        mesh.index_count()
    );
    for (i, group) in mesh.groups().iter().enumerate() {
        println!(
            "  group {}: {:?} x{}, material {}, {:?}, {}-byte indices",
            i,
            group.primitive(),
            group.element_count(),
            mesh.material_name(group).unwrap_or("<none>"),
            group.flags(),
            group.indices().width().bytes()
        );
    }
    if let Some(bounds) = mesh.bounds() {
        println!("  bounds: {} .. {}", bounds.min, bounds.max);
    }
}

fn print_material(name: &str, material: &Material) {
    println!(
        "material '{}': diffuse {:?}, shininess {}, texture {}",
        name,
        material.diffuse,
        material.shininess,
        material.diffuse_texture.as_deref().unwrap_or("<none>")
    );
}

fn info(args: &[String]) -> Result<()> {
    let [path] = positional(args)[..] else {
        bail!("info needs a file\n{USAGE}");
    };
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path))?;
    let header = codec::read_header(
        &mut Cursor::new(&bytes),
        match bytes.get(..3).and_then(Container::from_magic) {
            Some(container) => container,
            None => bail!("{} is not a TDM/TDB file", path),
        },
        &SUPPORTED_VERSIONS,
    )?;
    println!(
        "{}: {:?} container, version {}, {} endian",
        path,
        header.container,
        header.version,
        if header.endian == Endian::Big { "big" } else { "little" }
    );

    match header.container {
        Container::Model => {
            let model = codec::read_model(Cursor::new(&bytes), SUPPORTED_VERSIONS)?;
            for entry in &model.materials {
                print_material(&entry.name, &entry.material);
            }
            for mesh in &model.meshes {
                print_mesh(mesh);
            }
        }
        Container::Asset if args.iter().any(|a| a == "--material") => {
            let material = codec::read_material(Cursor::new(&bytes), SUPPORTED_VERSIONS)?;
            print_material(path, &material);
        }
        Container::Asset => {
            let id = Path::new(path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mesh = codec::read_mesh(Cursor::new(&bytes), id, SUPPORTED_VERSIONS)?;
            print_mesh(&mesh);
        }
    }
    Ok(())
}

fn shapes(args: &[String]) -> Result<()> {
    let [output] = positional(args)[..] else {
        bail!("shapes needs an output path\n{USAGE}");
    };
    let options = parse_write_options(args);
    let model = shapes::demo_model(parse_frames_arg(args))?;

    codec::write_model(create(output)?, &model, &options)
        .with_context(|| format!("Failed to write {}", output))?;
    log::info!(
        "Wrote {} meshes and {} materials to {}",
        model.meshes.len(),
        model.materials.len(),
        output
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!("missing command\n{USAGE}");
    };

    match command.as_str() {
        "convert" => convert(rest),
        "info" => info(rest),
        "shapes" => shapes(rest),
        other => bail!("unknown command '{}'\n{USAGE}", other),
    }
}
