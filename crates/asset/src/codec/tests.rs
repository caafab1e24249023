use std::io::Cursor;

use super::*;
use crate::buffer::ElementWidth;
use crate::builder::MeshBuilder;

fn single_point() -> Mesh {
    let mut builder = MeshBuilder::new();
    let p = builder.add_vertex([1.0, 2.0, 3.0]);
    builder.add_element(1, &[p]).unwrap();
    builder.build("point")
}

fn encode_mesh(mesh: &Mesh, options: &WriteOptions) -> Vec<u8> {
    let mut out = Vec::new();
    write_mesh(&mut out, mesh, options).unwrap();
    out
}

#[test]
fn point_mesh_layout_little_endian() {
    let bytes = encode_mesh(&single_point(), &WriteOptions::default());

    let mut expected = b"TDB".to_vec();
    expected.extend([FORMAT_VERSION, 0]);
    expected.extend(1u16.to_le_bytes());
    expected.extend([0xFF, 0, 1]); // no material, no attributes, points
    expected.extend(1i32.to_le_bytes());
    for v in [1.0f32, 2.0, 3.0] {
        expected.extend(v.to_le_bytes());
    }
    expected.extend(1i32.to_le_bytes());
    expected.push(0); // one-byte index
    expected.push(0); // empty material table

    assert_eq!(bytes, expected);
}

#[test]
fn big_endian_flag_orders_payload() {
    let bytes = encode_mesh(&single_point(), &WriteOptions::big_endian());
    assert_eq!(&bytes[..5], &[b'T', b'D', b'B', FORMAT_VERSION, 1]);
    assert_eq!(&bytes[5..7], &[0, 1]);
    assert_eq!(&bytes[10..14], &1i32.to_be_bytes());
    assert_eq!(&bytes[14..18], &1.0f32.to_be_bytes());

    let decoded = read_mesh(Cursor::new(bytes), "point", SUPPORTED_VERSIONS).unwrap();
    assert_eq!(decoded, single_point());
}

#[test]
fn index_width_follows_vertex_count() {
    let mut builder = MeshBuilder::new();
    let handles: Vec<_> = (0..258).map(|i| builder.add_vertex([i as f32, 0.0, 0.0])).collect();
    builder.add_element(2, &handles).unwrap();
    let mesh = builder.build("lines");
    assert_eq!(mesh.groups()[0].vertex_count(), 258);

    let bytes = encode_mesh(&mesh, &WriteOptions::default());
    let floats = 258 * 3 * 4;
    // header, group count, material/flags/mode, two counts, positions, 2-byte indices, table
    assert_eq!(bytes.len(), 5 + 2 + 3 + 8 + floats + 258 * 2 + 1);

    let decoded = read_mesh(Cursor::new(bytes), "lines", SUPPORTED_VERSIONS).unwrap();
    assert_eq!(decoded.groups()[0].indices().width(), ElementWidth::Short);
    assert_eq!(decoded, mesh);
}

#[test]
fn header_rejections() {
    let bytes = encode_mesh(&single_point(), &WriteOptions::default());

    let err = read_model(Cursor::new(bytes.clone()), SUPPORTED_VERSIONS).unwrap_err();
    assert!(matches!(err, CodecError::InvalidMagic { found, .. } if &found == b"TDB"));
    assert!(err.is_format_rejection());

    let err = read_mesh(Cursor::new(bytes.clone()), "p", 2..=3).unwrap_err();
    assert!(matches!(
        err,
        CodecError::UnsupportedVersion {
            version: 1,
            min: 2,
            max: 3
        }
    ));

    let mut flagged = bytes;
    flagged[4] = 0x80;
    let err = read_mesh(Cursor::new(flagged), "p", SUPPORTED_VERSIONS).unwrap_err();
    assert!(matches!(err, CodecError::Format { .. }));
    assert!(!err.is_format_rejection());
}

#[test]
fn malformed_payloads() {
    let bytes = encode_mesh(&single_point(), &WriteOptions::default());

    let mut mode = bytes.clone();
    mode[9] = 4;
    assert!(matches!(
        read_mesh(Cursor::new(mode), "p", SUPPORTED_VERSIONS),
        Err(CodecError::UnknownPrimitiveMode(4))
    ));

    let mut negative = bytes.clone();
    negative[10..14].copy_from_slice(&(-1i32).to_le_bytes());
    assert!(matches!(
        read_mesh(Cursor::new(negative), "p", SUPPORTED_VERSIONS),
        Err(CodecError::Format { .. })
    ));

    // material index 0 with an empty table
    let mut dangling = bytes.clone();
    dangling[7] = 0;
    assert!(matches!(
        read_mesh(Cursor::new(dangling), "p", SUPPORTED_VERSIONS),
        Err(CodecError::Format { .. })
    ));

    let truncated = &bytes[..20];
    match read_mesh(Cursor::new(truncated), "p", SUPPORTED_VERSIONS) {
        Err(CodecError::Io { offset, source, .. }) => {
            assert_eq!(offset, 18);
            assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof);
        }
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn material_round_trip_and_limits() {
    let material = Material::default()
        .with_diffuse([0.8, 0.8, 0.2, 1.0])
        .with_specular([0.5, 0.5, 0.5, 1.0], 12.5)
        .with_texture("bricks");

    let mut bytes = Vec::new();
    write_material(&mut bytes, &material, &WriteOptions::big_endian()).unwrap();
    assert_eq!(bytes.len(), 5 + 16 + 4 + 1 + "bricks".len());
    assert_eq!(&bytes[5 + 4..5 + 8], &[204, 204, 51, 255]);

    let decoded = read_material(Cursor::new(bytes), SUPPORTED_VERSIONS).unwrap();
    assert_eq!(decoded.shininess, 12.5);
    assert_eq!(decoded.diffuse_texture.as_deref(), Some("bricks"));
    for (a, b) in decoded.diffuse.iter().zip(material.diffuse) {
        assert!((a - b).abs() <= 1.0 / 255.0);
    }

    let long = Material::default().with_texture("t".repeat(256));
    let err = write_material(Vec::new(), &long, &WriteOptions::default()).unwrap_err();
    assert!(matches!(err, CodecError::TooLarge { len: 256, max: 255, .. }));
}

#[test]
fn model_round_trip_uses_wide_tables() {
    let mut builder = MeshBuilder::new();
    let a = builder.add_vertex([0.0, 0.0, 0.0]);
    let b = builder.add_vertex([1.0, 0.0, 0.0]);
    let c = builder.add_vertex([0.0, 1.0, 0.0]);
    builder.use_material("red");
    builder.add_element(3, &[a, b, c]).unwrap();
    builder.use_no_material();
    builder.add_element(2, &[a, b]).unwrap();
    let tri = builder.build("tri");

    let model = Model {
        meshes: vec![tri, single_point()],
        materials: vec![NamedMaterial::new(
            "red",
            Material::default().with_diffuse([1.0, 0.0, 0.0, 1.0]),
        )],
    };

    let mut bytes = Vec::new();
    write_model(&mut bytes, &model, &WriteOptions::default()).unwrap();
    assert_eq!(&bytes[..3], b"TDM");

    let decoded = read_model(Cursor::new(bytes), SUPPORTED_VERSIONS).unwrap();
    assert_eq!(decoded.meshes, model.meshes);
    assert_eq!(decoded.mesh("point"), Some(&single_point()));
    assert_eq!(decoded.material("red").map(|m| m.diffuse), Some([1.0, 0.0, 0.0, 1.0]));

    let tri = decoded.mesh("tri").unwrap();
    assert_eq!(tri.groups()[1].material(), None);
    assert_eq!(tri.material_name(&tri.groups()[0]), Some("red"));
}
