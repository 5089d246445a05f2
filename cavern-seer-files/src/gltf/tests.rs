use std::fs;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::ParserError;
use crate::gltf::reader::GltfReader;
use crate::gltf::types::{GLB_CHUNK_BIN, GLB_CHUNK_JSON, GLB_MAGIC};

fn build_glb(json: &str, bin: Option<&[u8]>) -> Result<Vec<u8>, anyhow::Error> {
    let mut json_bytes = json.as_bytes().to_vec();
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }

    let mut body = Vec::new();
    body.write_u32::<LittleEndian>(json_bytes.len() as u32)?;
    body.write_u32::<LittleEndian>(GLB_CHUNK_JSON)?;
    body.extend_from_slice(&json_bytes);
    if let Some(bin) = bin {
        body.write_u32::<LittleEndian>(bin.len() as u32)?;
        body.write_u32::<LittleEndian>(GLB_CHUNK_BIN)?;
        body.extend_from_slice(bin);
    }

    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(GLB_MAGIC)?;
    out.write_u32::<LittleEndian>(2)?;
    out.write_u32::<LittleEndian>(12 + body.len() as u32)?;
    out.extend_from_slice(&body);
    Ok(out)
}

#[test]
fn parse_json_gltf() -> Result<(), anyhow::Error> {
    let test_data = std::env::current_dir()?.join("test-data");
    let data = fs::read(test_data.join("triangle.gltf"))?;
    let asset = GltfReader::parse_asset(&data)?;

    assert!(!asset.is_binary());
    assert_eq!(asset.document.asset.generator.as_deref(), Some("hand written"));
    // data URIs are embedded, not references
    assert_eq!(asset.external_uris(), vec!["triangle.bin", "stone.png"]);

    let bounds = asset.position_bounds().expect("POSITION accessor has bounds");
    assert_eq!(bounds.min.z, -1.0);
    assert_eq!(bounds.max.y, 2.0);
    Ok(())
}

#[test]
fn parse_binary_gltf() -> Result<(), anyhow::Error> {
    let json = r#"{"asset":{"version":"2.0"},"buffers":[{"byteLength":4}]}"#;
    let glb = build_glb(json, Some(&[1, 2, 3, 4]))?;
    let asset = GltfReader::parse_asset(&glb)?;

    assert!(asset.is_binary());
    assert_eq!(asset.binary_chunk_length, Some(4));
    assert!(asset.external_uris().is_empty());
    assert!(asset.position_bounds().is_none());
    Ok(())
}

#[test]
fn reject_gltf_1() {
    let result = GltfReader::parse_asset(br#"{"asset":{"version":"1.0"}}"#);
    assert!(matches!(result, Err(ParserError::FormatError { .. })));
}

#[test]
fn reject_unknown_glb_version() -> Result<(), anyhow::Error> {
    let mut glb = build_glb(r#"{"asset":{"version":"2.0"}}"#, None)?;
    glb[4] = 1;
    assert!(matches!(GltfReader::parse_asset(&glb), Err(ParserError::FormatError { .. })));
    Ok(())
}

#[test]
fn glb_without_bin_chunk() -> Result<(), anyhow::Error> {
    let glb = build_glb(r#"{"asset":{"version":"2.0"}}"#, None)?;
    let asset = GltfReader::parse_asset(&glb)?;

    assert!(asset.is_binary());
    assert_eq!(asset.binary_chunk_length, None);
    Ok(())
}

#[test]
fn reject_truncated_bin_chunk() -> Result<(), anyhow::Error> {
    let mut glb = build_glb(r#"{"asset":{"version":"2.0"}}"#, Some(&[1, 2, 3]))?;
    // announce 1000 bytes, but only 3 follow
    let bin_header = glb.len() - 3 - 8;
    glb[bin_header..bin_header + 4].copy_from_slice(&1000u32.to_le_bytes());

    assert!(matches!(GltfReader::parse_asset(&glb), Err(ParserError::FormatError { .. })));
    // the document alone is still readable
    assert!(GltfReader::parse_document_only(&glb).is_ok());
    Ok(())
}

#[test]
fn reject_truncated_chunk_header() -> Result<(), anyhow::Error> {
    let mut glb = build_glb(r#"{"asset":{"version":"2.0"}}"#, None)?;
    glb.extend_from_slice(&[0, 1]);
    assert!(matches!(GltfReader::parse_asset(&glb), Err(ParserError::FormatError { .. })));
    Ok(())
}
