use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cavern_seer::asset_graph::loader::{ModelLoader, Upload};
use cavern_seer::io::archive::MANIFEST_FILE_NAME;
use cavern_seer::io::archive::zip_service::ZipArchiveService;
use cavern_seer::io::common::loader::Payload;
use cavern_seer::loader::mtl_loader::MtlDecoder;
use cavern_seer::loader::{DecodeError, ModelDecoder, ResolvedReferences};
use cavern_seer::model::NodeFailure;
use cavern_seer::model::annotation::{Annotation, CeilingHeight, MeasureDistance};
use cavern_seer::model::classifier::ModelKind;
use cavern_seer::model::export::export;
use cavern_seer::model::tree::ModelTree;
use cavern_seer::model::types::{LoadedModel, ModelContent};
use glam::Vec3;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const MESH: &[u8] = b"mtllib a.mtl\nv 0 0 0\nv 2 0 0\nv 0 3 0\nusemtl Rock\nf 1 2 3\n";
const LIBRARY: &[u8] = b"newmtl Rock\nKd 0.4 0.35 0.3\n";
const TRACE: &[u8] = b"0,0,0\n0,0,5\n";

fn zip_of(files: &[(&str, &[u8])]) -> Result<Payload, anyhow::Error> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        if name.ends_with('/') {
            writer.add_directory(name.to_string(), SimpleFileOptions::default())?;
        } else {
            writer.start_file(name.to_string(), SimpleFileOptions::default())?;
            writer.write_all(data)?;
        }
    }
    Ok(writer.finish()?.into_inner().into())
}

struct CountingDecoder {
    calls: Arc<AtomicUsize>,
}

impl ModelDecoder for CountingDecoder {
    fn decode(&self, payload: &Payload, references: &ResolvedReferences) -> Result<ModelContent, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        MtlDecoder.decode(payload, references)
    }
}

struct FailingDecoder;

impl ModelDecoder for FailingDecoder {
    fn decode(&self, _payload: &Payload, _references: &ResolvedReferences) -> Result<ModelContent, DecodeError> {
        Err(DecodeError::Invalid("refusing to decode".to_string()))
    }
}

fn content_at<'a>(model: &'a LoadedModel, path: &str) -> &'a ModelContent {
    &model.find(path).unwrap_or_else(|| panic!("{path} is missing")).node.content
}

#[test_log::test(tokio::test)]
async fn material_library_is_decoded_once() -> Result<(), anyhow::Error> {
    let payload = zip_of(&[
        ("a.obj", MESH),
        ("a.mtl", LIBRARY),
        ("copies/", b""),
        ("copies/a.obj", MESH),
        ("copies/a.mtl", LIBRARY),
    ])?;
    let calls = Arc::new(AtomicUsize::new(0));
    let loader = ModelLoader::default().with_decoder(
        ModelKind::MaterialLibrary,
        Arc::new(CountingDecoder { calls: calls.clone() }),
    );

    let outcome = loader.load(Upload::new("cave.zip", payload), None, Vec::new()).await?;
    let model = outcome.result.expect("archives always produce a group");

    // one library per directory
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(outcome.errors.is_empty());
    for path in ["a.obj", "copies/a.obj"] {
        let ModelContent::Obj(mesh) = content_at(&model, path) else {
            panic!("{path} is no mesh");
        };
        assert!(mesh.has_custom_material());
        assert!(mesh.material("Rock").is_some());
    }
    assert!(matches!(content_at(&model, "a.mtl"), ModelContent::MaterialLibrary(_)));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn failed_decodes_become_placeholders() -> Result<(), anyhow::Error> {
    let payload = zip_of(&[("ok.walltrace", TRACE), ("sub/scan.cavernseerscan", b"\x01\x02")])?;
    let loader = ModelLoader::default().with_decoder(ModelKind::Scan, Arc::new(FailingDecoder));

    let outcome = loader.load(Upload::new("cave.zip", payload), None, Vec::new()).await?;
    let model = outcome.result.expect("archives always produce a group");

    assert!(matches!(content_at(&model, "ok.walltrace"), ModelContent::WallTrace(_)));
    let ModelContent::Unknown(placeholder) = content_at(&model, "sub/scan.cavernseerscan") else {
        panic!("expected a placeholder");
    };
    assert_eq!(placeholder.payload.as_ref(), b"\x01\x02");
    assert_eq!(outcome.errors.len(), 1);
    assert!(matches!(&outcome.errors[0], NodeFailure::Decode { path, .. } if path == "sub/scan.cavernseerscan"));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn empty_directories_are_empty_groups() -> Result<(), anyhow::Error> {
    let payload = zip_of(&[("empty/", b""), ("__MACOSX/._a.obj", b"junk")])?;

    let outcome = ModelLoader::default()
        .load(Upload::new("cave.zip", payload), None, Vec::new())
        .await?;
    let model = outcome.result.expect("archives always produce a group");

    assert_eq!(model.children.len(), 1);
    let empty = model.find("empty").expect("the directory record creates a group");
    assert!(empty.node.content.is_group());
    assert!(empty.children.is_empty());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn unknown_annotation_types_only_fail_themselves() -> Result<(), anyhow::Error> {
    let manifest = br#"{
        "metadata": {
            "sub/trace.walltrace": {
                "position": {"x": 0, "y": 2, "z": 0},
                "annotations": [
                    {"type": "graffiti", "identifier": "g"},
                    {"type": "ceiling-height", "identifier": "h", "anchorPoint": {"x": 0, "y": 0, "z": 0}, "distance": 1.5}
                ]
            }
        }
    }"#;
    let payload = zip_of(&[(MANIFEST_FILE_NAME, manifest), ("sub/trace.walltrace", TRACE)])?;

    let outcome = ModelLoader::default()
        .load(Upload::new("cave.zip", payload), None, Vec::new())
        .await?;
    let model = outcome.result.expect("archives always produce a group");

    let trace = model.find("sub/trace.walltrace").expect("trace exists");
    assert_eq!(trace.node.position, Vec3::new(0.0, 2.0, 0.0));
    assert_eq!(trace.node.annotations.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(matches!(&outcome.errors[0], NodeFailure::Annotation { index: 0, .. }));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn export_then_load_reproduces_the_tree() -> Result<(), anyhow::Error> {
    let payload = zip_of(&[
        ("a.obj", MESH),
        ("a.mtl", LIBRARY),
        ("side/trace.walltrace", TRACE),
        ("side/notes.txt", b"bring a rope"),
    ])?;
    let loader = ModelLoader::default();

    let outcome = loader.load(Upload::new("cave.zip", payload), None, Vec::new()).await?;
    let mut tree = ModelTree::new(outcome.result.expect("archives always produce a group"));

    let side = tree.find_by_path("side").expect("side exists");
    let mesh = tree.find_by_path("a.obj").expect("mesh exists");
    tree.set_position(side, Vec3::new(4.0, -1.0, 0.5));
    tree.add_annotation(
        mesh,
        Annotation::CeilingHeight(CeilingHeight {
            identifier: "entrance".to_string(),
            anchor_point: Vec3::new(0.5, 0.0, 0.5),
            distance: 2.25,
        }),
    )?;
    tree.add_annotation(
        side,
        Annotation::MeasureDistance(MeasureDistance {
            identifier: "crawl".to_string(),
            anchor_point: Vec3::ZERO,
            additional_points: vec![Vec3::new(0.0, 0.0, 5.0)],
        }),
    )?;

    let exported = export(&tree, &ZipArchiveService::default(), &mut |_| {})?;
    let outcome = loader.load(Upload::new("cave.zip", exported), None, Vec::new()).await?;
    assert!(outcome.errors.is_empty());
    let reloaded = ModelTree::new(outcome.result.expect("archives always produce a group"));

    let original_paths: Vec<String> = tree.depth_first(tree.root()).into_iter().filter_map(|id| tree.path_of(id)).collect();
    let reloaded_paths: Vec<String> = reloaded
        .depth_first(reloaded.root())
        .into_iter()
        .filter_map(|id| reloaded.path_of(id))
        .collect();
    assert_eq!(original_paths, reloaded_paths);

    for path in &original_paths {
        let before = tree.node(tree.find_by_path(path).expect("exists")).expect("exists");
        let after = reloaded.node(reloaded.find_by_path(path).expect("exists")).expect("exists");

        assert!(before.position.abs_diff_eq(after.position, 1e-6), "position of {path}");
        assert_eq!(before.annotations, after.annotations, "annotations of {path}");
        assert_eq!(
            before.content.payload().map(|p| p.as_ref()),
            after.content.payload().map(|p| p.as_ref()),
            "bytes of {path}"
        );
    }

    let bounds = reloaded.bounding_box(reloaded.root()).expect("geometry present");
    assert_eq!(bounds.max, Vec3::new(4.0, 3.0, 5.5));
    Ok(())
}
