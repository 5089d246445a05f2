use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use cavern_seer::asset_graph::loader::{LoadOutcome, ModelLoader, Upload};
use cavern_seer::manifest::Manifest;
use cavern_seer::model::export::export;
use cavern_seer::model::tree::{ModelTree, NodeId};
use cavern_seer::settings::{CliArgs, OperationMode};
use clap::Parser;
use itertools::Itertools;
use log::{error, info, warn};

fn main() {
    env_logger::init();

    let args = CliArgs::parse();
    log::trace!("Starting with args: {:?}", args);

    if let Err(err) = run(&args) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(args: &CliArgs) -> Result<(), anyhow::Error> {
    let loader = ModelLoader::new(args.loader_settings());

    match &args.operation_mode {
        OperationMode::Inspect {
            upload,
            siblings,
            manifest,
        } => {
            let tree = load_tree(&loader, upload, siblings, manifest.as_deref())?;
            print_tree(&tree, tree.root(), 0);
            if let Some(bounds) = tree.bounding_box(tree.root()) {
                println!("bounds: {} .. {} (size {})", bounds.min, bounds.max, bounds.size());
            }
        }
        OperationMode::Manifest { upload, manifest } => {
            let tree = load_tree(&loader, upload, &[], manifest.as_deref())?;
            let json = Manifest::build_from_tree(&tree).to_json()?;
            println!("{}", String::from_utf8_lossy(&json));
        }
        OperationMode::Repack {
            upload,
            output,
            siblings,
            manifest,
        } => {
            let tree = load_tree(&loader, upload, siblings, manifest.as_deref())?;
            let payload = export(&tree, loader.archive_service(), &mut |progress| {
                info!("Written {}/{} entries", progress.written, progress.total);
            })?;
            std::fs::write(output, &payload).with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Repacked {} into {}", upload.display(), output.display());
        }
    }

    Ok(())
}

fn read_upload(path: &Path) -> Result<Upload, anyhow::Error> {
    let payload = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .with_context(|| format!("{} is no file", path.display()))?;
    Ok(Upload::new(name, Arc::from(payload)))
}

fn load_tree(
    loader: &ModelLoader,
    upload: &Path,
    siblings: &[PathBuf],
    manifest: Option<&Path>,
) -> Result<ModelTree, anyhow::Error> {
    let upload = read_upload(upload)?;
    let siblings = siblings.iter().map(|path| read_upload(path)).collect::<Result<Vec<_>, _>>()?;
    let manifest = match manifest {
        Some(path) => {
            let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            Some(Manifest::parse(&data)?)
        }
        None => None,
    };

    let LoadOutcome { result, errors } = pollster::block_on(loader.load(upload, manifest, siblings))?;
    for failure in &errors {
        warn!("{}", failure);
    }

    let model = result.context("The upload only contains metadata")?;
    Ok(ModelTree::new(model))
}

fn print_tree(tree: &ModelTree, id: NodeId, depth: usize) {
    let Some(node) = tree.node(id) else {
        return;
    };

    let kind = node
        .content
        .kind()
        .map(|kind| kind.to_string())
        .unwrap_or_else(|| "group".to_string());
    let annotations = node.annotations.iter().map(|annotation| annotation.identifier()).join(", ");

    println!(
        "{}{} [{}] @ {}{}",
        "  ".repeat(depth),
        node.identifier,
        kind,
        node.position,
        if annotations.is_empty() { String::new() } else { format!(" ({annotations})") }
    );

    for &child in tree.children(id) {
        print_tree(tree, child, depth + 1);
    }
}
