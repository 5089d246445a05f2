use std::path::PathBuf;

use clap::{Parser, Subcommand, value_parser};

/// Knobs of the loader itself, independent of how it is driven.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    /// Fall back to comparing names without case when a file references a sibling, as archives
    /// created on case-insensitive file systems frequently disagree with the names inside models.
    pub case_insensitive_references: bool,
    /// Skip folders like `__MACOSX/` that archiving tools add next to the actual content.
    pub skip_system_entries: bool,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            case_insensitive_references: true,
            skip_system_entries: true,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cavern-seer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Loads, inspects and repacks cave scan model archives")]
pub struct CliArgs {
    #[arg(
        long,
        env = "CAVERN_SEER_CASE_INSENSITIVE_REFERENCES",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub case_insensitive_references: bool,

    #[arg(long, env = "CAVERN_SEER_KEEP_SYSTEM_ENTRIES")]
    pub keep_system_entries: bool,

    #[command(subcommand)]
    pub operation_mode: OperationMode,
}

impl CliArgs {
    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            case_insensitive_references: self.case_insensitive_references,
            skip_system_entries: !self.keep_system_entries,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum OperationMode {
    /// Prints the model tree, the failures and the bounds of an upload.
    Inspect {
        #[arg(value_parser = value_parser!(PathBuf))]
        upload: PathBuf,
        /// Files next to a single-file upload that it may reference.
        #[arg(long = "sibling")]
        siblings: Vec<PathBuf>,
        /// Overrides the manifest stored inside of the archive.
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Prints the manifest that describes the loaded tree.
    Manifest {
        upload: PathBuf,
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Loads an upload and exports it again, with a freshly generated manifest.
    Repack {
        upload: PathBuf,
        output: PathBuf,
        #[arg(long = "sibling")]
        siblings: Vec<PathBuf>,
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_loader_defaults() {
        let args = CliArgs::parse_from(["cavern-seer", "inspect", "cave.zip"]);
        assert_eq!(args.loader_settings(), LoaderSettings::default());
    }

    #[test]
    fn repack_takes_siblings() {
        let args = CliArgs::parse_from([
            "cavern-seer",
            "--case-insensitive-references",
            "false",
            "repack",
            "scan.obj",
            "out.zip",
            "--sibling",
            "scan.mtl",
        ]);
        assert!(!args.loader_settings().case_insensitive_references);
        let OperationMode::Repack { siblings, .. } = args.operation_mode else {
            panic!("expected repack");
        };
        assert_eq!(siblings, vec![PathBuf::from("scan.mtl")]);
    }
}
