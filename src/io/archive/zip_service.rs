use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use log::{debug, trace};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::io::archive::{ArchiveEntry, ArchiveError, ArchiveService, ComposeEntry, ComposeProgress};
use crate::io::common::loader::{Payload, PayloadAccessor, RawAssetLoader};

/// Folders that archiving tools of some operating systems add, which never contain models.
const SYSTEM_PREFIXES: [&str; 1] = ["__MACOSX/"];

pub struct ZipArchiveService {
    skip_system_entries: bool,
}

impl ZipArchiveService {
    pub fn new(skip_system_entries: bool) -> Self {
        Self { skip_system_entries }
    }
}

impl Default for ZipArchiveService {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Central directory record of one zip entry.
struct EntryRecord {
    /// Name as stored, needed to look the entry up again.
    stored_name: String,
    /// Normalized: forward slashes, no leading slash, directories end with `/`.
    path: String,
    comment: String,
}

/// Shares the opened archive between all [`PayloadAccessor`]s of one decomposition.
struct ZipLoader {
    archive: Mutex<ZipArchive<Cursor<Payload>>>,
}

impl RawAssetLoader for ZipLoader {
    fn load_raw_owned(&self, key: &str) -> Result<Payload, ArchiveError> {
        let mut archive = self.archive.lock().map_err(|_| ArchiveError::Poisoned)?;
        let mut file = archive.by_name(key).map_err(|err| match err {
            zip::result::ZipError::FileNotFound => ArchiveError::MissingEntry(key.to_string()),
            other => ArchiveError::ZipError(other),
        })?;

        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf)?;
        trace!("Decompressed {} ({} bytes)", key, buf.len());
        Ok(buf.into())
    }
}

impl ZipArchiveService {
    fn is_system_entry(&self, path: &str) -> bool {
        self.skip_system_entries && SYSTEM_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
    }

    /// Builds one directory level. `records` all start with `prefix`.
    fn build_level(prefix: &str, records: &[&EntryRecord], loader: &Arc<dyn RawAssetLoader>) -> Vec<ArchiveEntry> {
        let mut files = Vec::new();
        // (name, comment, records below it), in order of first appearance
        let mut directories: Vec<(&str, String, Vec<&EntryRecord>)> = Vec::new();

        for &record in records {
            let relative = &record.path[prefix.len()..];
            match relative.split_once('/') {
                None => files.push(ArchiveEntry::file(
                    record.path.clone(),
                    relative.to_string(),
                    record.comment.clone(),
                    PayloadAccessor::new(loader.clone(), record.stored_name.clone()),
                )),
                Some((dir_name, rest)) => {
                    let idx = match directories.iter().position(|(name, _, _)| *name == dir_name) {
                        Some(idx) => idx,
                        None => {
                            directories.push((dir_name, String::new(), Vec::new()));
                            directories.len() - 1
                        }
                    };

                    if rest.is_empty() {
                        // explicit directory record, only carries metadata
                        directories[idx].1 = record.comment.clone();
                    } else {
                        directories[idx].2.push(record);
                    }
                }
            }
        }

        let subdirectories = directories.into_iter().map(|(name, comment, records)| {
            let path = format!("{prefix}{name}");
            let children = Self::build_level(&format!("{path}/"), &records, loader);
            ArchiveEntry::directory(path, name.to_string(), comment, children)
        });

        files.extend(subdirectories);
        files
    }
}

impl ArchiveService for ZipArchiveService {
    fn decompose(&self, name: &str, payload: Payload) -> Result<ArchiveEntry, ArchiveError> {
        let mut archive = ZipArchive::new(Cursor::new(payload)).map_err(ArchiveError::InvalidArchive)?;

        let mut records = Vec::with_capacity(archive.len());
        for idx in 0..archive.len() {
            // raw: we only need the metadata, not the decompressed contents
            let file = archive.by_index_raw(idx).map_err(ArchiveError::InvalidArchive)?;
            let stored_name = file.name().to_string();
            let path = stored_name.replace('\\', "/").trim_start_matches('/').to_string();

            if path.is_empty() || self.is_system_entry(&path) {
                trace!("Skipping archive entry {:?}", stored_name);
                continue;
            }

            records.push(EntryRecord {
                stored_name,
                path,
                comment: file.comment().to_string(),
            });
        }

        let comment = String::from_utf8_lossy(archive.comment()).to_string();
        debug!("Decomposing {} with {} entries", name, records.len());

        let loader: Arc<dyn RawAssetLoader> = Arc::new(ZipLoader {
            archive: Mutex::new(archive),
        });
        let record_refs: Vec<&EntryRecord> = records.iter().collect();
        let children = Self::build_level("", &record_refs, &loader);

        Ok(ArchiveEntry::directory(String::new(), name.to_string(), comment, children))
    }

    fn compose(
        &self,
        entries: Vec<ComposeEntry>,
        progress: &mut dyn FnMut(ComposeProgress),
    ) -> Result<Payload, ArchiveError> {
        let total = entries.len();
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for (idx, entry) in entries.into_iter().enumerate() {
            trace!("Writing {} ({} bytes)", entry.path, entry.payload.len());
            writer.start_file(entry.path, options)?;
            writer.write_all(&entry.payload)?;
            progress(ComposeProgress {
                written: idx + 1,
                total,
            });
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner().into())
    }
}
