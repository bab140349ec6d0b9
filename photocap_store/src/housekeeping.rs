//! Best-effort housekeeping: capture temp pruning and disk usage
//!
//! Pruning never fails. Every per-file problem is logged and skipped so a
//! cleanup pass can not break the operation that triggered it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use photocap_auth::remove_best_effort;

use crate::error::StoreResult;

/// (prefix, suffix) of temp files left behind by capture and recording
pub const CAPTURE_TEMP_PATTERNS: &[(&str, &str)] = &[
    ("capture_", ".png"),
    ("capture_", ".jpg"),
    ("rec_", ".mp4"),
];

/// Files and bytes under a directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUsage {
    pub files: u64,
    pub bytes: u64,
}

fn is_capture_temp(name: &str) -> bool {
    CAPTURE_TEMP_PATTERNS
        .iter()
        .any(|(prefix, suffix)| name.starts_with(prefix) && name.ends_with(suffix))
}

/// Keep the newest `keep` capture temp files in `dir`, remove the rest.
/// Returns how many were removed.
pub fn prune_capture_temp_files(dir: &Path, keep: usize) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Temp cleanup skipped for {}: {}", dir.display(), e);
            return 0;
        }
    };

    let mut files: Vec<(SystemTime, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .map(is_capture_temp)
                .unwrap_or(false)
        })
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, entry.path()))
        })
        .collect();

    // newest first
    files.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = 0;
    for (_, path) in files.iter().skip(keep) {
        if remove_best_effort(path) {
            log::info!("Cleaned: {}", path.display());
            removed += 1;
        }
    }
    removed
}

/// Total size of regular files under `dir`; zero if it does not exist
pub fn directory_usage(dir: &Path) -> StoreResult<StorageUsage> {
    let mut usage = StorageUsage::default();
    if !dir.exists() {
        return Ok(usage);
    }

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            usage.files += 1;
            usage.bytes += entry.metadata().map_err(std::io::Error::from)?.len();
        }
    }

    Ok(usage)
}
