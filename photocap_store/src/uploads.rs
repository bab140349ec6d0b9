//! Upload naming and records
//!
//! Uploads are named `<mobile>_<YYYYMMDD>_<N><ext>`. `N` is one more than
//! the largest sequence already on disk for that mobile and day, so a
//! deleted upload leaves a gap instead of being reused.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use photocap_auth::{remove_best_effort, Mobile};

use crate::media::MediaType;

/// An upload as seen on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Full path of the media file
    pub path: PathBuf,
    /// Base name only
    pub filename: String,
    pub media_type: MediaType,
    /// File modification time
    pub created_at: DateTime<Utc>,
}

impl UploadRecord {
    /// The file may have been removed since the listing
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// `<mobile>_` - every upload of a user starts with this
pub fn owner_prefix(mobile: &Mobile) -> String {
    format!("{}_", mobile)
}

/// `<mobile>_<date>_`
pub fn day_prefix(mobile: &Mobile, date_key: &str) -> String {
    format!("{}_{}_", mobile, date_key)
}

pub fn upload_file_name(mobile: &Mobile, date_key: &str, seq: u32, ext: &str) -> String {
    format!("{}{}{}", day_prefix(mobile, date_key), seq, ext)
}

/// Sequence number of `name` if it is an upload of that mobile and day
pub fn parse_sequence(name: &str, prefix: &str) -> Option<u32> {
    let rest = name.strip_prefix(prefix)?;
    let stem = Path::new(rest).file_stem()?.to_str()?;
    stem.parse().ok()
}

/// Next free sequence number for a mobile and day in `dir`
pub fn next_sequence(dir: &Path, mobile: &Mobile, date_key: &str) -> io::Result<u32> {
    let prefix = day_prefix(mobile, date_key);
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(1),
        Err(e) => return Err(e),
    };

    let max = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(|name| parse_sequence(name, &prefix))
        })
        .max();

    Ok(max.map(|n| n.saturating_add(1)).unwrap_or(1))
}

/// Copy `source` to a not-yet-existing `dest`, carrying over the
/// modification time and permissions where the platform allows.
///
/// Fails with `AlreadyExists` instead of overwriting.
pub fn copy_new(source: &Path, dest: &Path) -> io::Result<()> {
    let mut input = File::open(source)?;
    let meta = input.metadata()?;
    let mut output = OpenOptions::new().write(true).create_new(true).open(dest)?;

    if let Err(e) = io::copy(&mut input, &mut output).and_then(|_| output.sync_all()) {
        drop(output);
        remove_best_effort(dest);
        return Err(e);
    }

    if let Ok(modified) = meta.modified() {
        if let Err(e) = output.set_modified(modified) {
            log::debug!("Could not keep mtime on {}: {}", dest.display(), e);
        }
    }
    drop(output);
    if let Err(e) = fs::set_permissions(dest, meta.permissions()) {
        log::debug!("Could not keep permissions on {}: {}", dest.display(), e);
    }

    Ok(())
}

/// Modification time of `path` as UTC
pub fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    let modified: SystemTime = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}
