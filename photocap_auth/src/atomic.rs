//! Atomic JSON persistence
//!
//! Documents are serialized into a uniquely named temp file inside the
//! destination directory and then renamed over the destination. The rename
//! stays on one volume, so readers see either the old or the new document,
//! never a truncated one. There is no cross-process locking: concurrent
//! writers race at the rename and the last one wins.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

/// Prefix of in-flight temp files
pub const TEMP_PREFIX: &str = ".tmp_";

/// A fully written temp file waiting to replace its destination.
///
/// Dropping it without [`StagedWrite::commit`] removes the temp file.
#[derive(Debug)]
pub struct StagedWrite {
    temp: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl StagedWrite {
    /// Temp file holding the new content
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    pub fn dest_path(&self) -> &Path {
        &self.dest
    }

    /// Rename the temp file over the destination
    pub fn commit(mut self) -> io::Result<()> {
        fs::rename(&self.temp, &self.dest)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            remove_best_effort(&self.temp);
        }
    }
}

/// Serialize `doc` into a temp file next to `dest` without touching `dest`
pub fn stage_json<T: Serialize + ?Sized>(dest: &Path, doc: &T) -> io::Result<StagedWrite> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let bytes = serde_json::to_vec_pretty(doc)?;
    let temp = dir.join(format!("{}{}", TEMP_PREFIX, Uuid::new_v4().simple()));

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp)?;

    // From here on the guard owns the temp file and cleans it up on error.
    let staged = StagedWrite {
        temp,
        dest: dest.to_path_buf(),
        committed: false,
    };

    file.write_all(&bytes)?;
    file.write_all(b"\n")?;
    file.sync_all()?;

    Ok(staged)
}

/// Write `doc` to `dest` atomically
pub fn write_json_atomic<T: Serialize + ?Sized>(dest: &Path, doc: &T) -> io::Result<()> {
    stage_json(dest, doc)?.commit()
}

/// Remove a file, logging and discarding any failure. A missing file is fine.
pub fn remove_best_effort(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            log::warn!("Could not remove {}: {}", path.display(), e);
            false
        }
    }
}
