use crate::error::BluemoonError;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Advisory exclusive lock held next to a store file; released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

pub fn lock_path_for(store: &Path) -> PathBuf {
    let name = store
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("bluemoon.json");
    store.with_file_name(format!("{name}.lock"))
}

impl StoreLock {
    pub fn acquire(store: &Path) -> Result<Self> {
        let path = lock_path_for(store);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            return Err(BluemoonError::StoreLocked(path.display().to_string()).into());
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
