use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::{bail, Context, Result};

static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Replaces `path` with `content` via a synced sibling file and a rename.
///
/// Concurrent writers in one process never share a staging file; a failed
/// rename removes the staging file instead of leaving it next to the target.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    let Some(file_name) = path.file_name() else {
        bail!("state path '{}' has no file name", path.display());
    };
    if path.is_dir() {
        bail!("destination path '{}' is a directory", path.display());
    }
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&directory)
        .with_context(|| format!("failed to create state directory {}", directory.display()))?;

    let staging = directory.join(format!(
        ".{}.{}.{}.partial",
        file_name.to_string_lossy(),
        std::process::id(),
        STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed)
    ));
    let mut file = File::create(&staging)
        .with_context(|| format!("failed to create staging file {}", staging.display()))?;
    file.write_all(content.as_bytes())
        .and_then(|()| file.sync_all())
        .with_context(|| format!("failed to flush staging file {}", staging.display()))?;
    drop(file);

    if let Err(error) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(error).with_context(|| {
            format!("failed to move staged state into {}", path.display())
        });
    }
    Ok(())
}
