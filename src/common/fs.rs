use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Error unless a regular file exists at `path`.
pub(crate) fn require_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {}", path.display());
    }
    if !path.is_file() {
        anyhow::bail!("Path exists but is not a file: {}", path.display());
    }
    Ok(())
}

/// Resolve `path` against `base` unless it is already absolute.
pub(crate) fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { base.join(path) }
}

/// Lower-cased file extension, or an empty string.
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}
