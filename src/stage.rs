//! Staging-directory filesystem helpers
//!
//! Build outputs are ephemeral: every build recreates its output directory
//! from scratch so no stale file from a previous run survives (the external
//! compiler is not guaranteed to overwrite everything it once generated).
//! All errors here map to `StageFailure` with the offending path.

use std::path::Path;

use crate::error::{SkiffError, SkiffResult};

fn stage_err(path: &Path, source: std::io::Error) -> SkiffError {
    SkiffError::StageFailure {
        path: path.to_path_buf(),
        source,
    }
}

/// Delete `dir` recursively if it exists, then recreate it empty.
pub fn clean_dir(dir: &Path) -> SkiffResult<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| stage_err(dir, e))?;
    }
    std::fs::create_dir_all(dir).map_err(|e| stage_err(dir, e))
}

/// Copy the whole tree under `src` into `dst`, preserving structure.
///
/// `dst` is created if missing. Existing files in `dst` are overwritten;
/// callers that need a pristine destination run `clean_dir` first.
pub fn copy_tree(src: &Path, dst: &Path) -> SkiffResult<()> {
    std::fs::create_dir_all(dst).map_err(|e| stage_err(dst, e))?;
    for entry in std::fs::read_dir(src).map_err(|e| stage_err(src, e))? {
        let entry = entry.map_err(|e| stage_err(src, e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| stage_err(&from, e))?;
        if file_type.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            std::fs::copy(&from, &to).map_err(|e| stage_err(&from, e))?;
        }
    }
    Ok(())
}

/// Remove a directory tree if it exists (used by `skiff clean`).
pub fn remove_tree(dir: &Path) -> SkiffResult<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| stage_err(dir, e))?;
    }
    Ok(())
}
