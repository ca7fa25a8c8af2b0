use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub requested_name: String,
    pub absolute_path: PathBuf,
    pub exists: bool,
    pub is_directory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    AlreadyExists,
}

/// Decides whether `requested_name` may be scaffolded under `cwd`.
///
/// Only an existing directory is rejected. A plain file at the path passes and
/// the later folder creation reports the clash. Nothing is created here.
pub fn validate(requested_name: &str, cwd: &Path) -> Result<TargetSpec, (TargetSpec, Rejection)> {
    let absolute_path = cwd.join(requested_name);
    let (exists, is_directory) = match fs::metadata(&absolute_path) {
        Ok(meta) => (true, meta.is_dir()),
        Err(err) if err.kind() == ErrorKind::NotFound => (false, false),
        Err(err) => {
            debug!(path = ?absolute_path, error = ?err, "stat failed, treating target as creatable");
            (false, false)
        }
    };

    let spec = TargetSpec {
        requested_name: requested_name.to_string(),
        absolute_path,
        exists,
        is_directory,
    };

    if spec.is_directory {
        return Err((spec, Rejection::AlreadyExists));
    }
    Ok(spec)
}
