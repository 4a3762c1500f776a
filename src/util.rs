//! A utility module for common operations.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::{env::Env, error::Result};

/// Create or truncate a file and open it for writing.
pub fn create_file(env: &impl Env, path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    let abs_path = env.in_cwd(&path);
    File::create(abs_path).map_err(|err| {
        crate::error::Error::io(format!("cannot create '{}': {err}", path.display()))
    })
}

/// Rename a file.
pub fn rename_path(env: &impl Env, old: impl AsRef<Path>, new: impl AsRef<Path>) -> Result<()> {
    let (old, new) = (old.as_ref(), new.as_ref());
    let abs_old = env.in_cwd(&old);
    let abs_new = env.in_cwd(&new);
    std::fs::rename(abs_old, abs_new).map_err(|err| {
        crate::error::Error::io(format!(
            "could not move '{}' to '{}': {err}",
            old.display(),
            new.display()
        ))
    })
}

/// Remove a file, ignoring failures.
pub fn remove_quietly(env: &impl Env, path: impl AsRef<Path>) {
    let _ = std::fs::remove_file(env.in_cwd(&path));
}

/// The path with `suffix` appended to the file name.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().unwrap_or_default().to_owned();
    name.push(suffix);
    path.with_file_name(name)
}

/// The default output path for a zone file: `<dir>/<stem>-signed<.ext>`.
pub fn signed_path(input: &Path) -> PathBuf {
    let mut name: OsString = input.file_stem().unwrap_or_default().to_owned();
    name.push("-signed");
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths() {
        assert_eq!(
            signed_path(Path::new("zones/example.com.zone")),
            Path::new("zones/example.com-signed.zone")
        );
        assert_eq!(signed_path(Path::new("db")), Path::new("db-signed"));
        assert_eq!(
            with_suffix(Path::new("out/example.zone"), ".part"),
            Path::new("out/example.zone.part")
        );
    }
}
