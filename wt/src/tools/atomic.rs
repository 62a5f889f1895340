//! All-or-nothing file replacement

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Mode for files that did not exist before the write
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Replace `path` with `contents` via a sibling temp file and a rename
///
/// Readers see either the old or the new content, never a partial write.
/// Permissions of an existing target are carried over to the new file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    debug!(?path, len = contents.len(), "write_atomic: called");
    let original_perms = fs::metadata(path).ok().map(|m| m.permissions());

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(contents)?;
    temp_file.as_file().sync_all()?;

    // NamedTempFile is created 0o600
    match original_perms {
        Some(perms) => temp_file.as_file().set_permissions(perms)?,
        None => set_new_file_mode(&temp_file)?,
    }

    temp_file.persist(path).map_err(|e| {
        debug!(error = %e.error, "write_atomic: persist failed");
        e.error
    })?;
    Ok(())
}

#[cfg(unix)]
fn set_new_file_mode(temp_file: &NamedTempFile) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    temp_file
        .as_file()
        .set_permissions(fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn set_new_file_mode(_temp_file: &NamedTempFile) -> io::Result<()> {
    Ok(())
}
