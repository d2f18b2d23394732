//! Document writer: read a note once, commit the merged text atomically.
//!
//! The commit re-reads the note and compares its SHA-256 with the one taken
//! at read time, then writes a sibling temp file, syncs it and renames it over
//! the note. A crash leaves either the old note or the new one, never a mix.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use daybook_shared::{DaybookError, Result};

/// A note as it was when read.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    path: PathBuf,
    text: String,
    hash: String,
}

impl DocumentSnapshot {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| DaybookError::io(path, e))?;
        let hash = content_hash(&bytes);
        let text = String::from_utf8(bytes).map_err(|e| {
            DaybookError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e.utf8_error()),
            )
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
            hash,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// SHA-256 of the bytes read, lowercase hex.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Replace the note with `new_text`.
    ///
    /// Fails with [`DaybookError::WriteConflict`] if the note changed on disk
    /// since it was read.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn commit(&self, new_text: &str) -> Result<()> {
        let current = fs::read(&self.path).map_err(|e| DaybookError::io(&self.path, e))?;
        if content_hash(&current) != self.hash {
            warn!("note changed since it was read");
            return Err(DaybookError::WriteConflict {
                path: self.path.clone(),
            });
        }

        let temp = temp_path(&self.path)?;
        if let Err(e) = write_replacement(&self.path, &temp, new_text) {
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        sync_parent(&self.path);
        debug!(size = new_text.len(), "committed note");
        Ok(())
    }
}

/// `.<name>.<uuid>.tmp` next to the note, so the rename stays on one filesystem.
fn temp_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DaybookError::validation(format!("not a file path: {}", path.display())))?;
    Ok(path.with_file_name(format!(".{name}.{}.tmp", Uuid::now_v7())))
}

fn write_replacement(target: &Path, temp: &Path, text: &str) -> Result<()> {
    let mut file = File::create(temp).map_err(|e| DaybookError::io(temp, e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| DaybookError::io(temp, e))?;
    file.sync_all().map_err(|e| DaybookError::io(temp, e))?;
    drop(file);

    let permissions = fs::metadata(target)
        .map_err(|e| DaybookError::io(target, e))?
        .permissions();
    fs::set_permissions(temp, permissions).map_err(|e| DaybookError::io(temp, e))?;

    fs::rename(temp, target).map_err(|e| DaybookError::io(target, e))
}

/// Persist the rename itself. Best effort: not every platform can open a
/// directory for syncing.
fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("daybook-writer-test-{}", Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn commit_replaces_content() {
        let dir = temp_dir();
        let path = dir.join("2025-04-26.md");
        fs::write(&path, "# Notes\n").unwrap();

        let snapshot = DocumentSnapshot::read(&path).unwrap();
        assert_eq!(snapshot.text(), "# Notes\n");
        snapshot.commit("# Notes\n\nmore\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "# Notes\n\nmore\n");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn commit_leaves_no_temp_files() {
        let dir = temp_dir();
        let path = dir.join("2025-04-26.md");
        fs::write(&path, "a\n").unwrap();

        DocumentSnapshot::read(&path).unwrap().commit("b\n").unwrap();

        let names: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["2025-04-26.md".to_string()]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn concurrent_edit_is_a_conflict() {
        let dir = temp_dir();
        let path = dir.join("2025-04-26.md");
        fs::write(&path, "original\n").unwrap();

        let snapshot = DocumentSnapshot::read(&path).unwrap();
        fs::write(&path, "edited by hand\n").unwrap();

        let err = snapshot.commit("merged\n").unwrap_err();
        assert!(matches!(err, DaybookError::WriteConflict { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "edited by hand\n");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn hash_is_sha256_hex() {
        let dir = temp_dir();
        let path = dir.join("2025-04-26.md");
        fs::write(&path, "hello world").unwrap();

        let snapshot = DocumentSnapshot::read(&path).unwrap();
        assert_eq!(
            snapshot.hash(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn commit_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_dir();
        let path = dir.join("2025-04-26.md");
        fs::write(&path, "a\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

        DocumentSnapshot::read(&path).unwrap().commit("b\n").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        let _ = fs::remove_dir_all(&dir);
    }
}
