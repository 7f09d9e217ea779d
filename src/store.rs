use serde::{de::DeserializeOwned, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// A directory of JSON documents addressed by key.
///
/// Backs the credential store and the recent-search list. Reads are lenient
/// (missing or corrupt entries read as `None`), writes report errors.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// ~/.config/hubfeed/ (Linux) or ~/Library/Application Support/hubfeed/ (macOS)
    pub fn open_default() -> Result<Self> {
        let base = dirs::config_dir().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no config directory for this platform",
            )
        })?;
        Self::open(base.join("hubfeed"))
    }

    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }

    /// Read a stored value. Returns None if missing or corrupt.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let data = std::fs::read_to_string(self.path(key)).ok()?;
        match serde_json::from_str(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring corrupt store entry");
                None
            }
        }
    }

    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path(key);
        let data = serde_json::to_string_pretty(value)?;
        let mut file = open_owner_only(&path)?;
        file.write_all(data.as_bytes())?;
        Ok(())
    }

    /// Delete an entry. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        match std::fs::remove_file(self.path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Entries may hold credentials. New files are created owner-only, and an
/// older file with wider permissions is narrowed before it is rewritten.
#[cfg(unix)]
fn open_owner_only(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_owner_only(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Keep keys to a single safe path segment
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '.' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_key_replaces_separators() {
        assert_eq!(sanitize_key("a/b\\c:d.e"), "a_b_c_d_e");
        assert_eq!(sanitize_key("recent_searches"), "recent_searches");
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        store.write("numbers", &vec![1, 2, 3]).unwrap();
        assert_eq!(store.read::<Vec<u32>>("numbers"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn missing_and_corrupt_entries_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        assert_eq!(store.read::<Vec<u32>>("absent"), None);

        std::fs::write(dir.path().join("broken.json"), "{oops").unwrap();
        assert_eq!(store.read::<Vec<u32>>("broken"), None);
    }

    #[test]
    fn remove_reports_whether_entry_existed() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        store.write("k", &"v").unwrap();
        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
        assert_eq!(store.read::<String>("k"), None);
    }

    #[cfg(unix)]
    #[test]
    fn entries_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        store.write("secret", &"hunter2").unwrap();
        let mode = std::fs::metadata(dir.path().join("secret.json"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn rewrite_narrows_a_world_readable_entry() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = JsonStore::open(dir.path()).unwrap();
        store.write("credentials", &"octocat").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.read::<String>("credentials").as_deref(), Some("octocat"));
    }
}
