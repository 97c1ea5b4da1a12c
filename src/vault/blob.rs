//! Opaque key-value blob storage.
//!
//! The vault never interprets the storage medium: it reads and replaces
//! whole string values by key. `FileBlobStore` keeps one file per key and
//! replaces values atomically (temp file + rename) so readers never see
//! a half-written blob.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::errors::{Result, VaultFillError};

/// Key under which the account map is stored.
pub const USERS_KEY: &str = "users";

/// Key under which the remembered (non-sensitive) login marker is stored.
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Prefix of the key holding one account's sealed entry list.
pub const ENTRIES_PREFIX: &str = "entries_";

/// Longest accepted key. `put` writes `.<key>.blob.tmp`, which must still
/// fit in a 255-byte file name.
pub const MAX_KEY_LEN: usize = 255 - ".".len() - ".blob.tmp".len();

/// Key holding one account's sealed entry list.
pub fn entries_key(email: &str) -> String {
    format!("{ENTRIES_PREFIX}{email}")
}

/// A string key-value store. Writes replace the whole value.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(blobs.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        blobs.remove(key);
        Ok(())
    }
}

/// Directory-backed store: `<dir>/<key>.blob`.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open (and create if needed) the data directory.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                VaultFillError::Storage(format!("cannot create {}: {e}", dir.display()))
            })?;
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.blob")))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let value = fs::read_to_string(&path)
            .map_err(|e| VaultFillError::Storage(format!("read {}: {e}", path.display())))?;
        Ok(Some(value))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;

        // The temp file is in the same directory so the rename stays on
        // one filesystem and is atomic.
        let tmp_path = self.dir.join(format!(".{key}.blob.tmp"));
        fs::write(&tmp_path, value)
            .map_err(|e| VaultFillError::Storage(format!("write {}: {e}", tmp_path.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&tmp_path, perms).map_err(|e| {
                VaultFillError::Storage(format!("set permissions on {}: {e}", tmp_path.display()))
            })?;
        }

        fs::rename(&tmp_path, &path)
            .map_err(|e| VaultFillError::Storage(format!("replace {}: {e}", path.display())))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultFillError::Storage(format!(
                "remove {}: {e}",
                path.display()
            ))),
        }
    }
}

/// Keys become file names, so only a conservative charset is allowed.
///
/// Emails contain `@`, `.`, `+`, `-`, `_`; nothing that can climb out of
/// the data directory.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(VaultFillError::Storage(format!(
            "invalid blob key length: {}",
            key.len()
        )));
    }
    if key.starts_with('.') {
        return Err(VaultFillError::Storage(format!(
            "blob key '{key}' cannot start with a period"
        )));
    }
    if !key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'@' | b'+'))
    {
        return Err(VaultFillError::Storage(format!(
            "blob key '{key}' contains invalid characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        assert_eq!(store.get("users").unwrap(), None);
        store.put("users", "{}").unwrap();
        assert_eq!(store.get("users").unwrap().as_deref(), Some("{}"));
        store.remove("users").unwrap();
        store.remove("users").unwrap();
        assert_eq!(store.get("users").unwrap(), None);
    }

    #[test]
    fn file_store_replaces_values() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::open(&dir.path().join("data")).unwrap();

        store.put("entries_a@x.com", "first").unwrap();
        store.put("entries_a@x.com", "second").unwrap();
        assert_eq!(
            store.get("entries_a@x.com").unwrap().as_deref(),
            Some("second")
        );

        // No temp file is left behind.
        let leftovers: Vec<_> = fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn file_store_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        assert_eq!(store.get("currentUser").unwrap(), None);
        store.remove("currentUser").unwrap();
    }

    #[test]
    fn key_length_leaves_room_for_the_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();

        let longest = "k".repeat(MAX_KEY_LEN);
        store.put(&longest, "v").unwrap();
        assert_eq!(store.get(&longest).unwrap().as_deref(), Some("v"));

        let too_long = "k".repeat(MAX_KEY_LEN + 1);
        assert!(matches!(
            store.put(&too_long, "v").unwrap_err(),
            VaultFillError::Storage(_)
        ));
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        assert!(store.put("../escape", "x").is_err());
        assert!(store.put("a/b", "x").is_err());
        assert!(store.put(".hidden", "x").is_err());
        assert!(store.put("", "x").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn blobs_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        store.put("users", "{}").unwrap();

        let mode = fs::metadata(dir.path().join("users.blob"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
