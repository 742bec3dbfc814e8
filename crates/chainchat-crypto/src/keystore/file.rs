//! JSON file key store, optionally sealed with a passphrase.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use fslock::LockFile;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::sealed::{self, KdfParams};
use super::KeyStore;
use crate::error::{CryptoError, CryptoResult};

type Entries = BTreeMap<String, String>;

struct Seal {
    passphrase: Zeroizing<String>,
    params: KdfParams,
}

/// Key store persisted as a single JSON object on disk.
///
/// Reads are served from a snapshot taken at open and refreshed on every
/// write. A write takes an exclusive lock on `<file>.lock`, re-reads the
/// document from disk, applies the change, and replaces the file atomically
/// (temporary file, then rename). Several handles or processes on the same
/// path therefore never overwrite each other's slots, and `set_if_absent`
/// sees values written elsewhere.
pub struct FileKeyStore {
    path: PathBuf,
    seal: Option<Seal>,
    entries: RwLock<Entries>,
}

impl FileKeyStore {
    /// Open a plaintext store. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = load_entries(&path, None)?;
        Ok(Self::loaded(path, None, entries))
    }

    /// Open a store sealed with `passphrase` using default Argon2id parameters.
    pub fn open_sealed(path: impl AsRef<Path>, passphrase: &str) -> CryptoResult<Self> {
        Self::open_sealed_with_params(path, passphrase, KdfParams::default())
    }

    /// Open a sealed store, writing with the given Argon2id parameters.
    ///
    /// Existing files are always opened with the parameters recorded in their
    /// header; `params` only applies to subsequent writes.
    pub fn open_sealed_with_params(
        path: impl AsRef<Path>,
        passphrase: &str,
        params: KdfParams,
    ) -> CryptoResult<Self> {
        sealed::check_passphrase(passphrase)?;

        let path = path.as_ref().to_path_buf();
        let seal = Seal {
            passphrase: Zeroizing::new(passphrase.to_string()),
            params,
        };
        let entries = load_entries(&path, Some(&seal))?;
        Ok(Self::loaded(path, Some(seal), entries))
    }

    fn loaded(path: PathBuf, seal: Option<Seal>, entries: Entries) -> Self {
        debug!(
            subsystem = "crypto",
            component = "keystore",
            op = "open",
            path = %path.display(),
            sealed = seal.is_some(),
            entry_count = entries.len(),
            "Key store opened"
        );
        Self {
            path,
            seal,
            entries: RwLock::new(entries),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file is encrypted at rest.
    pub fn is_sealed(&self) -> bool {
        self.seal.is_some()
    }

    fn read(&self) -> CryptoResult<RwLockReadGuard<'_, Entries>> {
        self.entries
            .read()
            .map_err(|_| unavailable(&self.path, "lock poisoned"))
    }

    fn write(&self) -> CryptoResult<RwLockWriteGuard<'_, Entries>> {
        self.entries
            .write()
            .map_err(|_| unavailable(&self.path, "lock poisoned"))
    }

    /// Exclusive advisory lock shared by every handle on this path.
    fn lock_file(&self) -> CryptoResult<LockFile> {
        create_parent_dir(&self.path).map_err(|e| unavailable(&self.path, &e.to_string()))?;

        let lock_path = sibling(&self.path, ".lock");
        let mut lock = LockFile::open(lock_path.as_path())
            .map_err(|e| unavailable(&lock_path, &format!("error opening lockfile: {}", e)))?;
        lock.lock()
            .map_err(|e| unavailable(&lock_path, &format!("error locking lockfile: {}", e)))?;
        Ok(lock)
    }

    /// Re-read the document under the file lock, apply `change`, persist it,
    /// then commit to the snapshot.
    fn mutate<F>(&self, change: F) -> CryptoResult<()>
    where
        F: FnOnce(&mut Entries) -> bool,
    {
        let mut entries = self.write()?;
        let _lock = self.lock_file()?;

        let mut updated = load_entries(&self.path, self.seal.as_ref())?;
        if change(&mut updated) {
            self.persist(&updated)?;
        }
        *entries = updated;
        Ok(())
    }

    fn persist(&self, entries: &Entries) -> CryptoResult<()> {
        let json = Zeroizing::new(
            serde_json::to_vec_pretty(entries)
                .map_err(|e| unavailable(&self.path, &e.to_string()))?,
        );
        let data = match &self.seal {
            Some(seal) => sealed::seal_document(&json, &seal.passphrase, &seal.params)?,
            None => json.to_vec(),
        };

        write_atomic(&self.path, &data).map_err(|e| {
            warn!(
                subsystem = "crypto",
                component = "keystore",
                op = "persist",
                path = %self.path.display(),
                error = %e,
                "Key store write failed"
            );
            unavailable(&self.path, &e.to_string())
        })?;

        debug!(
            subsystem = "crypto",
            component = "keystore",
            op = "persist",
            entry_count = entries.len(),
            output_len = data.len(),
            "Key store written"
        );
        Ok(())
    }
}

impl std::fmt::Debug for FileKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKeyStore")
            .field("path", &self.path)
            .field("sealed", &self.is_sealed())
            .finish()
    }
}

impl KeyStore for FileKeyStore {
    fn get(&self, key: &str) -> CryptoResult<Option<String>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> CryptoResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn delete(&self, key: &str) -> CryptoResult<()> {
        self.mutate(|entries| entries.remove(key).is_some())
    }

    fn set_if_absent(&self, key: &str, value: &str) -> CryptoResult<Option<String>> {
        let mut existing = None;
        self.mutate(|entries| match entries.get(key) {
            Some(current) => {
                existing = Some(current.clone());
                false
            }
            None => {
                entries.insert(key.to_string(), value.to_string());
                true
            }
        })?;
        Ok(existing)
    }
}

fn unavailable(path: &Path, msg: &str) -> CryptoError {
    CryptoError::StorageUnavailable(format!("{}: {}", path.display(), msg))
}

fn read_file(path: &Path) -> CryptoResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(unavailable(path, &e.to_string())),
    }
}

fn load_entries(path: &Path, seal: Option<&Seal>) -> CryptoResult<Entries> {
    let Some(data) = read_file(path)? else {
        return Ok(Entries::new());
    };

    match seal {
        Some(seal) => {
            let plaintext = Zeroizing::new(sealed::open_document(&data, &seal.passphrase)?);
            parse_entries(path, &plaintext)
        }
        None if sealed::is_sealed(&data) => Err(unavailable(
            path,
            "store is sealed; open it with a passphrase",
        )),
        None => parse_entries(path, &data),
    }
}

fn parse_entries(path: &Path, data: &[u8]) -> CryptoResult<Entries> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Entries::new());
    }
    serde_json::from_slice(data).map_err(|e| unavailable(path, &format!("unreadable store: {}", e)))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("keystore"));
    name.push(suffix);
    path.with_file_name(name)
}

fn create_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let tmp_path = sibling(path, ".tmp");

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)
}
