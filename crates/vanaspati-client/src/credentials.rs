//! Credential store implementations.
//!
//! - [`MemoryCredentialStore`]: process-local map, gone at exit.
//! - [`FileCredentialStore`]: a JSON object on disk, the desktop analogue of
//!   origin-scoped browser storage. Every write rewrites the whole file via a
//!   temporary file and rename.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use vanaspati_core::logging::component;
use vanaspati_core::{CredentialStore, Result};

type Entries = BTreeMap<String, String>;

fn read(lock: &RwLock<Entries>) -> RwLockReadGuard<'_, Entries> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(lock: &RwLock<Entries>) -> RwLockWriteGuard<'_, Entries> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Credential store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<Entries>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a bearer token.
    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        write(&store.entries).insert(vanaspati_core::defaults::KEY_TOKEN.to_string(), token.into());
        store
    }

    pub fn is_empty(&self) -> bool {
        read(&self.entries).is_empty()
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        read(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        write(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        write(&self.entries).remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        write(&self.entries).clear();
        Ok(())
    }
}

// =============================================================================
// FILE-BACKED
// =============================================================================

/// Credential store persisted as a JSON object.
///
/// The file is read once at open; this process is assumed to be its only
/// writer afterwards.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl FileCredentialStore {
    /// Default location: `~/.config/vanaspati/credentials.json`.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        path.push("vanaspati");
        path.push("credentials.json");
        path
    }

    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// treated as empty and overwritten on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Entries>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        component = component::CREDENTIALS,
                        path = %path.display(),
                        error = %e,
                        "Credential file is corrupt, starting empty"
                    );
                    Entries::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(
            component = component::CREDENTIALS,
            path = %path.display(),
            keys = entries.len(),
            "Opened credential store"
        );

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(serde_json::to_string_pretty(entries)?.as_bytes())?;
            file.sync_all()?;
        }
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        read(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = write(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = write(&self.entries);
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = write(&self.entries);
        entries.clear();
        self.persist(&entries)
    }
}
