use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::warn;
use wikirpc_core::Credentials;

const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Saved login data for one remote wiki, persisted as a JSON file in the
/// wiki's data directory and mirrored in memory. The mirror is what readers
/// observe, so a `clear` is effective even when removing the file fails.
pub struct CredentialStore {
    path: PathBuf,
    current: Mutex<Option<Credentials>>,
}

impl CredentialStore {
    /// Opens the store rooted at `dir`, creating the directory and loading
    /// any persisted credentials. A corrupt credential file is ignored.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let path = dir.join(CREDENTIALS_FILE);

        let current = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(creds) => Some(creds),
                Err(err) => {
                    warn!(path = %path.display(), "ignoring corrupt credential file: {err}");
                    None
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            current: Mutex::new(current),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.lock().is_some()
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.lock().clone()
    }

    pub fn save(&self, credentials: &Credentials) -> Result<(), StoreError> {
        let mut current = self.lock();
        let bytes = serde_json::to_vec_pretty(credentials)?;
        fs::write(&self.path, bytes)?;
        *current = Some(credentials.clone());
        Ok(())
    }

    /// Drops the saved credentials. The in-memory copy is cleared
    /// unconditionally; a failure to remove the file is logged, since the
    /// dispatch path that calls this has no error channel.
    pub fn clear(&self) {
        let mut current = self.lock();
        *current = None;
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), "failed to remove credential file: {err}");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Credentials>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();
        assert!(!store.has_credentials());

        store.save(&Credentials::new("alice", "secret")).unwrap();
        assert!(store.has_credentials());

        // A fresh store over the same directory sees the persisted copy.
        let reopened = CredentialStore::open(dir.path()).unwrap();
        let creds = reopened.credentials().unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "secret");
    }

    #[test]
    fn test_clear_removes_file_and_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(dir.path()).unwrap();
        store.save(&Credentials::new("alice", "secret")).unwrap();

        store.clear();
        assert!(!store.has_credentials());
        // Clearing twice is harmless.
        store.clear();

        let reopened = CredentialStore::open(dir.path()).unwrap();
        assert!(!reopened.has_credentials());
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CREDENTIALS_FILE), b"not json").unwrap();

        let store = CredentialStore::open(dir.path()).unwrap();
        assert!(!store.has_credentials());
    }
}
