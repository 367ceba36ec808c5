//! Persistence for provider credentials between sessions.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{PathwayError, Result};
use crate::models::credentials::Credentials;
use crate::models::provider::ProviderId;

pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Key/value store for credentials, keyed by provider.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self, provider: ProviderId) -> Result<Option<Credentials>>;

    async fn save(&self, provider: ProviderId, credentials: &Credentials) -> Result<()>;

    async fn remove(&self, provider: ProviderId) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: RwLock<HashMap<ProviderId, Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self, provider: ProviderId) -> Result<Option<Credentials>> {
        Ok(self.entries.read().await.get(&provider).cloned())
    }

    async fn save(&self, provider: ProviderId, credentials: &Credentials) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(provider, credentials.clone());
        Ok(())
    }

    async fn remove(&self, provider: ProviderId) -> Result<()> {
        self.entries.write().await.remove(&provider);
        Ok(())
    }
}

/// JSON file store, one object keyed by provider name.
///
/// The file is replaced atomically on every write and is readable by the
/// owner only on unix.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store under `data_dir/credentials.json`.
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(CREDENTIALS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, Credentials>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            PathwayError::Serialization(format!(
                "failed to parse {}: {e}",
                self.path.display()
            ))
        })
    }

    async fn write_all(&self, entries: &BTreeMap<String, Credentials>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| PathwayError::Serialization(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&tmp_path).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // `mode` only applies when the file is created.
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, provider: ProviderId) -> Result<Option<Credentials>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(provider.as_str()))
    }

    async fn save(&self, provider: ProviderId, credentials: &Credentials) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(provider.as_str().to_string(), credentials.clone());
        self.write_all(&entries).await?;
        debug!(%provider, path = %self.path.display(), "Saved credentials");
        Ok(())
    }

    async fn remove(&self, provider: ProviderId) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        if entries.remove(provider.as_str()).is_some() {
            self.write_all(&entries).await?;
        }
        Ok(())
    }
}
