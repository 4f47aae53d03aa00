//! Token persistence
//!
//! The bearer token is the only state that survives between runs. It is kept
//! under a fixed key: a single file on disk, or memory for tests.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Durable home of the bearer token
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read the persisted token, if any
    async fn load(&self) -> io::Result<Option<String>>;

    /// Persist `token`, replacing any previous one
    async fn save(&self, token: &str) -> io::Result<()>;

    /// Erase the persisted token; erasing nothing is not an error
    async fn clear(&self) -> io::Result<()>;
}

/// Token kept in a single file
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let token = content.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, token).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        Ok(())
    }

    async fn clear(&self) -> io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Token kept in memory only
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a token already "persisted"
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> io::Result<Option<String>> {
        Ok(self.token.lock().await.clone())
    }

    async fn save(&self, token: &str) -> io::Result<()> {
        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> io::Result<()> {
        *self.token.lock().await = None;
        Ok(())
    }
}

#[async_trait]
impl<T: TokenStore + ?Sized> TokenStore for std::sync::Arc<T> {
    async fn load(&self) -> io::Result<Option<String>> {
        (**self).load().await
    }

    async fn save(&self, token: &str) -> io::Result<()> {
        (**self).save(token).await
    }

    async fn clear(&self) -> io::Result<()> {
        (**self).clear().await
    }
}
