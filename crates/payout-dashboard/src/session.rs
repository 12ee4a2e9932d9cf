//! Signed-in session and its storage port.
//!
//! The session is an explicit value held by `SessionContext`; where it
//! persists is decided by the injected `SessionStore`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use payout_core::Token;
use payout_session::{AccountInfo, SessionError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DashboardError, DashboardResult};
use crate::fetcher::{FetchError, TokenVerifier};

/// A verified token and the account it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Token,
    pub account: AccountInfo,
}

/// Where the session lives between runs.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> DashboardResult<Option<Session>>;
    fn save(&self, session: &Session) -> DashboardResult<()>;
    fn clear(&self) -> DashboardResult<()>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> DashboardResult<Option<Session>> {
        Ok(self.session.lock().clone())
    }

    fn save(&self, session: &Session) -> DashboardResult<()> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> DashboardResult<()> {
        *self.session.lock() = None;
        Ok(())
    }
}

/// JSON file store. The file holds the raw token, so it is written
/// owner-only on Unix.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> DashboardResult<Option<Session>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let session = serde_json::from_str(&content).map_err(|e| {
            DashboardError::Storage(format!("{}: {e}", self.path.display()))
        })?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> DashboardResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        write_private(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> DashboardResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `contents` to a file only the owner can read. The mode is set
/// before any content lands, also when the file already existed.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents)?;
    file.sync_all()
}

/// Session access for the controller and the login/logout commands.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Validate and verify `raw`, then persist the session.
    pub async fn login(&self, verifier: &dyn TokenVerifier, raw: &str) -> DashboardResult<Session> {
        let token =
            Token::new(raw).map_err(|_| FetchError::from(SessionError::InvalidToken))?;
        let account = verifier.verify(&token).await?;
        let session = Session { token, account };
        self.store.save(&session)?;
        info!(
            currency = %session.account.currency,
            account_type = %session.account.account_type,
            "Signed in"
        );
        Ok(session)
    }

    pub fn current(&self) -> DashboardResult<Option<Session>> {
        self.store.load()
    }

    pub fn logout(&self) -> DashboardResult<()> {
        self.store.clear()?;
        info!("Signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use crate::fetcher::MockFetcher;
    use payout_core::ErrorKind;

    fn session() -> Session {
        Session {
            token: Token::new("stored-token").unwrap(),
            account: AccountInfo {
                currency: "EUR".to_string(),
                account_type: "trading".to_string(),
                loginid: Some("CR42".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_login_saves_session() {
        let context = SessionContext::new(Arc::new(MemorySessionStore::new()));
        let verifier = MockFetcher::new();

        let session = context.login(&verifier, "  my-token ").await.unwrap();

        assert_eq!(session.token.expose(), "my-token");
        assert_eq!(session.account.currency, "USD");
        assert_eq!(context.current().unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_blank_token_rejected() {
        let context = SessionContext::new(Arc::new(MemorySessionStore::new()));
        let err = context.login(&MockFetcher::new(), "   ").await.unwrap_err();

        assert_eq!(err.to_string(), "Please enter a valid API token");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(context.current().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_verification_stores_nothing() {
        let context = SessionContext::new(Arc::new(MemorySessionStore::new()));
        let verifier = MockFetcher::new();
        verifier.push_account(Err(FetchError::new(ErrorKind::Upstream, "The token is invalid.")));

        let err = context.login(&verifier, "bad").await.unwrap_err();

        assert_eq!(err.to_string(), "The token is invalid.");
        assert!(context.current().unwrap().is_none());
    }

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));

        assert!(store.load().unwrap().is_none());
        store.save(&session()).unwrap();
        assert_eq!(store.load().unwrap(), Some(session()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let store = FileSessionStore::new(&path);

        store.save(&session()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        // A pre-existing readable file is narrowed on save.
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        store.save(&session()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap(), Some(session()));
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let err = FileSessionStore::new(&path).load().unwrap_err();
        assert!(matches!(err, DashboardError::Storage(_)));
    }
}
