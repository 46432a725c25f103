//! Session state derived from the bearer token

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::store::TokenStore;
use crate::token::{decode_claims, TokenError};

/// Immutable snapshot of who is using the console.
///
/// Snapshots are only ever built whole; `is_admin` can't be set without a
/// decoded token, so an admin session is always an authenticated one.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Session {
    raw_token: Option<String>,
    subject: Option<String>,
    is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedInUser,
    LoggedInAdmin,
}

impl Session {
    pub fn logged_out() -> Self {
        Self::default()
    }

    /// Build an authenticated session from a token, or fail if its payload can't be decoded.
    pub fn from_token(token: impl Into<String>) -> Result<Self, TokenError> {
        let token = token.into();
        let claims = decode_claims(&token)?;
        Ok(Self {
            raw_token: Some(token.trim().to_string()),
            subject: claims.sub,
            is_admin: claims.is_admin,
        })
    }

    pub fn raw_token(&self) -> Option<&str> {
        self.raw_token.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.raw_token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.is_authenticated() && self.is_admin
    }

    pub fn state(&self) -> SessionState {
        match (self.is_authenticated(), self.is_admin()) {
            (false, _) => SessionState::LoggedOut,
            (true, false) => SessionState::LoggedInUser,
            (true, true) => SessionState::LoggedInAdmin,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("raw_token", &self.raw_token.as_ref().map(|_| "<redacted>"))
            .field("subject", &self.subject)
            .field("is_authenticated", &self.is_authenticated())
            .field("is_admin", &self.is_admin())
            .finish()
    }
}

/// Supplies the bearer token for outgoing requests.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Owns the authoritative session and publishes a new snapshot on every transition.
pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    sender: watch::Sender<Arc<Session>>,
    initialized: OnceCell<()>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (sender, _) = watch::channel(Arc::new(Session::logged_out()));
        Self {
            store,
            sender,
            initialized: OnceCell::new(),
        }
    }

    /// Restore the persisted token, once. Later calls (or calls after login/logout) are no-ops.
    pub fn initialize(&self) -> Arc<Session> {
        self.initialized.get_or_init(|| self.restore());
        self.current_session()
    }

    /// Persist and adopt a freshly issued token.
    ///
    /// A token that can't be decoded leaves the session logged out and the
    /// store empty; the caller is not told why.
    pub fn login(&self, token: &str) -> Arc<Session> {
        self.initialized.get_or_init(|| ());

        match Session::from_token(token) {
            Ok(session) => {
                if let Err(e) = self.store.save(token.trim()) {
                    warn!("Failed to persist session token: {}", e);
                }
                info!(
                    "Logged in as {} (admin: {})",
                    session.subject().unwrap_or("<unknown>"),
                    session.is_admin()
                );
                self.publish(session)
            }
            Err(e) => {
                warn!("Login token could not be decoded, staying logged out: {}", e);
                self.clear_store();
                self.publish(Session::logged_out())
            }
        }
    }

    pub fn logout(&self) -> Arc<Session> {
        self.initialized.get_or_init(|| ());
        self.clear_store();
        info!("Logged out");
        self.publish(Session::logged_out())
    }

    pub fn current_session(&self) -> Arc<Session> {
        self.sender.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Session>> {
        self.sender.subscribe()
    }

    fn restore(&self) {
        let token = match self.store.load() {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No persisted session token");
                return;
            }
            Err(e) => {
                warn!("Failed to read persisted session token: {}", e);
                return;
            }
        };

        match Session::from_token(token) {
            Ok(session) => {
                debug!("Restored session (admin: {})", session.is_admin());
                self.publish(session);
            }
            Err(e) => {
                warn!("Persisted session token is invalid, discarding: {}", e);
                self.clear_store();
                self.publish(Session::logged_out());
            }
        }
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear persisted session token: {}", e);
        }
    }

    fn publish(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        self.sender.send_replace(session.clone());
        session
    }
}

impl TokenSource for SessionManager {
    fn bearer_token(&self) -> Option<String> {
        self.current_session().raw_token().map(str::to_string)
    }
}

static GLOBAL: OnceCell<Arc<SessionManager>> = OnceCell::new();

/// Install the process-wide manager. The first installation wins.
pub fn install_global(manager: SessionManager) -> Arc<SessionManager> {
    let mut installed = false;
    let global = GLOBAL.get_or_init(|| {
        installed = true;
        Arc::new(manager)
    });
    if !installed {
        debug!("Session manager already installed, keeping the existing one");
    }
    global.clone()
}

pub fn global() -> Option<Arc<SessionManager>> {
    GLOBAL.get().cloned()
}
