//! Login, signup and logout flows

use std::sync::Arc;

use certwatch_session::{Session, SessionManager};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::ClientError;

/// Connects the login endpoint to the session manager.
pub struct AuthFlow {
    api: Arc<ApiClient>,
    session: Arc<SessionManager>,
}

impl AuthFlow {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionManager>) -> Self {
        Self { api, session }
    }

    /// Exchange credentials for a token and adopt it.
    ///
    /// HTTP failures are returned. A token the server issued but that can't be
    /// decoded still yields `Ok` with a logged-out session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Arc<Session>, ClientError> {
        info!("Login attempt for {}", username);
        let token = self.api.login(username, password).await.map_err(|e| {
            warn!("Login failed for {}: {}", username, e);
            e
        })?;

        let session = self.session.login(&token.access_token);
        if !session.is_authenticated() {
            warn!("Server issued a token for {} that could not be decoded", username);
        }
        Ok(session)
    }

    pub async fn signup(&self, username: &str, password: &str) -> Result<String, ClientError> {
        let response = self.api.signup(username, password).await?;
        info!("Signed up {}", username);
        Ok(response.message)
    }

    pub fn logout(&self) -> Arc<Session> {
        self.session.logout()
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }
}
