use crate::error::{RelayError, Result};
use crate::gateway::DeviceApi;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    pub authenticated: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// Keeps the gateway admin session alive.
///
/// The state sits behind an async mutex that is held for the whole
/// check-and-login sequence, so the poller and the dispatcher never act on a
/// flag the other one is in the middle of changing.
pub struct DeviceSession {
    api: Arc<dyn DeviceApi>,
    username: String,
    password: String,
    state: Mutex<SessionState>,
}

impl DeviceSession {
    pub fn new(api: Arc<dyn DeviceApi>, username: &str, password: &str) -> Self {
        Self {
            api,
            username: username.to_string(),
            password: password.to_string(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub async fn login(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.login_locked(&mut state).await
    }

    /// Asks the gateway whether the session is still logged in. Query failures
    /// count as logged out.
    pub async fn is_authenticated(&self) -> bool {
        let mut state = self.state.lock().await;
        self.check_locked(&mut state).await
    }

    pub async fn reauthenticate(&self) -> Result<()> {
        info!("re-authenticating with gateway");
        self.login().await
    }

    /// Checks the session and logs in again if it is gone, atomically with
    /// respect to other callers.
    pub async fn ensure_authenticated(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if self.check_locked(&mut state).await {
            return Ok(());
        }
        warn!("gateway session lost, logging in again");
        self.login_locked(&mut state).await
    }

    /// Last known state without touching the gateway.
    pub async fn snapshot(&self) -> SessionState {
        *self.state.lock().await
    }

    async fn login_locked(&self, state: &mut SessionState) -> Result<()> {
        state.authenticated = false;
        let accepted = self.api.login(&self.username, &self.password).await?;
        if !accepted {
            return Err(RelayError::Authentication(
                "gateway did not accept the admin login".to_string(),
            ));
        }
        state.authenticated = true;
        state.last_checked_at = Some(Utc::now());
        info!("logged in to gateway");

        if let Err(err) = self.api.session_token_info().await {
            warn!("could not refresh session token after login: {err}");
        }
        Ok(())
    }

    async fn check_locked(&self, state: &mut SessionState) -> bool {
        let authenticated = match self.api.login_state().await {
            Ok(login) => login.is_logged_in(),
            Err(err) => {
                warn!("login state query failed: {err}");
                false
            }
        };
        state.authenticated = authenticated;
        state.last_checked_at = Some(Utc::now());
        authenticated
    }
}
