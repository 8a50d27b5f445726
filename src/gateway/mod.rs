pub mod hilink;

use crate::error::Result;
use crate::types::{InboundSms, LoginState, SessionTokenInfo, SmsCount};
use async_trait::async_trait;

pub use hilink::HilinkClient;

/// Typed operations offered by the cellular gateway.
///
/// One instance is shared by the inbox poller and the command dispatcher, so
/// implementations must be safe to call from several tasks at once.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Returns `Ok(false)` when the gateway answered but did not accept the login.
    async fn login(&self, username: &str, password: &str) -> Result<bool>;

    async fn login_state(&self) -> Result<LoginState>;

    /// Refreshes the verification token for the current session.
    async fn session_token_info(&self) -> Result<SessionTokenInfo>;

    async fn unread_count(&self) -> Result<SmsCount>;

    /// Lists inbox messages; `page` starts at 1.
    async fn list_messages(&self, page: u32, page_size: u32) -> Result<Vec<InboundSms>>;

    async fn mark_read(&self, id: &str) -> Result<()>;

    async fn send_message(&self, phone: &str, content: &str) -> Result<()>;
}
