pub mod telegram;

use crate::error::Result;
use crate::types::SendOptions;
use async_trait::async_trait;

pub use telegram::TelegramTransport;

/// Outgoing side of the chat platform. Both the inbox poller and the
/// dispatcher send through the same instance.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, options: SendOptions) -> Result<()>;
}
