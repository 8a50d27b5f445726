use crate::types::ChatEvent;
use tracing::warn;

/// Accepts only private messages sent by the configured chat identity.
pub fn is_authorized(event: &ChatEvent, chat_id: i64) -> bool {
    if !event.is_private {
        warn!(
            chat_id = event.chat_id,
            sender = ?event.sender_name,
            "request type is not allowed by security policy"
        );
        return false;
    }
    if event.sender_id != Some(chat_id) {
        warn!(
            sender_id = ?event.sender_id,
            sender = ?event.sender_name,
            "chat id not allowed"
        );
        return false;
    }
    true
}
