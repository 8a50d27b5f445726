use crate::channels::ChatTransport;
use crate::error::{RelayError, Result};
use crate::types::{ChatEvent, SendOptions};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct TelegramTransport {
    http: Client,
    api_base: String,
    token: String,
    long_poll_timeout: Duration,
}

impl TelegramTransport {
    pub fn new(http: Client, api_base: &str, token: &str, long_poll_timeout: Duration) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            long_poll_timeout,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Long-polls `getUpdates` and returns the raw update objects.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Value>> {
        let timeout = self.long_poll_timeout.as_secs().to_string();
        let offset = offset.to_string();
        let resp = self
            .http
            .get(self.method_url("getUpdates"))
            .query(&[
                ("timeout", timeout.as_str()),
                ("offset", offset.as_str()),
                ("allowed_updates", r#"["message"]"#),
            ])
            .timeout(self.long_poll_timeout + Duration::from_secs(10))
            .send()
            .await?;
        let value: Value = resp.json().await?;
        if value.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            return Err(RelayError::Chat(format!("telegram getUpdates failed: {value}")));
        }
        Ok(value
            .get("result")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str, options: SendOptions) -> Result<()> {
        let mut payload = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if options.disable_link_preview {
            payload["disable_web_page_preview"] = Value::Bool(true);
        }
        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await?;
        let value: Value = resp.json().await?;
        if value.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            return Err(RelayError::Chat(format!("telegram send failed: {value}")));
        }
        Ok(())
    }
}

/// Feeds chat events into `tx` until cancelled or the receiver is dropped.
pub async fn start_update_poller(
    transport: Arc<TelegramTransport>,
    tx: mpsc::Sender<ChatEvent>,
    cancel: CancellationToken,
) {
    let mut offset: i64 = 0;
    loop {
        let batch = tokio::select! {
            _ = cancel.cancelled() => break,
            batch = transport.get_updates(offset) => batch,
        };
        match batch {
            Ok(updates) => {
                for update in updates {
                    if let Some(update_id) = update.get("update_id").and_then(|v| v.as_i64()) {
                        offset = update_id + 1;
                    }
                    if let Some(event) = parse_telegram_update(&update) {
                        if tx.send(event).await.is_err() {
                            debug!("chat event receiver closed");
                            return;
                        }
                    }
                }
            }
            Err(err) => {
                warn!("telegram update poll failed: {err}");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(RETRY_DELAY) => {}
                }
            }
        }
    }
    debug!("telegram update poller stopped");
}

pub fn parse_telegram_update(update: &Value) -> Option<ChatEvent> {
    let msg = update.get("message")?;
    let chat = msg.get("chat")?;
    let chat_id = chat.get("id")?.as_i64()?;
    let message_id = msg.get("message_id")?.as_i64()?;
    let from = msg.get("from");

    Some(ChatEvent {
        message_id,
        chat_id,
        sender_id: from.and_then(|v| v.get("id")).and_then(|v| v.as_i64()),
        is_private: chat.get("type").and_then(|v| v.as_str()) == Some("private"),
        sender_name: from
            .and_then(|v| v.get("username"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        text: msg.get("text").and_then(|v| v.as_str()).map(|s| s.to_string()),
    })
}
