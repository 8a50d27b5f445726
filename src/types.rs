use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadState {
    Unread,
    Read,
}

/// An SMS stored in the gateway inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundSms {
    pub id: String,
    pub phone: String,
    pub content: String,
    pub date: String,
    pub status: ReadState,
}

impl InboundSms {
    pub fn is_unread(&self) -> bool {
        self.status == ReadState::Unread
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundSms {
    pub phone: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginState {
    pub state: i32,
    pub username: Option<String>,
}

impl LoginState {
    pub fn is_logged_in(&self) -> bool {
        self.state == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTokenInfo {
    pub session: String,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SmsCount {
    pub inbox_unread: u32,
    pub inbox_total: u32,
}

/// A text message received from the chat platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub message_id: i64,
    pub chat_id: i64,
    pub sender_id: Option<i64>,
    pub is_private: bool,
    pub sender_name: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendOptions {
    pub disable_link_preview: bool,
}
