use crate::auth::is_authorized;
use crate::channels::ChatTransport;
use crate::conversation::ConversationPhase;
use crate::error::{RelayError, Result};
use crate::gateway::DeviceApi;
use crate::messages;
use crate::phone::is_phone_number;
use crate::session::DeviceSession;
use crate::types::{ChatEvent, OutboundSms, SendOptions};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    SendSms,
    GetInfo,
}

/// Recognizes a slash command on the first line, with or without a
/// `@botname` suffix.
pub fn parse_command(text: &str) -> Option<Command> {
    let first = text.lines().next()?.split_whitespace().next()?;
    let name = first.split('@').next()?;
    match name {
        "/start" => Some(Command::Start),
        "/sendsms" => Some(Command::SendSms),
        "/getinfo" => Some(Command::GetInfo),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendSmsArgs {
    /// No recipient given; ask for one.
    Guided,
    Direct { phone: String, body: String },
}

/// Splits `/sendsms\n<number>\n\n<body...>`. A single blank separator line is
/// dropped; the remaining lines form the body.
pub fn parse_sendsms(text: &str) -> SendSmsArgs {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= 2 {
        return SendSmsArgs::Guided;
    }
    let phone = lines[1].trim().to_string();
    let rest = if lines[2].trim().is_empty() {
        &lines[3..]
    } else {
        &lines[2..]
    };
    SendSmsArgs::Direct {
        phone,
        body: rest.join("\n"),
    }
}

/// Checks a send request before anything reaches the gateway. The error
/// carries the reason shown to the user.
pub fn validate_outbound(phone: &str, body: &str) -> Result<OutboundSms> {
    if !is_phone_number(phone) {
        return Err(RelayError::Validation(messages::ILLEGAL_PHONE.to_string()));
    }
    if body.trim().is_empty() {
        return Err(RelayError::Validation(messages::EMPTY_BODY.to_string()));
    }
    Ok(OutboundSms {
        phone: phone.trim().to_string(),
        content: body.to_string(),
    })
}

/// Conversation state machine for the one authorized chat.
pub struct CommandDispatcher {
    api: Arc<dyn DeviceApi>,
    chat: Arc<dyn ChatTransport>,
    session: Arc<DeviceSession>,
    chat_id: i64,
    phase: ConversationPhase,
}

impl CommandDispatcher {
    pub fn new(
        api: Arc<dyn DeviceApi>,
        chat: Arc<dyn ChatTransport>,
        session: Arc<DeviceSession>,
        chat_id: i64,
    ) -> Self {
        Self {
            api,
            chat,
            session,
            chat_id,
            phase: ConversationPhase::Idle,
        }
    }

    pub fn phase(&self) -> &ConversationPhase {
        &self.phase
    }

    /// Handles events until the sending side of `rx` is dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<ChatEvent>) {
        info!("command dispatcher started");
        while let Some(event) = rx.recv().await {
            self.handle_event(&event).await;
        }
        info!("command dispatcher stopped");
    }

    pub async fn handle_event(&mut self, event: &ChatEvent) {
        if !is_authorized(event, self.chat_id) {
            return;
        }
        let Some(text) = event.text.as_deref() else {
            return;
        };
        match parse_command(text) {
            Some(command) => {
                debug!(message_id = event.message_id, ?command, "chat command");
                self.phase.reset();
                self.handle_command(command, event.chat_id, text).await;
            }
            None => self.handle_text(event.chat_id, text).await,
        }
    }

    async fn handle_command(&mut self, command: Command, chat_id: i64, text: &str) {
        match command {
            Command::Start => self.reply(chat_id, &messages::help()).await,
            Command::GetInfo => self.reply(chat_id, &messages::device_info()).await,
            Command::SendSms => match parse_sendsms(text) {
                SendSmsArgs::Guided => {
                    self.phase = ConversationPhase::AwaitingPhoneNumber;
                    self.reply(chat_id, &messages::send_notice(messages::ASK_PHONE))
                        .await;
                }
                SendSmsArgs::Direct { phone, body } => {
                    self.submit(chat_id, validate_outbound(&phone, &body)).await;
                }
            },
        }
    }

    async fn handle_text(&mut self, chat_id: i64, text: &str) {
        match self.phase.reset() {
            ConversationPhase::Idle => debug!("ignoring text outside a conversation"),
            ConversationPhase::AwaitingPhoneNumber => {
                if is_phone_number(text) {
                    self.phase = ConversationPhase::AwaitingMessageBody {
                        phone: text.trim().to_string(),
                    };
                    self.reply(chat_id, &messages::send_notice(messages::ASK_BODY))
                        .await;
                } else {
                    self.phase = ConversationPhase::AwaitingPhoneNumber;
                    self.reply(chat_id, &messages::send_notice(messages::ASK_PHONE_AGAIN))
                        .await;
                }
            }
            ConversationPhase::AwaitingMessageBody { phone } => {
                self.submit(chat_id, validate_outbound(&phone, text)).await;
            }
        }
    }

    /// Confirms, then hands the SMS to the gateway. The session is verified
    /// and renewed first so nothing is sent over a stale login.
    async fn submit(&self, chat_id: i64, request: Result<OutboundSms>) {
        let request = match request {
            Ok(request) => request,
            Err(RelayError::Validation(reason)) => {
                warn!("rejected sms request: {reason}");
                self.reply(chat_id, &messages::send_notice(&reason)).await;
                return;
            }
            Err(err) => {
                self.reply(chat_id, &messages::send_failed(&err.to_string()))
                    .await;
                return;
            }
        };
        if let Err(err) = self.session.ensure_authenticated().await {
            error!("cannot send sms without a gateway session: {err}");
            self.reply(
                chat_id,
                &messages::send_notice(messages::SESSION_UPDATE_FAILED),
            )
            .await;
            return;
        }

        self.reply(
            chat_id,
            &messages::send_confirmation(&request.phone, &request.content),
        )
        .await;
        match self
            .api
            .send_message(&request.phone, &request.content)
            .await
        {
            Ok(()) => info!("sms submitted to gateway"),
            Err(err) => {
                error!("sms send failed: {err}");
                self.reply(chat_id, &messages::send_failed(&err.to_string()))
                    .await;
            }
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(err) = self
            .chat
            .send_text(chat_id, text, SendOptions::default())
            .await
        {
            warn!("chat reply failed: {err}");
        }
    }
}
