use crate::channels::ChatTransport;
use crate::config::SessionLostPolicy;
use crate::error::Result;
use crate::gateway::DeviceApi;
use crate::messages;
use crate::session::DeviceSession;
use crate::types::{InboundSms, SendOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const FIRST_PAGE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The iteration finished; `forwarded` messages reached the chat.
    Completed { forwarded: usize },
    /// The gateway session is gone and polling must stop.
    SessionLost,
}

/// Forwards unread gateway SMS to the authorized chat.
pub struct InboxPoller {
    api: Arc<dyn DeviceApi>,
    chat: Arc<dyn ChatTransport>,
    session: Arc<DeviceSession>,
    chat_id: i64,
    interval: Duration,
    page_size: u32,
    policy: SessionLostPolicy,
}

impl InboxPoller {
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
            interval: Duration::from_secs(60),
            page_size: 50,
            policy: SessionLostPolicy::Stop,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_policy(mut self, policy: SessionLostPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Polls with a fixed delay between iterations until the session is lost
    /// or `cancel` fires. Failed iterations are logged and skipped.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "inbox poller started");
        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.poll_once() => outcome,
            };
            match outcome {
                Ok(PollOutcome::Completed { forwarded }) => {
                    debug!(forwarded, "poll iteration complete");
                }
                Ok(PollOutcome::SessionLost) => {
                    warn!("gateway session lost, inbox polling stopped");
                    self.notify_stopped().await;
                    return;
                }
                Err(err) => {
                    error!("poll iteration abandoned: {err}");
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }
        info!("inbox poller cancelled");
    }

    /// One polling iteration: session check, unread count, then forward and
    /// mark read each unread message in page order. A session error from the
    /// gateway mid-iteration is handled like a failed session check.
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        if !self.session_alive().await {
            return Ok(PollOutcome::SessionLost);
        }

        let mut forwarded = 0;
        match self.drain_inbox(&mut forwarded).await {
            Ok(()) => Ok(PollOutcome::Completed { forwarded }),
            Err(err) if err.is_session_error() => {
                warn!("gateway rejected the session mid-iteration: {err}");
                Ok(self.recover_session(forwarded).await)
            }
            Err(err) => Err(err),
        }
    }

    async fn drain_inbox(&self, forwarded: &mut usize) -> Result<()> {
        let count = self.api.unread_count().await?;
        debug!(unread = count.inbox_unread, "inbox unread count");
        if count.inbox_unread == 0 {
            return Ok(());
        }

        let page = self.api.list_messages(FIRST_PAGE, self.page_size).await?;
        for sms in page.iter().filter(|m| m.is_unread()) {
            self.forward(sms).await?;
            *forwarded += 1;
        }
        Ok(())
    }

    /// Remaining unread messages are picked up by the next iteration.
    async fn recover_session(&self, forwarded: usize) -> PollOutcome {
        match self.policy {
            SessionLostPolicy::Stop => PollOutcome::SessionLost,
            SessionLostPolicy::Reauthenticate => match self.session.reauthenticate().await {
                Ok(()) => PollOutcome::Completed { forwarded },
                Err(err) => {
                    error!("re-login failed: {err}");
                    PollOutcome::SessionLost
                }
            },
        }
    }

    async fn session_alive(&self) -> bool {
        match self.policy {
            SessionLostPolicy::Stop => self.session.is_authenticated().await,
            SessionLostPolicy::Reauthenticate => match self.session.ensure_authenticated().await {
                Ok(()) => true,
                Err(err) => {
                    error!("re-login failed: {err}");
                    false
                }
            },
        }
    }

    /// Marking read only after the chat accepted the forward means a failure
    /// can duplicate a message but never lose one.
    async fn forward(&self, sms: &InboundSms) -> Result<()> {
        let text = messages::forward_notice(sms);
        let options = SendOptions {
            disable_link_preview: true,
        };
        self.chat.send_text(self.chat_id, &text, options).await?;
        self.api.mark_read(&sms.id).await?;
        info!(id = %sms.id, "forwarded sms");
        Ok(())
    }

    async fn notify_stopped(&self) {
        if let Err(err) = self
            .chat
            .send_text(self.chat_id, messages::POLLING_STOPPED, SendOptions::default())
            .await
        {
            warn!("could not notify chat about stopped polling: {err}");
        }
    }
}
