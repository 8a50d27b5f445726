pub mod auth;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod messages;
pub mod phone;
pub mod poller;
pub mod session;
pub mod types;

pub use config::Config;
pub use error::{RelayError, Result};

use self::channels::telegram::{start_update_poller, TelegramTransport};
use self::channels::ChatTransport;
use self::dispatcher::CommandDispatcher;
use self::gateway::{DeviceApi, HilinkClient};
use self::poller::InboxPoller;
use self::session::DeviceSession;
use self::types::ChatEvent;

use anyhow::Context;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const EVENT_QUEUE: usize = 100;

/// Long-lived collaborators shared by the poller and the dispatcher.
#[derive(Clone)]
pub struct Relay {
    pub config: Config,
    pub api: Arc<dyn DeviceApi>,
    pub telegram: Arc<TelegramTransport>,
    pub session: Arc<DeviceSession>,
}

impl Relay {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::new();
        let api: Arc<dyn DeviceApi> = Arc::new(
            HilinkClient::new(http.clone(), &config.dongle_url, config.request_timeout())
                .context("cannot initialize gateway client")?,
        );
        let telegram = Arc::new(TelegramTransport::new(
            http,
            &config.telegram_api_url,
            &config.bot_token,
            config.long_poll_timeout(),
        ));
        let session = Arc::new(DeviceSession::new(
            api.clone(),
            &config.username,
            &config.password,
        ));
        Ok(Self {
            config,
            api,
            telegram,
            session,
        })
    }

    fn chat(&self) -> Arc<dyn ChatTransport> {
        self.telegram.clone()
    }

    pub fn inbox_poller(&self) -> InboxPoller {
        InboxPoller::new(
            self.api.clone(),
            self.chat(),
            self.session.clone(),
            self.config.chat_id,
        )
        .with_interval(self.config.poll_interval())
        .with_page_size(self.config.page_size)
        .with_policy(self.config.on_session_lost)
    }

    pub fn dispatcher(&self) -> CommandDispatcher {
        CommandDispatcher::new(
            self.api.clone(),
            self.chat(),
            self.session.clone(),
            self.config.chat_id,
        )
    }
}

/// Logs in, starts the inbox poller and the chat dispatcher, and runs until
/// Ctrl-C. A failed initial login is fatal.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let relay = Relay::new(config)?;

    info!(url = %relay.config.dongle_url, "logging in to gateway");
    relay
        .session
        .login()
        .await
        .context("initial gateway login failed")?;

    let cancel = CancellationToken::new();

    let poller = relay.inbox_poller();
    let poller_task = tokio::spawn(poller.run(cancel.child_token()));

    let (tx, rx) = mpsc::channel::<ChatEvent>(EVENT_QUEUE);
    let updates_task = tokio::spawn(start_update_poller(
        relay.telegram.clone(),
        tx,
        cancel.clone(),
    ));
    let dispatcher_task = tokio::spawn(relay.dispatcher().run(rx));

    tokio::signal::ctrl_c()
        .await
        .context("cannot listen for shutdown signal")?;
    info!("shutting down");
    cancel.cancel();

    for (name, task) in [
        ("inbox poller", poller_task),
        ("update poller", updates_task),
        ("dispatcher", dispatcher_task),
    ] {
        if let Err(err) = task.await {
            error!("{name} task failed: {err}");
        }
    }
    Ok(())
}
