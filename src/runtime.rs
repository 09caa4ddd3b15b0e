//! Runtime services and shared state for minibot.

use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction,
    service::{
        chat::{ChatClient, irc::IrcChatClient},
        countdown::CountdownScheduler,
        mailbox::MailboxClient,
        presence::PresenceTracker,
        probe::OnlineProbe,
        roster::OperatorRoster,
    },
};

/// Depth of the event queues between the connection, router and dispatcher.
const EVENT_QUEUE_DEPTH: usize = 256;

/// Runtime service context that can be shared across the application.
///
/// This struct holds every service a command handler may touch, plus the
/// configuration and start time. It is designed to be trivially cloneable,
/// allowing it to be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The chat connection.
    pub chat: ChatClient,
    /// Durable offline messages.
    pub mailbox: MailboxClient,
    /// Last activity per nick.
    pub presence: PresenceTracker,
    /// WHOIS-based online check.
    pub probe: OnlineProbe,
    /// Pending `countdown` replies.
    pub countdown: CountdownScheduler,
    /// Channel operators, for `opme`.
    pub roster: OperatorRoster,
    /// When the bot started.
    pub started_at: DateTime<Utc>,
}

impl Runtime {
    /// Create a new runtime instance: open the mailbox, then connect.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the mailbox.
        let mailbox = MailboxClient::sqlite(Path::new(&config.database))?;

        // Initialize the chat client.
        let chat = ChatClient::new(Arc::new(IrcChatClient::connect(&config).await?));

        Ok(Self::with_services(config, chat, mailbox))
    }

    /// Assemble a runtime around existing chat and mailbox clients.
    pub fn with_services(config: Config, chat: ChatClient, mailbox: MailboxClient) -> Self {
        let probe = OnlineProbe::new(chat.clone());

        Self {
            config,
            chat,
            mailbox,
            presence: PresenceTracker::new(),
            probe,
            countdown: CountdownScheduler::new(),
            roster: OperatorRoster::new(),
            started_at: Utc::now(),
        }
    }

    /// Run until the connection drops or Ctrl-C is pressed.
    pub async fn start(&self) -> Void {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (dispatch_tx, dispatch_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);

        let dispatcher = tokio::spawn(interaction::run_dispatcher(self.clone(), dispatch_rx));
        let router = interaction::route_events(self.clone(), events_rx, dispatch_tx);

        let result = tokio::select! {
            result = self.chat.start(events_tx) => result,
            _ = router => Ok(()),
            result = tokio::signal::ctrl_c() => {
                info!("Shutting down ...");
                result.map_err(Into::into)
            }
        };

        self.countdown.shutdown().await;
        dispatcher.abort();

        result
    }
}
