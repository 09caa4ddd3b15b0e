pub mod irc;
pub mod wire;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::base::types::{ChatEvent, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait is the bot's only view of the network: events come in through
/// [`GenericChatClient::start`], replies go out through the send methods.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the nick the bot is connected as.
    fn nick(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// Every parsed event is pushed into `sink`. Returns when the connection
    /// ends or the sink is closed.
    async fn start(&self, sink: mpsc::Sender<ChatEvent>) -> Void;

    /// Send a line of text to a channel or nick.
    async fn send_message(&self, target: &str, text: &str) -> Void;

    /// Send a raw protocol line, e.g. `WHOIS bob`.
    async fn send_raw(&self, line: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
