//! Event handling and user interactions for minibot.
//!
//! This module provides functionality for handling chat events:
//! - Routing WHOIS replies straight to waiting probes
//! - Dispatching messages, one at a time, to the command handlers
//! - Parsing command lines

pub mod command;
pub mod dispatch;

use tokio::sync::mpsc;
use tracing::debug;

use crate::{base::types::ChatEvent, runtime::Runtime};

/// Forward events from the connection to the dispatcher.
///
/// WHOIS replies skip the queue: the dispatcher may be blocked waiting on
/// exactly that reply.
pub async fn route_events(runtime: Runtime, mut events: mpsc::Receiver<ChatEvent>, dispatch: mpsc::Sender<ChatEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ChatEvent::IdentityReply { nick } => runtime.probe.resolve(&nick, true),
            ChatEvent::NoSuchNick { nick } => runtime.probe.resolve(&nick, false),
            other => {
                if dispatch.send(other).await.is_err() {
                    debug!("Dispatcher stopped, dropping router.");
                    break;
                }
            }
        }
    }
}

/// Handle queued events strictly in order.
pub async fn run_dispatcher(runtime: Runtime, mut events: mpsc::Receiver<ChatEvent>) {
    while let Some(event) = events.recv().await {
        dispatch::handle_chat_event(event, runtime.clone()).await;
    }
}
