//! Library root for `minibot`.
//!
//! Minibot is a small IRC bot that sits in one channel and answers
//! `!`-prefixed commands:
//! - `seen` reports when a nick last spoke, and what they said
//! - `message` keeps a note for an offline nick and hands it over when
//!   they next show up
//! - `countdown` replies again after a number of minutes
//! - plus `ping`, `whoami`, `uptime`, `help` and `opme`
//!
//! The connection, the mailbox store and the online check sit behind small
//! services held by a cloneable [`runtime::Runtime`], so the dispatcher can be
//! driven with fakes in tests.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the minibot runtime:
/// - Opens (or creates) the mailbox database
/// - Connects to the IRC server and registers
/// - Starts the main event loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting minibot ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
