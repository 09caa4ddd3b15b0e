//! Services the command dispatcher depends on.
//!
//! This module contains:
//! - The chat connection (an IRC client behind a generic trait).
//! - The durable offline mailbox (SQLite).
//! - In-memory presence and operator tracking.
//! - The WHOIS online probe and the countdown scheduler.
//!
//! Services with a network or storage backend define a generic trait and a
//! concrete implementation, allowing for extensibility and easy testing.

pub mod chat;
pub mod countdown;
pub mod mailbox;
pub mod presence;
pub mod probe;
pub mod roster;
