//! Core components, types, and utilities for minibot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Fixed reply and help texts.
//! - Common types and result handling.

pub mod config;
pub mod replies;
pub mod types;
