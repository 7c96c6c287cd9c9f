//! # kinowatch-channels
//!
//! Messaging channel implementations. Telegram is the only platform
//! kinowatch speaks today.

pub mod telegram;

pub use telegram::{TelegramChannel, TelegramConfig, TelegramUpdateStream};
