//! Punisher Bot Library
//!
//! A Telegram bot that keeps interns honest about their daily standups.
//!
//! This crate provides the core functionality for:
//! - Recognising standup reports in chat messages
//! - Storing interns and their standups in MySQL
//! - Sweeping the roster daily and punishing whoever skipped the standup
//! - Handling admin commands sent to the bot

pub mod commands;
pub mod config;
pub mod ingest;
pub mod punish;
pub mod scheduler;
pub mod standup;
pub mod storage;
pub mod telegram;

#[cfg(test)]
mod testing;
