//! # hookbot
//!
//! A Telegram bot that keeps a per-(chat, user) session, so multi-step
//! commands can ask for more input, and routes every command to one of a
//! fixed set of modules.

pub mod bot;
pub mod cache;
pub mod config;
pub mod db;
pub mod directive;
pub mod errors;
pub mod localization;
pub mod modules;
pub mod observability;
pub mod session;
pub mod tokenizer;
pub mod update;
