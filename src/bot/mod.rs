//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Converts incoming messages and runs them through the pipeline
//! - `callback_handler`: Does the same for inline keyboard callback queries
//! - `pipeline`: Session resolution, dispatch and delivery for one update
//! - `continuation`: Decides what a non-command message means
//! - `router`: Module registry and dispatch
//! - `funnel`: Ordered delivery and error replies
//! - `outbound`: Bot API delivery of directives
//! - `ui_builder`: Creates keyboards and formats replies

pub mod callback_handler;
pub mod continuation;
pub mod funnel;
pub mod message_handler;
pub mod outbound;
pub mod pipeline;
pub mod router;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

pub use outbound::{Outbound, TelegramOutbound};
pub use pipeline::{process_update, App};
pub use router::{Registry, RegistryError};
