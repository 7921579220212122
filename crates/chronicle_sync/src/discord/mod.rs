//! Discord integration for Chronicle.
//!
//! Adapts the live Discord gateway onto the engine using the Serenity
//! library:
//! - **handler**: event handler translating gateway events into engine
//!   operations
//! - **gateway**: `ChatGateway` implementation over the Discord HTTP API,
//!   with permission-derived channel readability
//! - **convert**: Serenity model → engine value type conversions
//! - **client**: client bootstrap and lifecycle
//!
//! Available with the `discord` feature.

mod client;
mod convert;
mod gateway;
mod handler;

pub use client::ChronicleBot;
pub use convert::{channel_record, message_kind, message_record, timestamp};
pub use gateway::SerenityGateway;
pub use handler::ChronicleHandler;
