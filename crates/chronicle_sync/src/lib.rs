//! Synchronization engine for Chronicle.
//!
//! Keeps the relational store consistent with a live chat platform: an
//! availability state machine gates downstream readers per guild and per
//! channel, a consistency layer applies lifecycle and message events
//! idempotently under row-level locks, and a backfill pipeline bulk-loads a
//! channel's entire history in batched inserts inside one long transaction.
//!
//! # Architecture
//!
//! ## Engine
//! - **status**: per-entity `NotTracked → Importing → Available` queries
//! - **ops**: transactional write operations for incremental events
//! - **backfill**: batched full-history import, guild bootstrap, regeneration
//!
//! ## Seams
//! - **record**: immutable value types the operations accept
//! - **gateway**: the `ChatGateway` read surface of the platform
//! - **context**: explicit pool-handle context passed to every operation
//!
//! ## Transport glue
//! - **discord**: Serenity event handler and gateway adapter, behind the
//!   `discord` feature
//!
//! # Usage
//!
//! ```rust,ignore
//! use chronicle_database::establish_pool;
//! use chronicle_sync::{SyncContext, guild_status};
//!
//! let ctx = SyncContext::new(establish_pool()?);
//! let status = guild_status(&ctx, 1234).await?;
//! ```

mod backfill;
mod context;
mod gateway;
mod ops;
mod record;
mod status;
mod telemetry;
mod tx;

#[cfg(feature = "discord")]
pub mod discord;

pub use backfill::{
    BATCH_SIZE, ChannelImportStats, GuildImportStats, PROGRESS_INTERVAL, add_guild, regenerate,
    remove_guild,
};
pub use context::SyncContext;
pub use gateway::{ChatGateway, HistoryStream};
pub use ops::{
    ChannelTransition, add_channel, add_member, apply_permission_transition,
    bulk_delete_messages, delete_message, insert_message, remove_channel, remove_member,
    update_message,
};
pub use record::{
    ChannelListing, ChannelRecord, GuildRecord, MemberRecord, MessageKind, MessageRecord,
};
pub use status::{TrackingStatus, channel_status, guild_status};
pub use telemetry::init_tracing;
