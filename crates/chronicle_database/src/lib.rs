//! PostgreSQL integration for Chronicle.
//!
//! This crate provides the Diesel schema, row models, connection pooling,
//! and the store-adapter primitives the synchronization engine is built on.
//!
//! # Features
//!
//! - Diesel-based PostgreSQL integration with r2d2 pooling
//! - Row-level lock modes for existence reads (`FOR KEY SHARE` / `FOR UPDATE`)
//! - Idempotent `insert_*_if_absent` write primitives
//! - Embedded schema migrations
//!
//! # Example
//!
//! ```rust,ignore
//! use chronicle_database::{establish_pool, checkout, run_migrations};
//!
//! let pool = establish_pool()?;
//! let mut conn = checkout(&pool)?;
//! run_migrations(&mut conn)?;
//! ```

mod models;
mod pool;
mod store;

// Public module for table definitions
pub mod schema;

pub use models::{
    ChannelRow, GuildRow, MembershipRow, MessageRow, NewChannel, NewGuild, NewMembership,
    NewMessage, NewUser, UserRow,
};
pub use pool::{DEFAULT_POOL_SIZE, PgPool, PgPooledConn, build_pool, checkout, establish_pool};
pub use store::{
    PurgeCounts, RowLock, count_channel_messages, delete_channel, delete_membership,
    delete_message, insert_channel, insert_guild, insert_membership_if_absent,
    insert_message_if_absent, insert_messages, insert_user_if_absent, lock_channel, lock_guild,
    lock_message, purge_guild, set_channel_importing, set_guild_importing, update_message,
};

use chronicle_error::{StoreError, StoreErrorKind, StoreResult};
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

/// Embedded schema migrations, compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Run any pending migrations against the connected database.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub fn run_migrations(conn: &mut PgConnection) -> StoreResult<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::new(StoreErrorKind::Migration(e.to_string())))?;
    if !applied.is_empty() {
        tracing::info!(count = applied.len(), "applied pending migrations");
    }
    Ok(())
}
