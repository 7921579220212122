//! Store-adapter primitives for the synchronization engine.
//!
//! The engine performs every mutation through these functions so that its
//! two contracts stay visible in the types: locked existence reads take an
//! explicit [`RowLock`] mode, and the idempotent write paths are expressed
//! as `insert_*_if_absent` rather than generic error swallowing.

use crate::models::{
    ChannelRow, GuildRow, NewChannel, NewGuild, NewMembership, NewMessage, NewUser,
};
use crate::schema::{channels, has_users, messages, servers, users};
use chronicle_error::StoreResult;
use chrono::NaiveDateTime;
use diesel::pg::PgConnection;
use diesel::prelude::*;

/// Row-level lock mode for existence reads.
///
/// `KeyShare` maps to `FOR KEY SHARE`: the read stays valid for the rest of
/// the transaction while still admitting concurrent non-key updates.
/// `Update` maps to `FOR UPDATE` and is taken immediately before a
/// structural delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum RowLock {
    /// Shared lock: block concurrent structural change, admit other readers.
    #[display("FOR KEY SHARE")]
    KeyShare,
    /// Exclusive lock: taken before delete.
    #[display("FOR UPDATE")]
    Update,
}

/// Read a guild row under the requested lock, if it exists.
pub fn lock_guild(
    conn: &mut PgConnection,
    server_id: i64,
    lock: RowLock,
) -> StoreResult<Option<GuildRow>> {
    let row = match lock {
        RowLock::KeyShare => servers::table
            .find(server_id)
            .for_key_share()
            .first::<GuildRow>(conn)
            .optional()?,
        RowLock::Update => servers::table
            .find(server_id)
            .for_update()
            .first::<GuildRow>(conn)
            .optional()?,
    };
    Ok(row)
}

/// Read a channel row under the requested lock, if it exists.
pub fn lock_channel(
    conn: &mut PgConnection,
    channel_id: i64,
    lock: RowLock,
) -> StoreResult<Option<ChannelRow>> {
    let row = match lock {
        RowLock::KeyShare => channels::table
            .find(channel_id)
            .for_key_share()
            .first::<ChannelRow>(conn)
            .optional()?,
        RowLock::Update => channels::table
            .find(channel_id)
            .for_update()
            .first::<ChannelRow>(conn)
            .optional()?,
    };
    Ok(row)
}

/// Check a message row exists under the requested lock.
pub fn lock_message(
    conn: &mut PgConnection,
    message_id: i64,
    lock: RowLock,
) -> StoreResult<Option<i64>> {
    let query = messages::table.find(message_id).select(messages::message_id);
    let row = match lock {
        RowLock::KeyShare => query.for_key_share().first::<i64>(conn).optional()?,
        RowLock::Update => query.for_update().first::<i64>(conn).optional()?,
    };
    Ok(row)
}

/// Insert a guild row.
///
/// # Errors
///
/// Surfaces `AlreadyExists` on a duplicate server id; tracking the same
/// guild twice signals caller error and must not be silently absorbed.
pub fn insert_guild(conn: &mut PgConnection, guild: &NewGuild) -> StoreResult<()> {
    diesel::insert_into(servers::table)
        .values(guild)
        .execute(conn)?;
    Ok(())
}

/// Insert a channel row.
///
/// # Errors
///
/// Surfaces `AlreadyExists` on a duplicate channel id.
pub fn insert_channel(conn: &mut PgConnection, channel: &NewChannel) -> StoreResult<()> {
    diesel::insert_into(channels::table)
        .values(channel)
        .execute(conn)?;
    Ok(())
}

/// Insert a user row unless one already exists.
///
/// Users are global and may already be known from another guild; the
/// duplicate case is expected and reported through the return value, not an
/// error. Returns `true` when a row was written.
pub fn insert_user_if_absent(conn: &mut PgConnection, user: &NewUser) -> StoreResult<bool> {
    let written = diesel::insert_into(users::table)
        .values(user)
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(written == 1)
}

/// Insert a membership row unless one already exists.
///
/// A duplicate means the user is already a member of the guild, which is
/// terminal success. Returns `true` when a row was written.
pub fn insert_membership_if_absent(
    conn: &mut PgConnection,
    membership: &NewMembership,
) -> StoreResult<bool> {
    let written = diesel::insert_into(has_users::table)
        .values(membership)
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(written == 1)
}

/// Insert a message row unless one already exists.
///
/// At-least-once delivery from the event source makes duplicate message ids
/// routine; the second delivery is dropped. Returns `true` when a row was
/// written.
pub fn insert_message_if_absent(
    conn: &mut PgConnection,
    message: &NewMessage,
) -> StoreResult<bool> {
    let written = diesel::insert_into(messages::table)
        .values(message)
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(written == 1)
}

/// Bulk-insert a batch of message rows, returning the number written.
pub fn insert_messages(conn: &mut PgConnection, batch: &[NewMessage]) -> StoreResult<usize> {
    let written = diesel::insert_into(messages::table)
        .values(batch)
        .execute(conn)?;
    Ok(written)
}

/// Update a message's content and edit timestamp.
///
/// Leaves every other column untouched. Returns the number of rows updated.
pub fn update_message(
    conn: &mut PgConnection,
    message_id: i64,
    content: &str,
    edited_at: Option<NaiveDateTime>,
) -> StoreResult<usize> {
    let updated = diesel::update(messages::table.find(message_id))
        .set((
            messages::content.eq(content),
            messages::edited_at.eq(edited_at),
        ))
        .execute(conn)?;
    Ok(updated)
}

/// Delete a message by primary key, returning the number of rows deleted.
pub fn delete_message(conn: &mut PgConnection, message_id: i64) -> StoreResult<usize> {
    let deleted = diesel::delete(messages::table.find(message_id)).execute(conn)?;
    Ok(deleted)
}

/// Delete a channel by primary key, returning the number of rows deleted.
pub fn delete_channel(conn: &mut PgConnection, channel_id: i64) -> StoreResult<usize> {
    let deleted = diesel::delete(channels::table.find(channel_id)).execute(conn)?;
    Ok(deleted)
}

/// Delete a membership row, returning the number of rows deleted.
///
/// Zero rows is an accepted outcome; membership removal is best-effort.
pub fn delete_membership(
    conn: &mut PgConnection,
    server_id: i64,
    user_id: i64,
) -> StoreResult<usize> {
    let deleted = diesel::delete(has_users::table.find((server_id, user_id))).execute(conn)?;
    Ok(deleted)
}

/// Counts of rows removed by [`purge_guild`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCounts {
    pub messages: usize,
    pub channels: usize,
    pub memberships: usize,
}

/// Delete a guild row and every row that depends on it being tracked.
///
/// The schema carries no cascade; teardown is explicit. User rows are global
/// and survive.
pub fn purge_guild(conn: &mut PgConnection, server_id: i64) -> StoreResult<PurgeCounts> {
    let messages =
        diesel::delete(messages::table.filter(messages::server_id.eq(server_id))).execute(conn)?;
    let channels =
        diesel::delete(channels::table.filter(channels::server_id.eq(server_id))).execute(conn)?;
    let memberships =
        diesel::delete(has_users::table.filter(has_users::server_id.eq(server_id)))
            .execute(conn)?;
    diesel::delete(servers::table.find(server_id)).execute(conn)?;
    Ok(PurgeCounts {
        messages,
        channels,
        memberships,
    })
}

/// Flip a guild's importing flag.
pub fn set_guild_importing(
    conn: &mut PgConnection,
    server_id: i64,
    importing: bool,
) -> StoreResult<usize> {
    let updated = diesel::update(servers::table.find(server_id))
        .set(servers::importing.eq(importing))
        .execute(conn)?;
    Ok(updated)
}

/// Flip a channel's importing flag.
pub fn set_channel_importing(
    conn: &mut PgConnection,
    channel_id: i64,
    importing: bool,
) -> StoreResult<usize> {
    let updated = diesel::update(channels::table.find(channel_id))
        .set(channels::importing.eq(importing))
        .execute(conn)?;
    Ok(updated)
}

/// Count the stored messages for a channel.
pub fn count_channel_messages(conn: &mut PgConnection, channel_id: i64) -> StoreResult<i64> {
    let count = messages::table
        .filter(messages::channel_id.eq(channel_id))
        .count()
        .get_result::<i64>(conn)?;
    Ok(count)
}
