//! Consistency layer: transactional write operations.
//!
//! Every operation borrows one pooled connection, runs inside one
//! transaction, and performs a locked existence check of its required
//! parent rows before mutating. Missing parents are never fatal: the event
//! is logged and dropped, on the assumption that the upstream source
//! redelivers and that untracked entities are untracked on purpose.

use crate::backfill::{ChannelImportStats, import_channel};
use crate::context::SyncContext;
use crate::gateway::ChatGateway;
use crate::record::{ChannelRecord, MemberRecord, MessageRecord};
use crate::tx;
use chronicle_database::{
    NewChannel, NewMembership, NewUser, RowLock, delete_channel, delete_membership,
    insert_channel, insert_membership_if_absent, insert_message_if_absent, insert_user_if_absent,
    lock_channel, lock_guild, lock_message, set_channel_importing,
};
use chronicle_error::{StoreError, SyncResult};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Channel lifecycle action derived from a read-capability transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelTransition {
    /// Capability gained: start tracking the channel.
    Track,
    /// Capability lost: stop tracking the channel.
    Untrack,
}

impl ChannelTransition {
    /// Derive the action from before/after read-history capability.
    ///
    /// Returns `None` when the capability did not change.
    pub fn from_capability(before: bool, after: bool) -> Option<Self> {
        match (before, after) {
            (false, true) => Some(ChannelTransition::Track),
            (true, false) => Some(ChannelTransition::Untrack),
            _ => None,
        }
    }
}

/// Start tracking a channel and import its entire history.
///
/// The channel row is inserted `importing = true`, the history import runs
/// inside the same transaction, and the flag is flipped once the import
/// commits, so the row either becomes `Available` or never becomes
/// visible. Returns `None` when the parent guild is not tracked.
///
/// # Errors
///
/// Surfaces store failures, a duplicate channel id, and gateway failures;
/// any of these aborts the whole transaction.
#[instrument(skip(ctx, gateway), fields(channel_id = channel.channel_id, guild_id = channel.guild_id))]
pub async fn add_channel(
    ctx: &SyncContext,
    channel: &ChannelRecord,
    gateway: &dyn ChatGateway,
) -> SyncResult<Option<ChannelImportStats>> {
    let mut conn = ctx.conn()?;
    let conn = &mut *conn;
    tx::begin(conn)?;
    match add_channel_in_tx(conn, channel, gateway).await {
        Ok(outcome) => {
            tx::commit(conn)?;
            Ok(outcome)
        }
        Err(e) => {
            tx::rollback(conn);
            Err(e)
        }
    }
}

async fn add_channel_in_tx(
    conn: &mut diesel::pg::PgConnection,
    channel: &ChannelRecord,
    gateway: &dyn ChatGateway,
) -> SyncResult<Option<ChannelImportStats>> {
    if lock_guild(conn, channel.guild_id, RowLock::KeyShare)?.is_none() {
        info!("cannot add channel: guild not tracked");
        return Ok(None);
    }

    insert_channel(
        conn,
        &NewChannel {
            channel_id: channel.channel_id,
            server_id: channel.guild_id,
            importing: true,
        },
    )?;

    let stats = import_channel(conn, channel, gateway).await?;
    set_channel_importing(conn, channel.channel_id, false)?;
    Ok(Some(stats))
}

/// Stop tracking a channel.
///
/// Takes the exclusive lock before the delete. Returns `false` with a log
/// line when the channel was not tracked.
///
/// # Errors
///
/// Surfaces store failures.
#[instrument(skip(ctx), fields(channel_id = channel.channel_id))]
pub async fn remove_channel(ctx: &SyncContext, channel: &ChannelRecord) -> SyncResult<bool> {
    let mut conn = ctx.conn()?;
    let conn = &mut *conn;
    let removed = conn.transaction::<_, StoreError, _>(|conn| {
        if lock_channel(conn, channel.channel_id, RowLock::Update)?.is_none() {
            info!("cannot remove channel: not tracked");
            return Ok(false);
        }
        delete_channel(conn, channel.channel_id)?;
        Ok(true)
    })?;
    Ok(removed)
}

/// Record a user joining a guild.
///
/// The user row is global and may already exist from another guild; both
/// the user and membership inserts are if-absent, and a duplicate
/// membership is terminal success. Returns `false` when the guild is not
/// tracked.
///
/// # Errors
///
/// Surfaces store failures.
#[instrument(skip(ctx), fields(guild_id = member.guild_id, user_id = member.user_id))]
pub async fn add_member(ctx: &SyncContext, member: &MemberRecord) -> SyncResult<bool> {
    let mut conn = ctx.conn()?;
    let conn = &mut *conn;
    let added = conn.transaction::<_, StoreError, _>(|conn| {
        if lock_guild(conn, member.guild_id, RowLock::KeyShare)?.is_none() {
            info!("cannot add member: guild not tracked");
            return Ok(false);
        }
        if !insert_user_if_absent(
            conn,
            &NewUser {
                user_id: member.user_id,
                restricted: false,
            },
        )? {
            debug!("user already known (expected)");
        }
        if !insert_membership_if_absent(
            conn,
            &NewMembership {
                server_id: member.guild_id,
                user_id: member.user_id,
            },
        )? {
            debug!("membership already present");
        }
        Ok(true)
    })?;
    Ok(added)
}

/// Record a user leaving a guild.
///
/// Removes the membership row only; the global user row survives. Deleting
/// zero rows is silently accepted. Returns `false` when the guild is not
/// tracked.
///
/// # Errors
///
/// Surfaces store failures.
#[instrument(skip(ctx), fields(guild_id = member.guild_id, user_id = member.user_id))]
pub async fn remove_member(ctx: &SyncContext, member: &MemberRecord) -> SyncResult<bool> {
    let mut conn = ctx.conn()?;
    let conn = &mut *conn;
    let removed = conn.transaction::<_, StoreError, _>(|conn| {
        if lock_guild(conn, member.guild_id, RowLock::Update)?.is_none() {
            info!("cannot remove member: guild not tracked");
            return Ok(false);
        }
        delete_membership(conn, member.guild_id, member.user_id)?;
        Ok(true)
    })?;
    Ok(removed)
}

/// Store an incoming message.
///
/// Drops ineligible kinds, messages whose guild or channel is not tracked,
/// and duplicate message ids, each with a log line and without surfacing
/// an error. Returns `true` when a row was written.
///
/// # Errors
///
/// Surfaces store failures.
#[instrument(skip(ctx, message), fields(message_id = message.message_id, channel_id = message.channel_id))]
pub async fn insert_message(ctx: &SyncContext, message: &MessageRecord) -> SyncResult<bool> {
    if !message.kind.is_loggable() {
        info!(kind = %message.kind, "dropping message: kind not loggable");
        return Ok(false);
    }

    let mut conn = ctx.conn()?;
    let conn = &mut *conn;
    let stored = conn.transaction::<_, StoreError, _>(|conn| {
        if lock_guild(conn, message.guild_id, RowLock::KeyShare)?.is_none() {
            info!("dropping message: guild not tracked");
            return Ok(false);
        }
        if lock_channel(conn, message.channel_id, RowLock::KeyShare)?.is_none() {
            info!("dropping message: channel not yet added");
            return Ok(false);
        }
        let written = insert_message_if_absent(conn, &message.into())?;
        if !written {
            info!("dropping message: already stored");
        }
        Ok(written)
    })?;
    Ok(stored)
}

/// Apply an edit to a stored message.
///
/// Updates content and edit timestamp only; creation time and attachments
/// are untouched. An edit for a message that was never stored is dropped;
/// edits never create rows. Returns `true` when a row was updated.
///
/// # Errors
///
/// Surfaces store failures.
#[instrument(skip(ctx, content))]
pub async fn update_message(
    ctx: &SyncContext,
    message_id: i64,
    content: &str,
    edited_at: Option<NaiveDateTime>,
) -> SyncResult<bool> {
    let mut conn = ctx.conn()?;
    let conn = &mut *conn;
    let updated = conn.transaction::<_, StoreError, _>(|conn| {
        if lock_message(conn, message_id, RowLock::KeyShare)?.is_none() {
            info!("dropping edit: message not stored");
            return Ok(false);
        }
        chronicle_database::update_message(conn, message_id, content, edited_at)?;
        Ok(true)
    })?;
    Ok(updated)
}

/// Delete a stored message.
///
/// A delete for an unknown id is a logged no-op; delete events are
/// routinely redelivered. Returns `true` when a row was deleted.
///
/// # Errors
///
/// Surfaces store failures.
#[instrument(skip(ctx))]
pub async fn delete_message(ctx: &SyncContext, message_id: i64) -> SyncResult<bool> {
    let mut conn = ctx.conn()?;
    let deleted = chronicle_database::delete_message(&mut conn, message_id)?;
    if deleted == 0 {
        info!("delete ignored: message not stored");
    }
    Ok(deleted > 0)
}

/// Delete a set of stored messages, one at a time.
///
/// Each id gets single-row delete semantics independently: an unknown id or
/// a per-row store failure is logged and the rest of the set still
/// proceeds. Returns the number of rows actually deleted.
///
/// # Errors
///
/// Surfaces pool checkout failure only; per-row failures never abort the
/// batch.
#[instrument(skip(ctx, message_ids), fields(count = message_ids.len()))]
pub async fn bulk_delete_messages(
    ctx: &SyncContext,
    message_ids: &HashSet<i64>,
) -> SyncResult<usize> {
    let mut conn = ctx.conn()?;
    let mut deleted = 0usize;
    for &message_id in message_ids {
        match chronicle_database::delete_message(&mut conn, message_id) {
            Ok(0) => info!(message_id, "bulk delete ignored: message not stored"),
            Ok(_) => {
                debug!(message_id, "bulk deleted message");
                deleted += 1;
            }
            Err(e) => warn!(message_id, error = %e, "bulk delete failed; continuing"),
        }
    }
    Ok(deleted)
}

/// React to a change in read-history capability for a channel.
///
/// The before/after capability bits are derived externally (permission
/// resolution is the transport's concern); a gained capability tracks the
/// channel, a lost one untracks it, and anything else is a no-op.
///
/// # Errors
///
/// Surfaces whatever the underlying add/remove surfaces.
#[instrument(skip(ctx, gateway), fields(channel_id = channel.channel_id))]
pub async fn apply_permission_transition(
    ctx: &SyncContext,
    channel: &ChannelRecord,
    gateway: &dyn ChatGateway,
    before: bool,
    after: bool,
) -> SyncResult<()> {
    match ChannelTransition::from_capability(before, after) {
        Some(ChannelTransition::Track) => {
            info!("read capability gained; tracking channel");
            add_channel(ctx, channel, gateway).await?;
        }
        Some(ChannelTransition::Untrack) => {
            info!("read capability lost; untracking channel");
            remove_channel(ctx, channel).await?;
        }
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ChannelTransition;

    #[test]
    fn capability_transitions() {
        assert_eq!(
            ChannelTransition::from_capability(false, true),
            Some(ChannelTransition::Track)
        );
        assert_eq!(
            ChannelTransition::from_capability(true, false),
            Some(ChannelTransition::Untrack)
        );
        assert_eq!(ChannelTransition::from_capability(true, true), None);
        assert_eq!(ChannelTransition::from_capability(false, false), None);
    }
}
