//! Backfill pipeline: batched full-history ingestion.
//!
//! A channel import consumes the gateway's history stream inside a single
//! long-lived transaction, buffering rows and bulk-inserting a batch at a
//! time. A guild import bootstraps members and every readable channel the
//! same way, and regeneration is the drop-and-rebuild recovery path for a
//! guild stuck `Importing` or drifted from the platform.
//!
//! The backfill holds its target rows' locks for the whole bulk
//! transaction; concurrent incremental events on the same channel block
//! until it commits or aborts.

use crate::context::SyncContext;
use crate::gateway::ChatGateway;
use crate::record::{ChannelRecord, GuildRecord};
use crate::tx;
use chronicle_database::{
    NewChannel, NewGuild, NewMembership, NewMessage, NewUser, RowLock, insert_channel,
    insert_guild, insert_membership_if_absent, insert_messages, insert_user_if_absent, lock_guild,
    purge_guild, set_channel_importing, set_guild_importing,
};
use chronicle_error::{StoreError, SyncResult};
use derive_getters::Getters;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use futures::StreamExt;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Messages accumulated in memory before a bulk insert.
pub const BATCH_SIZE: usize = 1_000;

/// Processed-message interval between progress log lines.
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Outcome of one channel's history import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Getters)]
pub struct ChannelImportStats {
    /// Messages written to the store.
    inserted: u64,
    /// Messages rejected by the kind filter.
    skipped: u64,
    /// Bulk inserts issued, including the remainder flush.
    batches: u64,
}

/// Outcome of one guild's import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Getters)]
pub struct GuildImportStats {
    /// Memberships recorded.
    members: u64,
    /// Channels imported.
    channels: u64,
    /// Channels skipped for lacking read-history capability.
    skipped_channels: u64,
    /// Messages written across all imported channels.
    messages: u64,
}

/// Import a channel's entire history inside its own (possibly nested)
/// transaction.
///
/// Validation failures are counted and skipped; a gateway or store failure
/// rolls the import back and propagates. When the channel row was committed
/// by an earlier bootstrap step it stays `importing = true`, and recovery
/// is the regenerate path.
pub(crate) async fn import_channel(
    conn: &mut PgConnection,
    channel: &ChannelRecord,
    gateway: &dyn ChatGateway,
) -> SyncResult<ChannelImportStats> {
    tx::begin(conn)?;
    match run_channel_import(conn, channel, gateway).await {
        Ok(stats) => {
            tx::commit(conn)?;
            Ok(stats)
        }
        Err(e) => {
            tx::rollback(conn);
            Err(e)
        }
    }
}

async fn run_channel_import(
    conn: &mut PgConnection,
    channel: &ChannelRecord,
    gateway: &dyn ChatGateway,
) -> SyncResult<ChannelImportStats> {
    let mut stats = ChannelImportStats::default();
    let mut batch: Vec<NewMessage> = Vec::with_capacity(BATCH_SIZE);
    let mut stream = gateway.channel_history(channel);

    while let Some(item) = stream.next().await {
        let message = item?;
        if !message.kind.is_loggable() {
            debug!(
                message_id = message.message_id,
                kind = %message.kind,
                "skipping message: kind not loggable"
            );
            stats.skipped += 1;
            continue;
        }

        batch.push(NewMessage::from(&message));
        stats.inserted += 1;

        if stats.inserted % BATCH_SIZE as u64 == 0 {
            insert_messages(conn, &batch)?;
            batch.clear();
            stats.batches += 1;
        }

        if stats.inserted % PROGRESS_INTERVAL == 0 {
            info!(
                channel_id = channel.channel_id,
                fetched = stats.inserted,
                "channel import progress"
            );
        }
    }

    if !batch.is_empty() {
        insert_messages(conn, &batch)?;
        stats.batches += 1;
    }

    info!(
        channel_id = channel.channel_id,
        inserted = stats.inserted,
        skipped = stats.skipped,
        "channel history import complete"
    );
    Ok(stats)
}

/// Record members and import every readable channel of a guild.
///
/// Channels the caller cannot read history for are never tracked: no row is
/// inserted, so they stay `NotTracked` rather than wedging at `Importing`.
async fn import_guild_contents(
    conn: &mut PgConnection,
    guild: &GuildRecord,
    gateway: &dyn ChatGateway,
) -> SyncResult<GuildImportStats> {
    let mut stats = GuildImportStats::default();

    for member in gateway.guild_members(guild.guild_id).await? {
        if !insert_user_if_absent(
            conn,
            &NewUser {
                user_id: member.user_id,
                restricted: false,
            },
        )? {
            debug!(user_id = member.user_id, "user already known (expected)");
        }
        insert_membership_if_absent(
            conn,
            &NewMembership {
                server_id: guild.guild_id,
                user_id: member.user_id,
            },
        )?;
        stats.members += 1;
    }
    info!(
        guild_id = guild.guild_id,
        members = stats.members,
        "guild member import complete"
    );

    for listing in gateway.guild_channels(guild.guild_id).await? {
        if !listing.readable {
            info!(
                channel_id = listing.channel.channel_id,
                "skipping restricted channel"
            );
            stats.skipped_channels += 1;
            continue;
        }

        insert_channel(
            conn,
            &NewChannel {
                channel_id: listing.channel.channel_id,
                server_id: guild.guild_id,
                importing: true,
            },
        )?;
        let channel_stats = import_channel(conn, &listing.channel, gateway).await?;
        set_channel_importing(conn, listing.channel.channel_id, false)?;
        stats.channels += 1;
        stats.messages += channel_stats.inserted;
    }

    Ok(stats)
}

/// Start tracking a guild: members, channels, and full history.
///
/// The guild row is inserted `importing = true` and each bootstrap step
/// commits as it goes; only the per-channel history import is
/// transactional. A failure part-way through therefore leaves the guild
/// `Importing` (the stuck state the status machine documents) and recovery
/// goes through [`regenerate`]. A guild that is already tracked
/// aborts the add with a warning, since re-adding is caller error. Returns
/// `None` on that abort.
///
/// # Errors
///
/// Surfaces store and gateway failures.
#[instrument(skip(ctx, gateway), fields(guild_id = guild.guild_id))]
pub async fn add_guild(
    ctx: &SyncContext,
    guild: &GuildRecord,
    gateway: &dyn ChatGateway,
) -> SyncResult<Option<GuildImportStats>> {
    let started = Instant::now();
    let mut conn = ctx.conn()?;
    let conn = &mut *conn;

    match insert_guild(
        conn,
        &NewGuild {
            server_id: guild.guild_id,
            importing: true,
        },
    ) {
        Ok(()) => {}
        Err(e) if e.is_already_exists() => {
            warn!("guild already tracked; aborting add");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }

    let stats = import_guild_contents(conn, guild, gateway).await?;
    set_guild_importing(conn, guild.guild_id, false)?;
    info!(
        channels = stats.channels,
        messages = stats.messages,
        minutes = started.elapsed().as_secs_f64() / 60.0,
        "guild import complete"
    );
    Ok(Some(stats))
}

/// Stop tracking a guild.
///
/// Explicitly deletes the guild's messages, channels, and memberships
/// before the guild row itself; global user rows survive. Returns `false`
/// with a log line when the guild was not tracked.
///
/// # Errors
///
/// Surfaces store failures.
#[instrument(skip(ctx))]
pub async fn remove_guild(ctx: &SyncContext, guild_id: i64) -> SyncResult<bool> {
    let started = Instant::now();
    let mut conn = ctx.conn()?;
    let conn = &mut *conn;
    let removed = conn.transaction::<_, StoreError, _>(|conn| {
        if lock_guild(conn, guild_id, RowLock::Update)?.is_none() {
            warn!("cannot remove guild: not tracked");
            return Ok(false);
        }
        let counts = purge_guild(conn, guild_id)?;
        info!(
            messages = counts.messages,
            channels = counts.channels,
            memberships = counts.memberships,
            "guild removed"
        );
        Ok(true)
    })?;
    if removed {
        info!(
            minutes = started.elapsed().as_secs_f64() / 60.0,
            "guild removal complete"
        );
    }
    Ok(removed)
}

/// Drop and rebuild each given guild from the platform's current state.
///
/// Per guild, in one transaction: exclusive-lock the row (untracked guilds
/// are skipped with a log), purge every dependent row, re-insert the guild
/// `importing = true`, re-add members, re-import readable channels, flip to
/// `importing = false`. This is the recovery path for a guild stuck
/// `Importing` after a crash, or one that has drifted from the platform.
///
/// Returns the number of guilds rebuilt.
///
/// # Errors
///
/// Surfaces store and gateway failures, aborting the remainder of the run.
/// A duplicate guild id on the re-insert means another writer claimed the
/// guild between purge and insert; it also aborts the entire run.
#[instrument(skip(ctx, guilds, gateway), fields(guilds = guilds.len()))]
pub async fn regenerate(
    ctx: &SyncContext,
    guilds: &[GuildRecord],
    gateway: &dyn ChatGateway,
) -> SyncResult<u64> {
    let mut conn = ctx.conn()?;
    let conn = &mut *conn;
    let mut regenerated = 0u64;

    for guild in guilds {
        info!(guild_id = guild.guild_id, "regenerating guild");
        tx::begin(conn)?;
        match regenerate_guild(conn, guild, gateway).await {
            Ok(true) => {
                tx::commit(conn)?;
                regenerated += 1;
                info!(guild_id = guild.guild_id, "guild regeneration complete");
            }
            Ok(false) => {
                tx::rollback(conn);
            }
            Err(e) => {
                tx::rollback(conn);
                return Err(e);
            }
        }
    }

    info!(regenerated, "regeneration complete");
    Ok(regenerated)
}

async fn regenerate_guild(
    conn: &mut PgConnection,
    guild: &GuildRecord,
    gateway: &dyn ChatGateway,
) -> SyncResult<bool> {
    if lock_guild(conn, guild.guild_id, RowLock::Update)?.is_none() {
        warn!(
            guild_id = guild.guild_id,
            "cannot regenerate guild: not tracked"
        );
        return Ok(false);
    }

    let counts = purge_guild(conn, guild.guild_id)?;
    debug!(
        guild_id = guild.guild_id,
        messages = counts.messages,
        "guild rows purged; re-adding"
    );

    // A duplicate id here aborts the entire regeneration run.
    insert_guild(
        conn,
        &NewGuild {
            server_id: guild.guild_id,
            importing: true,
        },
    )?;

    let stats = import_guild_contents(conn, guild, gateway).await?;
    set_guild_importing(conn, guild.guild_id, false)?;
    info!(
        guild_id = guild.guild_id,
        channels = stats.channels,
        messages = stats.messages,
        "guild re-import complete"
    );
    Ok(true)
}
