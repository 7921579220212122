//! Conversions from Serenity models to engine value types.

use crate::record::{ChannelRecord, MessageKind, MessageRecord};
use chronicle_error::{GatewayError, GatewayErrorKind, GatewayResult};
use chrono::{DateTime, NaiveDateTime};
use serenity::model::channel::{GuildChannel, Message, MessageType};
use serenity::model::id::GuildId;
use serenity::model::timestamp::Timestamp;

/// Classify a platform message type.
///
/// Only plain messages and inline replies survive; every other variant
/// collapses to [`MessageKind::Other`] and is dropped downstream.
pub fn message_kind(kind: MessageType) -> MessageKind {
    match kind {
        MessageType::Regular => MessageKind::Regular,
        MessageType::InlineReply => MessageKind::Reply,
        _ => MessageKind::Other,
    }
}

/// Convert a platform timestamp to a naive UTC timestamp.
///
/// # Errors
///
/// Returns an error if the timestamp is outside chrono's representable
/// range.
pub fn timestamp(ts: &Timestamp) -> GatewayResult<NaiveDateTime> {
    DateTime::from_timestamp(ts.unix_timestamp(), 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| {
            GatewayError::new(GatewayErrorKind::InvalidRecord(format!(
                "timestamp out of range: {}",
                ts.unix_timestamp()
            )))
        })
}

/// Convert a guild channel to its engine record.
pub fn channel_record(channel: &GuildChannel) -> ChannelRecord {
    ChannelRecord::new(channel.id.get() as i64, channel.guild_id.get() as i64)
}

/// Convert a message to its engine record.
///
/// The guild id is taken from the caller since gateway payloads carry it
/// separately from the message body.
///
/// # Errors
///
/// Returns an error if a timestamp cannot be represented.
pub fn message_record(msg: &Message, guild_id: GuildId) -> GatewayResult<MessageRecord> {
    Ok(MessageRecord::new(
        msg.id.get() as i64,
        message_kind(msg.kind),
        msg.message_reference
            .as_ref()
            .and_then(|r| r.message_id)
            .map(|id| id.get() as i64),
        msg.content.clone(),
        msg.attachments.iter().map(|a| a.url.clone()).collect(),
        timestamp(&msg.timestamp)?,
        msg.edited_timestamp.as_ref().map(timestamp).transpose()?,
        guild_id.get() as i64,
        msg.channel_id.get() as i64,
        msg.author.id.get() as i64,
    ))
}
