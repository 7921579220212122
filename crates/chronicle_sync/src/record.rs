//! Immutable value types for inbound platform objects.
//!
//! The engine's operations accept these records instead of live platform
//! objects; nothing beyond the fields here is ever consulted. Adapters own
//! the conversion from their transport's models.

use chronicle_database::NewMessage;
use chrono::NaiveDateTime;
use derive_new::new;
use serde::Serialize;

/// Classification of an inbound message.
///
/// Only plain messages and replies are eligible for the store; everything
/// else (pins, joins, boosts, system notices) is dropped at the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, Serialize)]
pub enum MessageKind {
    /// A plain message.
    #[display("regular")]
    Regular,
    /// A reply to another message.
    #[display("reply")]
    Reply,
    /// Any other platform message type.
    #[display("other")]
    Other,
}

impl MessageKind {
    /// Whether messages of this kind are stored.
    pub fn is_loggable(self) -> bool {
        matches!(self, MessageKind::Regular | MessageKind::Reply)
    }
}

/// A guild as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, new, Serialize)]
pub struct GuildRecord {
    /// Platform identifier of the guild.
    pub guild_id: i64,
}

/// A text channel as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, new, Serialize)]
pub struct ChannelRecord {
    /// Platform identifier of the channel.
    pub channel_id: i64,
    /// Guild the channel belongs to.
    pub guild_id: i64,
}

/// A guild membership as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, new, Serialize)]
pub struct MemberRecord {
    /// Guild the user was observed in.
    pub guild_id: i64,
    /// Global identifier of the user.
    pub user_id: i64,
}

/// A channel listing produced during guild import.
///
/// `readable` carries the externally derived read-history capability; the
/// engine never computes permissions itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, new, Serialize)]
pub struct ChannelListing {
    /// The channel.
    pub channel: ChannelRecord,
    /// Whether the caller can read the channel's history.
    pub readable: bool,
}

/// A message as seen by the engine.
#[derive(Debug, Clone, PartialEq, new, Serialize)]
pub struct MessageRecord {
    /// Platform identifier of the message.
    pub message_id: i64,
    /// Message classification.
    pub kind: MessageKind,
    /// Message this one replies to, if any. Not checked against the store.
    pub reply_to_message_id: Option<i64>,
    /// Message body.
    pub content: String,
    /// Attachment URLs, in platform order.
    pub attachments: Vec<String>,
    /// Creation time (UTC).
    pub created_at: NaiveDateTime,
    /// Last edit time (UTC), if edited.
    pub edited_at: Option<NaiveDateTime>,
    /// Guild the message was posted in.
    pub guild_id: i64,
    /// Channel the message was posted in.
    pub channel_id: i64,
    /// Author of the message.
    pub author_id: i64,
}

impl From<&MessageRecord> for NewMessage {
    fn from(record: &MessageRecord) -> Self {
        NewMessage {
            message_id: record.message_id,
            reply_to_message_id: record.reply_to_message_id,
            content: record.content.clone(),
            attachments: record.attachments.clone(),
            created_at: record.created_at,
            edited_at: record.edited_at,
            server_id: record.guild_id,
            channel_id: record.channel_id,
            author_id: record.author_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_message(kind: MessageKind) -> MessageRecord {
        MessageRecord::new(
            42,
            kind,
            Some(7),
            "hello".to_string(),
            vec!["https://cdn.example/one.png".to_string()],
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(12, 30, 0)
                .unwrap(),
            None,
            100,
            200,
            300,
        )
    }

    #[test]
    fn regular_and_reply_are_loggable() {
        assert!(MessageKind::Regular.is_loggable());
        assert!(MessageKind::Reply.is_loggable());
        assert!(!MessageKind::Other.is_loggable());
    }

    #[test]
    fn message_row_conversion_preserves_fields() {
        let record = sample_message(MessageKind::Reply);
        let row = NewMessage::from(&record);
        assert_eq!(row.message_id, 42);
        assert_eq!(row.reply_to_message_id, Some(7));
        assert_eq!(row.content, "hello");
        assert_eq!(row.attachments, vec!["https://cdn.example/one.png"]);
        assert_eq!(row.created_at, record.created_at);
        assert_eq!(row.edited_at, None);
        assert_eq!(row.server_id, 100);
        assert_eq!(row.channel_id, 200);
        assert_eq!(row.author_id, 300);
    }
}
