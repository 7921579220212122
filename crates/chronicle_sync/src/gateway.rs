//! Abstraction over the chat platform the engine reads from.

use crate::record::{ChannelListing, ChannelRecord, MemberRecord, MessageRecord};
use async_trait::async_trait;
use chronicle_error::GatewayResult;
use futures::stream::BoxStream;

/// Stream of historical messages for one channel.
///
/// Yield order is whatever the platform hands back; the backfill pipeline
/// does not require oldest-first.
pub type HistoryStream<'a> = BoxStream<'a, GatewayResult<MessageRecord>>;

/// Read surface of the chat platform.
///
/// The engine consumes exactly these three queries: membership, channel
/// listings with the derived read-history capability, and full message
/// history. Event delivery is the transport adapter's concern and arrives
/// through the engine's operations instead.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Every current member of the guild.
    async fn guild_members(&self, guild_id: i64) -> GatewayResult<Vec<MemberRecord>>;

    /// Every text channel of the guild, with read-history capability.
    async fn guild_channels(&self, guild_id: i64) -> GatewayResult<Vec<ChannelListing>>;

    /// The channel's entire message history.
    fn channel_history<'a>(&'a self, channel: &ChannelRecord) -> HistoryStream<'a>;
}
