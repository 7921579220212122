//! Discord-backed implementation of the engine's gateway trait.

use super::convert;
use crate::gateway::{ChatGateway, HistoryStream};
use crate::record::{ChannelListing, ChannelRecord, MemberRecord};
use async_stream::try_stream;
use async_trait::async_trait;
use chronicle_error::{GatewayError, GatewayErrorKind, GatewayResult};
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::channel::{ChannelType, GuildChannel};
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use std::sync::Arc;

/// Messages requested per history page; the platform maximum.
const HISTORY_PAGE: u8 = 100;

/// Members requested per listing page; the platform maximum.
const MEMBER_PAGE: u64 = 1_000;

/// Whether the current user can read the channel and its history.
///
/// Resolved through the cache; an uncached guild or member reads as not
/// readable, which keeps the channel untracked rather than half-imported.
pub(crate) fn can_read_history(cache: &Cache, channel: &GuildChannel) -> bool {
    let Some(guild) = cache.guild(channel.guild_id) else {
        return false;
    };
    let user_id = cache.current_user().id;
    let Some(member) = guild.members.get(&user_id) else {
        return false;
    };
    let permissions = guild.user_permissions_in(channel, member);
    permissions.view_channel() && permissions.read_message_history()
}

fn transport(err: serenity::Error) -> GatewayError {
    GatewayError::new(GatewayErrorKind::Transport(err.to_string()))
}

/// [`ChatGateway`] over the Discord HTTP API.
pub struct SerenityGateway {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl SerenityGateway {
    /// Create a gateway from the client's shared HTTP and cache handles.
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }
}

#[async_trait]
impl ChatGateway for SerenityGateway {
    async fn guild_members(&self, guild_id: i64) -> GatewayResult<Vec<MemberRecord>> {
        let guild = GuildId::new(guild_id as u64);
        let mut records = Vec::new();
        let mut after: Option<UserId> = None;

        loop {
            let page = guild
                .members(&self.http, Some(MEMBER_PAGE), after)
                .await
                .map_err(transport)?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.user.id);
            let full_page = page.len() as u64 == MEMBER_PAGE;
            records.extend(
                page.into_iter()
                    .map(|m| MemberRecord::new(guild_id, m.user.id.get() as i64)),
            );
            if !full_page {
                break;
            }
        }

        Ok(records)
    }

    async fn guild_channels(&self, guild_id: i64) -> GatewayResult<Vec<ChannelListing>> {
        let guild = GuildId::new(guild_id as u64);
        let channels = guild.channels(&self.http).await.map_err(transport)?;
        Ok(channels
            .into_values()
            .filter(|c| c.kind == ChannelType::Text)
            .map(|c| ChannelListing::new(convert::channel_record(&c), can_read_history(&self.cache, &c)))
            .collect())
    }

    fn channel_history<'a>(&'a self, channel: &ChannelRecord) -> HistoryStream<'a> {
        let channel_id = ChannelId::new(channel.channel_id as u64);
        let guild_id = GuildId::new(channel.guild_id as u64);

        Box::pin(try_stream! {
            let mut before: Option<MessageId> = None;
            loop {
                let mut builder = serenity::builder::GetMessages::new().limit(HISTORY_PAGE);
                if let Some(id) = before {
                    builder = builder.before(id);
                }
                let page = channel_id
                    .messages(&self.http, builder)
                    .await
                    .map_err(transport)?;
                let Some(last) = page.last() else {
                    break;
                };
                before = Some(last.id);
                for msg in &page {
                    yield convert::message_record(msg, guild_id)?;
                }
            }
        })
    }
}
