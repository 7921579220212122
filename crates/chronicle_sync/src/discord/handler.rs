//! Serenity event handler routing gateway events into the engine.
//!
//! Thin glue: each callback converts the platform payload into engine value
//! types and calls the corresponding operation. Direct-message traffic is
//! ignored, and operation failures are logged rather than crashing the
//! gateway task; the upstream redelivers, and the engine's writes are safe
//! to repeat.

use super::convert;
use super::gateway::{SerenityGateway, can_read_history};
use crate::context::SyncContext;
use crate::ops;
use crate::record::MemberRecord;
use serenity::async_trait;
use serenity::model::channel::{ChannelType, GuildChannel, Message};
use serenity::model::event::MessageUpdateEvent;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use serenity::model::user::User;
use serenity::prelude::{Context, EventHandler};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Event handler wiring the Discord gateway to the engine.
pub struct ChronicleHandler {
    ctx: SyncContext,
}

impl ChronicleHandler {
    /// Create a handler over the engine context.
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    /// Gateway intents the handler needs.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl EventHandler for ChronicleHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "gateway session ready");
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let Some(guild_id) = msg.guild_id else {
            debug!("ignoring direct message");
            return;
        };
        let record = match convert::message_record(&msg, guild_id) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, message_id = %msg.id, "dropping message event");
                return;
            }
        };
        if let Err(e) = ops::insert_message(&self.ctx, &record).await {
            warn!(error = %e, message_id = record.message_id, "message insert failed");
        }
    }

    async fn message_update(
        &self,
        _ctx: Context,
        _old_if_available: Option<Message>,
        _new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        if event.guild_id.is_none() {
            info!("ignoring edit outside a guild");
            return;
        }
        let Some(content) = event.content else {
            info!(message_id = %event.id, "ignoring embed-only edit");
            return;
        };
        let edited_at = match event.edited_timestamp.as_ref().map(convert::timestamp) {
            Some(Ok(ts)) => Some(ts),
            Some(Err(e)) => {
                warn!(error = %e, message_id = %event.id, "dropping edit event");
                return;
            }
            None => None,
        };
        if let Err(e) =
            ops::update_message(&self.ctx, event.id.get() as i64, &content, edited_at).await
        {
            warn!(error = %e, message_id = %event.id, "message update failed");
        }
    }

    async fn message_delete(
        &self,
        _ctx: Context,
        _channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        if guild_id.is_none() {
            info!("ignoring delete outside a guild");
            return;
        }
        if let Err(e) = ops::delete_message(&self.ctx, deleted_message_id.get() as i64).await {
            warn!(error = %e, message_id = %deleted_message_id, "message delete failed");
        }
    }

    async fn message_delete_bulk(
        &self,
        _ctx: Context,
        _channel_id: ChannelId,
        multiple_deleted_messages_ids: Vec<MessageId>,
        guild_id: Option<GuildId>,
    ) {
        if guild_id.is_none() {
            info!("ignoring bulk delete outside a guild");
            return;
        }
        let ids: HashSet<i64> = multiple_deleted_messages_ids
            .iter()
            .map(|id| id.get() as i64)
            .collect();
        if let Err(e) = ops::bulk_delete_messages(&self.ctx, &ids).await {
            warn!(error = %e, "bulk message delete failed");
        }
    }

    async fn guild_member_addition(&self, _ctx: Context, new_member: Member) {
        let record = MemberRecord::new(
            new_member.guild_id.get() as i64,
            new_member.user.id.get() as i64,
        );
        if let Err(e) = ops::add_member(&self.ctx, &record).await {
            warn!(error = %e, user_id = record.user_id, "member add failed");
        }
    }

    async fn guild_member_removal(
        &self,
        _ctx: Context,
        guild_id: GuildId,
        user: User,
        _member_data_if_available: Option<Member>,
    ) {
        let record = MemberRecord::new(guild_id.get() as i64, user.id.get() as i64);
        if let Err(e) = ops::remove_member(&self.ctx, &record).await {
            warn!(error = %e, user_id = record.user_id, "member remove failed");
        }
    }

    async fn channel_create(&self, ctx: Context, channel: GuildChannel) {
        if channel.kind != ChannelType::Text {
            return;
        }
        let gateway = SerenityGateway::new(ctx.http.clone(), ctx.cache.clone());
        let record = convert::channel_record(&channel);
        if let Err(e) = ops::add_channel(&self.ctx, &record, &gateway).await {
            warn!(error = %e, channel_id = record.channel_id, "channel add failed");
        }
    }

    async fn channel_delete(
        &self,
        _ctx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        if channel.kind != ChannelType::Text {
            return;
        }
        let record = convert::channel_record(&channel);
        if let Err(e) = ops::remove_channel(&self.ctx, &record).await {
            warn!(error = %e, channel_id = record.channel_id, "channel remove failed");
        }
    }

    async fn channel_update(&self, ctx: Context, old: Option<GuildChannel>, new: GuildChannel) {
        if new.kind != ChannelType::Text {
            return;
        }
        let Some(old) = old else {
            debug!(channel_id = %new.id, "channel update without cached previous state");
            return;
        };
        let before = can_read_history(&ctx.cache, &old);
        let after = can_read_history(&ctx.cache, &new);
        let gateway = SerenityGateway::new(ctx.http.clone(), ctx.cache.clone());
        let record = convert::channel_record(&new);
        if let Err(e) =
            ops::apply_permission_transition(&self.ctx, &record, &gateway, before, after).await
        {
            warn!(error = %e, channel_id = record.channel_id, "permission transition failed");
        }
    }
}
