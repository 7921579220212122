//! Row and insertable models for the Chronicle tables.

use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Database row for the servers table.
///
/// A tracked guild. `importing` is set while the guild's history is still
/// being bulk-loaded; downstream readers consult it before querying.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = crate::schema::servers)]
#[diesel(primary_key(server_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GuildRow {
    pub server_id: i64,
    pub importing: bool,
}

/// Insertable struct for the servers table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::servers)]
pub struct NewGuild {
    pub server_id: i64,
    pub importing: bool,
}

/// Database row for the channels table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = crate::schema::channels)]
#[diesel(primary_key(channel_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChannelRow {
    pub channel_id: i64,
    pub server_id: i64,
    pub importing: bool,
}

/// Insertable struct for the channels table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::channels)]
pub struct NewChannel {
    pub channel_id: i64,
    pub server_id: i64,
    pub importing: bool,
}

/// Database row for the users table.
///
/// Users are global identities, independent of any guild. `restricted` is an
/// access-control flag consumed by external collaborators.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub user_id: i64,
    pub restricted: bool,
}

/// Insertable struct for the users table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub user_id: i64,
    pub restricted: bool,
}

/// Database row for the has_users membership join table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = crate::schema::has_users)]
#[diesel(primary_key(server_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MembershipRow {
    pub server_id: i64,
    pub user_id: i64,
}

/// Insertable struct for the has_users table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::has_users)]
pub struct NewMembership {
    pub server_id: i64,
    pub user_id: i64,
}

/// Database row for the messages table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = crate::schema::messages)]
#[diesel(primary_key(message_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MessageRow {
    pub message_id: i64,
    pub reply_to_message_id: Option<i64>,
    pub content: String,
    pub attachments: Vec<String>,
    pub created_at: NaiveDateTime,
    pub edited_at: Option<NaiveDateTime>,
    pub server_id: i64,
    pub channel_id: i64,
    pub author_id: i64,
}

/// Insertable struct for the messages table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::messages)]
pub struct NewMessage {
    pub message_id: i64,
    pub reply_to_message_id: Option<i64>,
    pub content: String,
    pub attachments: Vec<String>,
    pub created_at: NaiveDateTime,
    pub edited_at: Option<NaiveDateTime>,
    pub server_id: i64,
    pub channel_id: i64,
    pub author_id: i64,
}
