//! Diesel table definitions for the Chronicle schema.
//!
//! The schema deliberately carries no foreign keys: parent existence is
//! soft-checked under row locks by the synchronization engine, and guild
//! teardown deletes dependent rows explicitly rather than via cascade.

diesel::table! {
    servers (server_id) {
        server_id -> Int8,
        importing -> Bool,
    }
}

diesel::table! {
    channels (channel_id) {
        channel_id -> Int8,
        server_id -> Int8,
        importing -> Bool,
    }
}

diesel::table! {
    users (user_id) {
        user_id -> Int8,
        restricted -> Bool,
    }
}

diesel::table! {
    has_users (server_id, user_id) {
        server_id -> Int8,
        user_id -> Int8,
    }
}

diesel::table! {
    messages (message_id) {
        message_id -> Int8,
        reply_to_message_id -> Nullable<Int8>,
        content -> Text,
        attachments -> Array<Text>,
        created_at -> Timestamp,
        edited_at -> Nullable<Timestamp>,
        server_id -> Int8,
        channel_id -> Int8,
        author_id -> Int8,
    }
}

diesel::allow_tables_to_appear_in_same_query!(servers, channels, users, has_users, messages);
