//! Channel and event names

/// Public channel the relay endpoint publishes onto.
pub const PUBLIC_CHAT_CHANNEL: &str = "chat";
/// Event published by the relay endpoint.
pub const RELAY_EVENT: &str = "message";

/// Private channel watched by the admin chat panel.
pub const ADMIN_CHANNEL: &str = "admin.chat";
pub const NEW_MESSAGE_EVENT: &str = "new.message";
pub const USER_ONLINE_EVENT: &str = "user.online";
pub const USER_OFFLINE_EVENT: &str = "user.offline";

/// Private channels require a bearer credential to subscribe.
pub fn is_private(channel: &str) -> bool {
    channel.starts_with("admin.") || channel.starts_with("private-")
}

/// Channel names travel in URL paths, keep them to a safe alphabet.
pub fn is_valid_name(channel: &str) -> bool {
    !channel.is_empty()
        && channel.len() <= 164
        && channel
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '=' | '@' | ','))
}
