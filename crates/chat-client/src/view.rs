//! Conversation list presentation helpers

use crate::store::ChatStore;
use chat_common::User;

/// The internal support account never shows up in the conversation list.
const HIDDEN_USER: &str = "admin";

/// One row of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRow {
    pub user_id: String,
    pub name: String,
    pub preview: Option<String>,
    pub unread: u32,
    pub online: bool,
    pub active: bool,
}

fn is_hidden(user: &User) -> bool {
    user.name.trim().eq_ignore_ascii_case(HIDDEN_USER)
}

/// Case-insensitive substring match on name, never yielding `admin`.
pub fn filter_users<'a>(users: &'a [User], term: &str) -> Vec<&'a User> {
    let needle = term.trim().to_lowercase();
    users
        .iter()
        .filter(|u| !is_hidden(u))
        .filter(|u| needle.is_empty() || u.name.to_lowercase().contains(&needle))
        .collect()
}

/// Filtered rows, most recent conversation first; users without messages
/// keep their fetched order at the end.
pub fn conversation_rows(store: &ChatStore, term: &str) -> Vec<ConversationRow> {
    let mut users = filter_users(store.users(), term);
    users.sort_by(|a, b| {
        let a = a.last_message.as_ref().map(|m| m.created_at);
        let b = b.last_message.as_ref().map(|m| m.created_at);
        b.cmp(&a)
    });

    users
        .into_iter()
        .map(|u| ConversationRow {
            user_id: u.id.clone(),
            name: u.name.clone(),
            preview: u.last_message.as_ref().map(|m| m.body.clone()),
            unread: u.unread_count,
            online: store.is_online(&u.id),
            active: store.active_user_id() == Some(u.id.as_str()),
        })
        .collect()
}

/// Whether the send control is enabled for `draft`.
pub fn send_enabled(store: &ChatStore, draft: &str) -> bool {
    store.active_user_id().is_some() && store.can_send(draft)
}

/// Label for the connection indicator.
pub fn connection_label(store: &ChatStore) -> &'static str {
    store.connection_state().label()
}
