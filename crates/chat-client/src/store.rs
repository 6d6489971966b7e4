//! Chat state store
//!
//! Single-owner state for the admin panel: the user list, the active
//! conversation's transcript, the presence set and the optimistic sends
//! still waiting for the backend. It never performs I/O; the session
//! driver feeds it responses and channel events one at a time.
//!
//! Optimistic sends are tracked in a reconciliation map keyed by the
//! client-generated temporary id. Each entry is resolved exactly once,
//! either swapped for the server message or evicted on failure.

use crate::channel::ConnectionState;
use chat_common::{AdminEvent, Direction, Message, User};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

pub const TEMP_ID_PREFIX: &str = "tmp-";

/// An optimistic send waiting for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub temp_id: String,
    pub user_id: String,
    pub body: String,
}

/// Handle for an in-flight conversation fetch; stale handles are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectTicket {
    pub user_id: String,
    seq: u64,
}

#[derive(Debug)]
pub struct ChatStore {
    users: Vec<User>,
    active: Option<String>,
    transcript: Vec<Message>,
    presence: HashSet<String>,
    pending: HashMap<String, PendingSend>,
    connection: ConnectionState,
    select_seq: u64,
    loading: bool,
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatStore {
    pub fn new() -> Self {
        Self {
            users: Vec::new(),
            active: None,
            transcript: Vec::new(),
            presence: HashSet::new(),
            pending: HashMap::new(),
            connection: ConnectionState::Disconnected,
            select_seq: 0,
            loading: false,
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    pub fn active_user_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn presence(&self) -> &HashSet<String> {
        &self.presence
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.presence.contains(user_id)
    }

    pub fn pending_sends(&self) -> usize {
        self.pending.len()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn set_connection_state(&mut self, state: ConnectionState) {
        if self.connection != state {
            debug!("[Store] connection {} -> {}", self.connection, state);
            self.connection = state;
        }
    }

    /// Replace the user list with a fresh fetch. The active user stays read.
    pub fn load_users(&mut self, users: Vec<User>) {
        self.users = users;
        if let Some(active) = self.active.as_deref() {
            if let Some(user) = self.users.iter_mut().find(|u| u.id == active) {
                user.unread_count = 0;
            }
        }
    }

    /// First half of `select_conversation`: make `user_id` active, mark it
    /// read and clear the transcript until its history arrives.
    pub fn begin_select(&mut self, user_id: &str) -> SelectTicket {
        self.select_seq += 1;
        self.active = Some(user_id.to_string());
        self.transcript.clear();
        self.loading = true;
        if let Some(user) = self.users.iter_mut().find(|u| u.id == user_id) {
            user.unread_count = 0;
        }
        SelectTicket {
            user_id: user_id.to_string(),
            seq: self.select_seq,
        }
    }

    /// Second half of `select_conversation`. Returns `false` when the ticket
    /// was superseded by a later selection and the history was discarded.
    /// A failed fetch leaves the transcript empty.
    pub fn finish_select(&mut self, ticket: SelectTicket, history: Option<Vec<Message>>) -> bool {
        if ticket.seq != self.select_seq {
            debug!("[Store] Discarding stale history for {}", ticket.user_id);
            return false;
        }
        self.loading = false;

        let mut transcript = history.unwrap_or_default();
        // Messages that arrived or were sent while loading stay after the
        // history unless it already contains them.
        let known: HashSet<String> = transcript.iter().map(|m| m.id.clone()).collect();
        for msg in self.transcript.drain(..) {
            if !known.contains(&msg.id) {
                transcript.push(msg);
            }
        }
        self.transcript = transcript;
        true
    }

    /// Route a pushed message to the transcript and the user list.
    pub fn append_incoming(&mut self, message: Message) {
        let Some(counterpart) = message.counterpart_id().map(str::to_string) else {
            warn!("[Store] Dropping message {} without counterpart", message.id);
            return;
        };
        let is_active = self.active.as_deref() == Some(counterpart.as_str());

        let index = match self.users.iter().position(|u| u.id == counterpart) {
            Some(index) => index,
            None => {
                // Unknown sender: keep the message reachable in the list.
                self.users.push(User::new(counterpart.clone(), counterpart.clone()));
                self.users.len() - 1
            }
        };
        let user = &mut self.users[index];
        user.last_message = Some(message.clone());
        if !is_active {
            user.unread_count = user.unread_count.saturating_add(1);
        }

        if is_active {
            self.transcript.push(message);
        }
    }

    /// Whether a send of `body` would be issued right now.
    pub fn can_send(&self, body: &str) -> bool {
        self.connection == ConnectionState::Connected && !body.trim().is_empty()
    }

    /// First half of `send_message`: append an optimistic message and
    /// register it. Returns `None` when sending is not possible, in which
    /// case nothing must be sent.
    pub fn begin_send(&mut self, user_id: &str, body: &str) -> Option<PendingSend> {
        if !self.can_send(body) {
            return None;
        }

        let pending = PendingSend {
            temp_id: format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4()),
            user_id: user_id.to_string(),
            body: body.to_string(),
        };

        if self.active.as_deref() == Some(user_id) {
            self.transcript.push(Message {
                id: pending.temp_id.clone(),
                from_user_id: None,
                to_user_id: Some(user_id.to_string()),
                body: pending.body.clone(),
                created_at: Utc::now(),
                direction: Direction::Outbound,
            });
        }
        self.pending.insert(pending.temp_id.clone(), pending.clone());
        Some(pending)
    }

    /// Swap the optimistic message for the server-confirmed one.
    pub fn confirm_send(&mut self, temp_id: &str, confirmed: Message) -> bool {
        let Some(pending) = self.pending.remove(temp_id) else {
            return false;
        };

        if let Some(user) = self.users.iter_mut().find(|u| u.id == pending.user_id) {
            user.last_message = Some(confirmed.clone());
        }
        if let Some(slot) = self.transcript.iter_mut().find(|m| m.id == temp_id) {
            *slot = confirmed;
        }
        true
    }

    /// Drop the optimistic message of a failed send, silently.
    pub fn fail_send(&mut self, temp_id: &str) -> bool {
        if self.pending.remove(temp_id).is_none() {
            return false;
        }
        self.transcript.retain(|m| m.id != temp_id);
        true
    }

    pub fn set_online(&mut self, user_id: &str, online: bool) {
        if online {
            self.presence.insert(user_id.to_string());
        } else {
            self.presence.remove(user_id);
        }
    }

    pub fn apply_event(&mut self, event: AdminEvent) {
        match event {
            AdminEvent::NewMessage(message) => self.append_incoming(message),
            AdminEvent::UserOnline(user_id) => self.set_online(&user_id, true),
            AdminEvent::UserOffline(user_id) => self.set_online(&user_id, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(id: &str, from: &str, body: &str) -> Message {
        Message {
            id: id.into(),
            from_user_id: Some(from.into()),
            to_user_id: None,
            body: body.into(),
            created_at: Utc::now(),
            direction: Direction::Inbound,
        }
    }

    fn store_with_users() -> ChatStore {
        let mut store = ChatStore::new();
        let mut ana = User::new("u1", "Ana");
        ana.unread_count = 3;
        let mut ben = User::new("u2", "Ben");
        ben.unread_count = 2;
        store.load_users(vec![ana, ben]);
        store.set_connection_state(ConnectionState::Connected);
        store
    }

    #[test]
    fn select_zeroes_only_the_selected_user() {
        let mut store = store_with_users();
        let ticket = store.begin_select("u1");

        assert_eq!(store.user("u1").unwrap().unread_count, 0);
        assert_eq!(store.user("u2").unwrap().unread_count, 2);

        assert!(store.finish_select(ticket, Some(vec![inbound("m1", "u1", "hello")])));
        assert_eq!(store.user("u2").unwrap().unread_count, 2);
        assert_eq!(store.transcript().len(), 1);
        assert!(!store.is_loading());
    }

    #[test]
    fn superseded_history_is_discarded() {
        let mut store = store_with_users();
        let first = store.begin_select("u1");
        let second = store.begin_select("u2");

        assert!(!store.finish_select(first, Some(vec![inbound("m1", "u1", "late")])));
        assert!(store.transcript().is_empty());
        assert!(store.finish_select(second, Some(vec![inbound("m2", "u2", "fresh")])));
        assert_eq!(store.transcript()[0].id, "m2");
    }

    #[test]
    fn incoming_for_other_user_only_bumps_unread() {
        let mut store = store_with_users();
        let ticket = store.begin_select("u1");
        store.finish_select(ticket, Some(vec![]));

        store.append_incoming(inbound("m9", "u2", "ping"));

        assert!(store.transcript().is_empty());
        let ben = store.user("u2").unwrap();
        assert_eq!(ben.unread_count, 3);
        assert_eq!(ben.last_message.as_ref().unwrap().id, "m9");
    }

    #[test]
    fn incoming_for_active_user_is_appended() {
        let mut store = store_with_users();
        let ticket = store.begin_select("u1");
        store.finish_select(ticket, Some(vec![inbound("m1", "u1", "a")]));

        store.append_incoming(inbound("m2", "u1", "b"));

        let ids: Vec<_> = store.transcript().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
        assert_eq!(store.user("u1").unwrap().unread_count, 0);
    }

    #[test]
    fn messages_during_pending_fetch_still_count() {
        let mut store = store_with_users();
        let ticket = store.begin_select("u1");

        store.append_incoming(inbound("m5", "u2", "while loading"));
        store.finish_select(ticket, None);

        assert_eq!(store.user("u2").unwrap().unread_count, 3);
        assert_eq!(store.user("u1").unwrap().unread_count, 0);
    }

    #[test]
    fn unknown_sender_gets_a_placeholder() {
        let mut store = store_with_users();
        store.append_incoming(inbound("m1", "u7", "new customer"));
        let user = store.user("u7").unwrap();
        assert_eq!(user.unread_count, 1);
        assert_eq!(user.name, "u7");
    }

    #[test]
    fn optimistic_send_is_replaced_by_server_message() {
        let mut store = store_with_users();
        let ticket = store.begin_select("u1");
        store.finish_select(ticket, Some(vec![]));

        let pending = store.begin_send("u1", "on its way").unwrap();
        assert!(pending.temp_id.starts_with(TEMP_ID_PREFIX));
        assert_eq!(store.transcript()[0].id, pending.temp_id);

        let mut server = inbound("S", "u1", "on its way");
        server.from_user_id = None;
        server.to_user_id = Some("u1".into());
        server.direction = Direction::Outbound;
        assert!(store.confirm_send(&pending.temp_id, server));

        let transcript = store.transcript();
        assert_eq!(transcript.iter().filter(|m| m.id == "S").count(), 1);
        assert_eq!(transcript.iter().filter(|m| m.id == pending.temp_id).count(), 0);
        assert_eq!(store.pending_sends(), 0);
        assert_eq!(store.user("u1").unwrap().last_message.as_ref().unwrap().id, "S");
    }

    #[test]
    fn failed_send_removes_optimistic_message() {
        let mut store = store_with_users();
        let ticket = store.begin_select("u1");
        store.finish_select(ticket, Some(vec![inbound("m1", "u1", "hi")]));

        let pending = store.begin_send("u1", "sorry").unwrap();
        assert!(store.fail_send(&pending.temp_id));
        assert!(!store.fail_send(&pending.temp_id));

        assert!(store.transcript().iter().all(|m| m.id != pending.temp_id));
        assert_eq!(store.transcript().len(), 1);
    }

    #[test]
    fn no_send_unless_connected() {
        let mut store = store_with_users();
        store.begin_select("u1");
        store.set_connection_state(ConnectionState::Connecting);

        assert!(store.begin_send("u1", "hello").is_none());
        assert!(store.transcript().is_empty());
        assert_eq!(store.pending_sends(), 0);

        store.set_connection_state(ConnectionState::Connected);
        assert!(store.begin_send("u1", "   ").is_none());
    }

    #[test]
    fn pending_message_survives_history_reload() {
        let mut store = store_with_users();
        let ticket = store.begin_select("u1");
        let pending = store.begin_send("u1", "quick reply").unwrap();
        store.finish_select(ticket, Some(vec![inbound("m1", "u1", "hi")]));

        let ids: Vec<_> = store.transcript().iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec!["m1".to_string(), pending.temp_id]);
    }

    #[test]
    fn push_for_active_user_survives_history_load() {
        let mut store = store_with_users();
        let ticket = store.begin_select("u1");

        store.append_incoming(inbound("m2", "u1", "arrived while loading"));
        store.append_incoming(inbound("m1", "u1", "also in history"));
        store.finish_select(
            ticket,
            Some(vec![inbound("m0", "u1", "old"), inbound("m1", "u1", "also in history")]),
        );

        let ids: Vec<_> = store.transcript().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m0", "m1", "m2"]);
        assert_eq!(store.user("u1").unwrap().unread_count, 0);
    }

    #[test]
    fn presence_tracks_online_offline() {
        let mut store = ChatStore::new();
        store.apply_event(AdminEvent::UserOnline("u1".into()));
        store.apply_event(AdminEvent::UserOnline("u2".into()));
        store.apply_event(AdminEvent::UserOffline("u1".into()));
        assert!(!store.is_online("u1"));
        assert!(store.is_online("u2"));
    }
}
