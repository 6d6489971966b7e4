//! Admin chat session
//!
//! Owns the store, the API client and the realtime channel, and applies
//! every input (HTTP response, channel push, user command) to the store
//! one at a time. While a request is in flight, channel events keep being
//! applied so unread counters stay live.

use crate::api::SupportApi;
use crate::channel::{ConnectionState, RealtimeChannel};
use crate::error::Result;
use crate::store::ChatStore;
use crate::view::{self, ConversationRow};
use chat_common::AdminEvent;
use std::future::Future;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub struct ChatSession<A: SupportApi> {
    api: A,
    store: ChatStore,
    channel: RealtimeChannel,
    events: Option<mpsc::UnboundedReceiver<AdminEvent>>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl<A: SupportApi> ChatSession<A> {
    pub fn new(api: A, channel: RealtimeChannel) -> Self {
        let state_rx = channel.watch_state();
        Self {
            api,
            store: ChatStore::new(),
            channel,
            events: None,
            state_rx,
        }
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn rows(&self, term: &str) -> Vec<ConversationRow> {
        view::conversation_rows(&self.store, term)
    }

    /// Open the realtime channel and load the user list.
    pub async fn start(&mut self) -> Result<()> {
        self.events = Some(self.channel.open()?);
        self.sync_connection_state();
        self.load_users().await;
        Ok(())
    }

    /// Refresh the user list; on failure the previous list stays.
    pub async fn load_users(&mut self) {
        let result = drive(
            self.api.fetch_users(),
            &mut self.events,
            &mut self.store,
        )
        .await;

        match result {
            Ok(users) => self.store.load_users(users),
            Err(e) => warn!("[Session] Failed to load users: {}", e),
        }
    }

    /// Make `user_id` the active conversation and load its history.
    pub async fn select_conversation(&mut self, user_id: &str) {
        info!("[Session] Opening conversation {}", user_id);
        let ticket = self.store.begin_select(user_id);

        let result = drive(
            self.api.fetch_conversation(user_id),
            &mut self.events,
            &mut self.store,
        )
        .await;

        let history = match result {
            Ok(messages) => Some(messages),
            Err(e) => {
                warn!("[Session] Failed to load conversation {}: {}", user_id, e);
                None
            }
        };
        self.store.finish_select(ticket, history);
    }

    /// Send `body` to the active conversation. Returns `false` when nothing
    /// was sent: no active user, blank body, or the channel is not connected.
    pub async fn send_message(&mut self, body: &str) -> bool {
        self.sync_connection_state();
        let Some(user_id) = self.store.active_user_id().map(str::to_string) else {
            return false;
        };
        let Some(pending) = self.store.begin_send(&user_id, body) else {
            debug!("[Session] Send refused in state {}", self.store.connection_state());
            return false;
        };

        let result = drive(
            self.api.send_message(&pending.user_id, &pending.body),
            &mut self.events,
            &mut self.store,
        )
        .await;

        match result {
            Ok(confirmed) => {
                self.store.confirm_send(&pending.temp_id, confirmed);
            }
            Err(e) => {
                // Silent for the user: the optimistic entry just disappears.
                warn!("[Session] Send to {} failed: {}", pending.user_id, e);
                self.store.fail_send(&pending.temp_id);
            }
        }
        true
    }

    /// Apply one channel event to the store.
    pub fn handle_event(&mut self, event: AdminEvent) {
        self.sync_connection_state();
        self.store.apply_event(event);
    }

    /// Wait for the next channel event and apply it. Returns `false` once
    /// the channel is gone.
    pub async fn next_event(&mut self) -> bool {
        let Some(events) = self.events.as_mut() else {
            return false;
        };
        let next = events.recv().await;
        match next {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => {
                self.sync_connection_state();
                false
            }
        }
    }

    /// Apply every event already queued without waiting.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let next = self.events.as_mut().and_then(|rx| rx.try_recv().ok());
            let Some(event) = next else {
                return applied;
            };
            self.handle_event(event);
            applied += 1;
        }
    }

    /// Tear down the realtime channel. Queued events are dropped.
    pub async fn close(&mut self) {
        self.events = None;
        self.channel.close().await;
        self.sync_connection_state();
    }

    fn sync_connection_state(&mut self) {
        let state = *self.state_rx.borrow();
        self.store.set_connection_state(state);
    }
}

/// Await `request` while still applying channel events to the store.
async fn drive<T, F>(
    request: F,
    events: &mut Option<mpsc::UnboundedReceiver<AdminEvent>>,
    store: &mut ChatStore,
) -> T
where
    F: Future<Output = T>,
{
    tokio::pin!(request);
    loop {
        let Some(rx) = events.as_mut() else {
            return request.await;
        };
        tokio::select! {
            result = &mut request => return result,
            event = rx.recv() => match event {
                Some(event) => store.apply_event(event),
                None => *events = None,
            },
        }
    }
}
