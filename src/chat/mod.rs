//! View controllers for messaging and notifications.
//!
//! Three surfaces share the [`stream::MessageStream`] transports:
//! conversation messaging (poll snapshots), ad-hoc room chat (push frames),
//! and the notification bell (REST seed plus push frames). Sending always
//! goes through [`MarketApi::send_message`] directly, never over the push
//! socket, and the sent message is appended locally on success without
//! waiting for the next poll or frame.
use crate::api::{ApiError, MarketApi};
use crate::model::{ChatMessage, Conversation, Notification, RoomMessage};
use tracing::{debug, warn};

pub mod stream;

pub use stream::{
    open_conversation_stream, open_notification_stream, open_room_stream, DisabledStream,
    MessageStream, PollStream, PushStream, StreamEvent,
};

/// State behind the messages page: the conversation list and the active
/// conversation's messages.
#[derive(Default)]
pub struct ChatController {
    conversations: Vec<Conversation>,
    active: Option<i64>,
    messages: Vec<ChatMessage>,
    degraded: Option<String>,
}

impl ChatController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active_conversation(&self) -> Option<i64> {
        self.active
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Set while the transport is in trouble; the view stays usable.
    pub fn degraded(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    pub async fn refresh_conversations(&mut self, api: &dyn MarketApi) -> Result<(), ApiError> {
        self.conversations = api.conversations().await?;
        Ok(())
    }

    /// Activates a conversation and fetches its messages. The previous
    /// conversation's messages are cleared up front so a failed fetch cannot
    /// leave another conversation's history on screen.
    pub async fn select_conversation(
        &mut self,
        api: &dyn MarketApi,
        conversation_id: i64,
    ) -> Result<(), ApiError> {
        self.active = Some(conversation_id);
        self.messages.clear();
        self.messages = api.messages(conversation_id).await?;
        Ok(())
    }

    /// Deactivates the conversation; its poll stream should be dropped by
    /// the caller, and any snapshot still in flight will be ignored.
    pub fn clear_selection(&mut self) {
        self.active = None;
        self.messages.clear();
    }

    /// Validates locally, posts, and appends the server's echo immediately.
    /// The conversation list is refreshed best-effort so its preview updates.
    pub async fn send(&mut self, api: &dyn MarketApi, content: &str) -> Result<(), ApiError> {
        let Some(conversation_id) = self.active else {
            return Err(ApiError::InvalidInput("no active conversation"));
        };
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::InvalidInput("message content must be non-empty"));
        }
        let message = api.send_message(conversation_id, content).await?;
        self.messages.push(message);
        if let Err(err) = self.refresh_conversations(api).await {
            warn!(?err, "failed to refresh conversations after send");
        }
        Ok(())
    }

    pub fn apply_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Connected => {
                self.degraded = None;
            }
            StreamEvent::Degraded(reason) => {
                self.degraded = Some(reason);
            }
            StreamEvent::Snapshot {
                conversation_id,
                messages,
            } => {
                if self.active == Some(conversation_id) {
                    // Poll results replace the whole list, never merge. A
                    // successful refresh also means we are no longer stale.
                    self.messages = messages;
                    self.degraded = None;
                } else {
                    debug!(conversation_id, "dropping snapshot for inactive conversation");
                }
            }
            StreamEvent::Frame(_) => {
                debug!("room frame ignored by conversation view");
            }
        }
    }
}

/// State behind an ad-hoc chat room: push frames append in arrival order.
pub struct RoomChat {
    room: String,
    messages: Vec<RoomMessage>,
    degraded: Option<String>,
}

impl RoomChat {
    pub fn new(room: &str) -> Self {
        Self {
            room: room.to_string(),
            messages: Vec::new(),
            degraded: None,
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn messages(&self) -> &[RoomMessage] {
        &self.messages
    }

    pub fn degraded(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    pub fn apply_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Connected => {
                self.degraded = None;
            }
            StreamEvent::Degraded(reason) => {
                self.degraded = Some(reason);
            }
            StreamEvent::Frame(value) => match serde_json::from_value::<RoomMessage>(value) {
                Ok(message) => self.messages.push(message),
                Err(err) => warn!(?err, room = %self.room, "discarding malformed room frame"),
            },
            StreamEvent::Snapshot { .. } => {
                debug!("snapshot ignored by room view");
            }
        }
    }
}

/// State behind the notification bell: REST seed, then push frames prepend
/// and bump the unread badge.
#[derive(Default)]
pub struct NotificationFeed {
    notifications: Vec<Notification>,
    unread: usize,
    degraded: Option<String>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread(&self) -> usize {
        self.unread
    }

    pub fn degraded(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    /// Initial fetch; the unread badge counts the server's `is_read` flags.
    pub async fn refresh(&mut self, api: &dyn MarketApi) -> Result<(), ApiError> {
        let notifications = api.notifications().await?;
        self.unread = notifications.iter().filter(|n| !n.is_read).count();
        self.notifications = notifications;
        Ok(())
    }

    pub fn apply_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Connected => {
                self.degraded = None;
            }
            StreamEvent::Degraded(reason) => {
                self.degraded = Some(reason);
            }
            StreamEvent::Frame(value) => match serde_json::from_value::<Notification>(value) {
                Ok(notification) => {
                    self.notifications.insert(0, notification);
                    self.unread += 1;
                }
                Err(err) => warn!(?err, "discarding malformed notification frame"),
            },
            StreamEvent::Snapshot { .. } => {
                debug!("snapshot ignored by notification feed");
            }
        }
    }

    /// Opening the dropdown marks everything read locally.
    pub fn mark_all_read(&mut self) {
        self.unread = 0;
    }
}
