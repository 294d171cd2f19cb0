//! Transport backends for inbound chat and notification events.
//!
//! Two acquisition strategies live behind the one [`MessageStream`]
//! interface: a push socket (room chat, notifications) and interval polling
//! (conversation messages). Which one a view gets is decided by
//! configuration, so rendering code never branches on transport. Sending is
//! *not* part of the stream; messages always go out as a plain HTTP POST.
use crate::api::MarketApi;
use crate::config::Chat;
use crate::model::ChatMessage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// Inbound event as seen by a view controller.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Transport (re)established; any degraded indicator can be cleared.
    Connected,
    /// One raw JSON frame from a push socket.
    Frame(serde_json::Value),
    /// Full re-fetch from a poll cycle; replaces the list, never merges.
    Snapshot {
        conversation_id: i64,
        messages: Vec<ChatMessage>,
    },
    /// Transport trouble. Non-fatal: the view stays usable, just stale.
    Degraded(String),
}

#[async_trait]
pub trait MessageStream: Send {
    /// The next inbound event, or None once the stream has shut down.
    async fn next_event(&mut self) -> Option<StreamEvent>;

    /// Tears the transport down. Anything still in flight becomes a no-op.
    fn disconnect(&mut self);
}

/// Reconnect pacing: doubles on each consecutive failure, capped, reset on a
/// successful connect.
#[derive(Debug)]
pub(crate) struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub(crate) fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
        }
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.current = self.base;
    }
}

fn room_endpoint(ws_url: &str, room: &str) -> String {
    format!("{}/ws/chat/{}/", ws_url.trim_end_matches('/'), room)
}

fn notifications_endpoint(ws_url: &str) -> String {
    format!("{}/ws/notifications/", ws_url.trim_end_matches('/'))
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(url: &str) -> Result<WsStream> {
    let (ws, _response) = connect_async(url)
        .await
        .context("failed to reach chat socket")?;
    Ok(ws)
}

/// Push-mode stream over a WebSocket. A background task owns the socket and
/// forwards frames through a channel; the task reconnects with bounded
/// exponential backoff until [`MessageStream::disconnect`] or drop.
pub struct PushStream {
    events: mpsc::Receiver<StreamEvent>,
    task: JoinHandle<()>,
}

impl PushStream {
    pub fn chat_room(chat: &Chat, room: &str) -> Self {
        Self::open(room_endpoint(&chat.ws_url, room), chat)
    }

    pub fn notifications(chat: &Chat) -> Self {
        Self::open(notifications_endpoint(&chat.ws_url), chat)
    }

    fn open(url: String, chat: &Chat) -> Self {
        let backoff = Backoff::new(
            Duration::from_millis(chat.reconnect_base_ms),
            Duration::from_secs(chat.reconnect_max_secs),
        );
        let (tx, rx) = mpsc::channel(64);
        let task = tokio::spawn(run_push_loop(url, tx, backoff));
        Self { events: rx, task }
    }
}

#[async_trait]
impl MessageStream for PushStream {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    fn disconnect(&mut self) {
        self.task.abort();
        self.events.close();
    }
}

impl Drop for PushStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_push_loop(url: String, tx: mpsc::Sender<StreamEvent>, mut backoff: Backoff) {
    loop {
        match connect(&url).await {
            Ok(mut ws) => {
                backoff.reset();
                if tx.send(StreamEvent::Connected).await.is_err() {
                    return;
                }
                loop {
                    match ws.next().await {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<serde_json::Value>(&text) {
                                Ok(value) => {
                                    if tx.send(StreamEvent::Frame(value)).await.is_err() {
                                        return;
                                    }
                                }
                                Err(err) => warn!(?err, "discarding non-JSON socket frame"),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!(?err, "socket read failed");
                            break;
                        }
                    }
                }
                if tx
                    .send(StreamEvent::Degraded(
                        "connection lost; messages may not update in real time".into(),
                    ))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Err(err) => {
                warn!(url = %url, "failed to connect: {err:#}");
                if tx
                    .send(StreamEvent::Degraded(format!(
                        "could not connect to chat server: {err:#}"
                    )))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
        let delay = backoff.next_delay();
        debug!(?delay, "reconnecting chat socket after backoff");
        tokio::time::sleep(delay).await;
    }
}

/// Pull-mode stream: a fixed-interval full re-fetch of the active
/// conversation. Runs only while the stream is held; dropping it (or
/// disconnecting) stops the polling.
pub struct PollStream {
    api: Arc<dyn MarketApi>,
    conversation_id: i64,
    interval: Duration,
    stopped: bool,
}

impl PollStream {
    pub fn new(api: Arc<dyn MarketApi>, conversation_id: i64, interval: Duration) -> Self {
        Self {
            api,
            conversation_id,
            interval,
            stopped: false,
        }
    }
}

#[async_trait]
impl MessageStream for PollStream {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.stopped {
            return None;
        }
        tokio::time::sleep(self.interval).await;
        match self.api.messages(self.conversation_id).await {
            Ok(messages) => Some(StreamEvent::Snapshot {
                conversation_id: self.conversation_id,
                messages,
            }),
            Err(err) => {
                warn!(?err, conversation_id = self.conversation_id, "poll fetch failed");
                Some(StreamEvent::Degraded(format!(
                    "failed to refresh messages: {err}"
                )))
            }
        }
    }

    fn disconnect(&mut self) {
        self.stopped = true;
    }
}

/// Stand-in when push mode is not available in this environment: announces
/// the degradation once, then ends.
pub struct DisabledStream {
    announced: bool,
}

impl DisabledStream {
    pub fn new() -> Self {
        Self { announced: false }
    }
}

impl Default for DisabledStream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStream for DisabledStream {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.announced {
            return None;
        }
        self.announced = true;
        Some(StreamEvent::Degraded(
            "real-time messaging is not available in this environment".into(),
        ))
    }

    fn disconnect(&mut self) {
        self.announced = true;
    }
}

/// Room chat transport per configuration: push when enabled, otherwise the
/// degraded stand-in.
pub fn open_room_stream(chat: &Chat, room: &str) -> Box<dyn MessageStream> {
    if chat.push_enabled && !chat.ws_url.trim().is_empty() {
        Box::new(PushStream::chat_room(chat, room))
    } else {
        Box::new(DisabledStream::new())
    }
}

/// Notification transport per configuration.
pub fn open_notification_stream(chat: &Chat) -> Box<dyn MessageStream> {
    if chat.push_enabled && !chat.ws_url.trim().is_empty() {
        Box::new(PushStream::notifications(chat))
    } else {
        Box::new(DisabledStream::new())
    }
}

/// Conversation messages always poll; a conversation has no room channel.
pub fn open_conversation_stream(
    chat: &Chat,
    api: Arc<dyn MarketApi>,
    conversation_id: i64,
) -> Box<dyn MessageStream> {
    Box::new(PollStream::new(
        api,
        conversation_id,
        Duration::from_millis(chat.poll_interval_ms),
    ))
}
