use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shown when a listing carries no images at all.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.jpg";

/// One listing as rendered in the feed grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingSummary {
    pub id: i64,
    pub title: String,
    /// Decimal string as serialized by the backend; kept verbatim for display.
    pub price: String,
    pub size: String,
    pub condition: String,
    #[serde(default)]
    pub images: Vec<ItemImage>,
    pub seller: SellerRef,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub is_liked: bool,
}

impl ListingSummary {
    pub fn primary_image(&self) -> &str {
        self.images
            .first()
            .map(|img| img.image.as_str())
            .unwrap_or(PLACEHOLDER_IMAGE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemImage {
    pub id: i64,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SellerRef {
    pub username: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// One cart line. Duplicates by id are allowed; adding twice yields two lines.
///
/// Serialized field names match the persisted blob the web client wrote
/// (`price`/`image`), so an existing cart survives the migration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartLine {
    pub id: i64,
    pub title: String,
    #[serde(rename = "price")]
    pub unit_price: f64,
    #[serde(rename = "image")]
    pub image_url: String,
    #[serde(default)]
    pub size: Option<String>,
}

/// A normalized page of feed results, regardless of the wire shape the
/// backend chose (paginated envelope or bare array).
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPage {
    pub items: Vec<ListingSummary>,
    pub has_more: bool,
}

/// Query filters applied to the items endpoint. Ordered so the resulting
/// query string is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilters {
    params: BTreeMap<String, String>,
}

impl FeedFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.params.insert(key.to_string(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A message inside a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: i64,
    pub sender: SellerRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: i64,
    pub participants: Vec<SellerRef>,
    #[serde(default)]
    pub item: Option<ItemRef>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub unread_count: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemRef {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastMessage {
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Raw frame from an ad-hoc chat room socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomMessage {
    pub sender: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Message,
    Follow,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Message => "message",
            NotificationKind::Follow => "follow",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

/// Returned by checkout initiation; the shell redirects to `url`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub url: String,
}
