//! Shared test double: a queue-of-responses MarketApi that records calls.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use thriftgram_client::api::{ApiError, MarketApi};
use thriftgram_client::model::{
    ChatMessage, CheckoutSession, Conversation, FeedFilters, ItemPage, ListingSummary,
    Notification, SellerRef,
};

/// Call at the top of a test to see `tracing` output while debugging, e.g.
/// `RUST_LOG=debug cargo test -- --nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchCall {
    pub filters: FeedFilters,
    pub page: u32,
    pub page_size: u32,
}

/// Records every call as a tag like `like:1` or `messages:7`, and answers
/// from per-endpoint queues. An empty queue answers with a benign default, so
/// tests only script the responses they care about.
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<String>>,
    fetch_calls: Mutex<Vec<FetchCall>>,
    pages: Mutex<VecDeque<Result<ItemPage, ApiError>>>,
    unit_results: Mutex<VecDeque<Result<(), ApiError>>>,
    conversation_lists: Mutex<VecDeque<Result<Vec<Conversation>, ApiError>>>,
    message_lists: Mutex<VecDeque<Result<Vec<ChatMessage>, ApiError>>>,
    send_results: Mutex<VecDeque<Result<ChatMessage, ApiError>>>,
    notification_lists: Mutex<VecDeque<Result<Vec<Notification>, ApiError>>>,
    checkout_results: Mutex<VecDeque<Result<CheckoutSession, ApiError>>>,
    sent_counter: Mutex<i64>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_page(&self, result: Result<ItemPage, ApiError>) {
        self.pages.lock().unwrap().push_back(result);
    }

    pub fn queue_unit(&self, result: Result<(), ApiError>) {
        self.unit_results.lock().unwrap().push_back(result);
    }

    pub fn queue_messages(&self, result: Result<Vec<ChatMessage>, ApiError>) {
        self.message_lists.lock().unwrap().push_back(result);
    }

    pub fn queue_send(&self, result: Result<ChatMessage, ApiError>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    pub fn queue_notifications(&self, result: Result<Vec<Notification>, ApiError>) {
        self.notification_lists.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn fetch_calls(&self) -> Vec<FetchCall> {
        self.fetch_calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn pop_unit(&self) -> Result<(), ApiError> {
        self.unit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

#[async_trait]
impl MarketApi for RecordingApi {
    async fn fetch_items(
        &self,
        filters: &FeedFilters,
        page: u32,
        page_size: u32,
    ) -> Result<ItemPage, ApiError> {
        self.record(format!("fetch_items:page={}", page));
        self.fetch_calls.lock().unwrap().push(FetchCall {
            filters: filters.clone(),
            page,
            page_size,
        });
        self.pages.lock().unwrap().pop_front().unwrap_or(Ok(ItemPage {
            items: Vec::new(),
            has_more: false,
        }))
    }

    async fn like_item(&self, item_id: i64) -> Result<(), ApiError> {
        self.record(format!("like:{}", item_id));
        self.pop_unit()
    }

    async fn unlike_item(&self, item_id: i64) -> Result<(), ApiError> {
        self.record(format!("unlike:{}", item_id));
        self.pop_unit()
    }

    async fn add_wishlist(&self, item_id: i64) -> Result<(), ApiError> {
        self.record(format!("wishlist_add:{}", item_id));
        self.pop_unit()
    }

    async fn remove_wishlist(&self, item_id: i64) -> Result<(), ApiError> {
        self.record(format!("wishlist_remove:{}", item_id));
        self.pop_unit()
    }

    async fn follow_user(&self, username: &str) -> Result<(), ApiError> {
        self.record(format!("follow:{}", username));
        self.pop_unit()
    }

    async fn unfollow_user(&self, username: &str) -> Result<(), ApiError> {
        self.record(format!("unfollow:{}", username));
        self.pop_unit()
    }

    async fn conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.record("conversations".into());
        self.conversation_lists
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Vec::new()))
    }

    async fn messages(&self, conversation_id: i64) -> Result<Vec<ChatMessage>, ApiError> {
        self.record(format!("messages:{}", conversation_id));
        self.message_lists
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Vec::new()))
    }

    async fn send_message(
        &self,
        conversation_id: i64,
        content: &str,
    ) -> Result<ChatMessage, ApiError> {
        self.record(format!("send:{}", conversation_id));
        if let Some(result) = self.send_results.lock().unwrap().pop_front() {
            return result;
        }
        // Default: echo the message back the way the backend would.
        let mut counter = self.sent_counter.lock().unwrap();
        *counter += 1;
        Ok(message(1000 + *counter, "me", content))
    }

    async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.record("notifications".into());
        self.notification_lists
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Vec::new()))
    }

    async fn create_checkout_session(&self, item_id: i64) -> Result<CheckoutSession, ApiError> {
        self.record(format!("checkout:{}", item_id));
        self.checkout_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(CheckoutSession {
                url: "https://checkout.example/session".into(),
            }))
    }
}

pub fn listing(id: i64) -> ListingSummary {
    ListingSummary {
        id,
        title: format!("item-{}", id),
        price: "10.00".into(),
        size: "M".into(),
        condition: "good".into(),
        images: Vec::new(),
        seller: SellerRef {
            username: "thrifter".into(),
            profile_picture: None,
        },
        likes_count: 0,
        is_liked: false,
    }
}

pub fn item_page(ids: std::ops::Range<i64>, has_more: bool) -> ItemPage {
    ItemPage {
        items: ids.map(listing).collect(),
        has_more,
    }
}

pub fn message(id: i64, sender: &str, content: &str) -> ChatMessage {
    ChatMessage {
        id,
        sender: SellerRef {
            username: sender.into(),
            profile_picture: None,
        },
        content: content.into(),
        created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        is_read: None,
    }
}

pub fn server_error() -> ApiError {
    ApiError::Status {
        status: 500,
        body: "internal error".into(),
    }
}
