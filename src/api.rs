//! REST client for the marketplace backend.
//!
//! Every state container in the crate depends on the [`MarketApi`] trait, not
//! on the concrete [`MarketClient`], so tests drive the containers with a
//! recording double. Pagination-shape normalization lives here too: the items
//! endpoint answers with either a paginated envelope or a bare array, and
//! nothing downstream ever branches on the shape again.
use crate::model::{
    ChatMessage, CheckoutSession, Conversation, FeedFilters, ItemPage, ListingSummary,
    Notification,
};
use crate::session::Session;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401 from the backend. The stored identity has already been wiped by
    /// the time this is returned; the shell must force re-authentication.
    #[error("not authenticated")]
    Unauthorized,
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    Request(String),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

/// The backend contract this client consumes. No call is ever retried
/// automatically: a retry is always an explicit user re-trigger, so a
/// flaky network cannot double a side effect like a like or a send.
#[async_trait]
pub trait MarketApi: Send + Sync {
    async fn fetch_items(
        &self,
        filters: &FeedFilters,
        page: u32,
        page_size: u32,
    ) -> Result<ItemPage, ApiError>;

    async fn like_item(&self, item_id: i64) -> Result<(), ApiError>;
    async fn unlike_item(&self, item_id: i64) -> Result<(), ApiError>;

    async fn add_wishlist(&self, item_id: i64) -> Result<(), ApiError>;
    async fn remove_wishlist(&self, item_id: i64) -> Result<(), ApiError>;

    async fn follow_user(&self, username: &str) -> Result<(), ApiError>;
    async fn unfollow_user(&self, username: &str) -> Result<(), ApiError>;

    async fn conversations(&self) -> Result<Vec<Conversation>, ApiError>;
    async fn messages(&self, conversation_id: i64) -> Result<Vec<ChatMessage>, ApiError>;
    async fn send_message(
        &self,
        conversation_id: i64,
        content: &str,
    ) -> Result<ChatMessage, ApiError>;

    async fn notifications(&self) -> Result<Vec<Notification>, ApiError>;

    async fn create_checkout_session(&self, item_id: i64) -> Result<CheckoutSession, ApiError>;
}

#[derive(Clone)]
pub struct MarketClient {
    http: Client,
    base_url: Url,
    session: Arc<Session>,
}

impl fmt::Debug for MarketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarketClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl MarketClient {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<Session>) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url).map_err(|err| ApiError::Request(err.to_string()))?;
        Ok(Self::with_base_url(parsed, timeout, session))
    }

    pub fn with_base_url(mut base_url: Url, timeout: Duration, session: Arc<Session>) -> Self {
        // `Url::join` treats a base without a trailing slash as a file.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        let http = Client::builder()
            .user_agent("thriftgram-client/0.1")
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            session,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::Request(err.to_string()))
    }

    fn authorized(&self, rb: RequestBuilder) -> RequestBuilder {
        match self.session.access_token() {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    /// Built GET request, exposed so tests can assert headers and paths
    /// without a live server.
    pub fn build_get(&self, path: &str) -> Result<reqwest::Request, ApiError> {
        let url = self.endpoint(path)?;
        self.authorized(self.http.request(Method::GET, url))
            .build()
            .map_err(|err| ApiError::Request(err.to_string()))
    }

    fn items_url(
        &self,
        filters: &FeedFilters,
        page: u32,
        page_size: u32,
    ) -> Result<Url, ApiError> {
        let mut url = self.endpoint("items/")?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filters.iter() {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("page", &page.to_string());
            pairs.append_pair("page_size", &page_size.to_string());
        }
        Ok(url)
    }

    async fn execute(&self, rb: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let res = self.authorized(rb).send().await?;
        let status = res.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("received 401 from backend; clearing stored identity");
            self.session.clear_identity();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let res = self.execute(self.http.get(url)).await?;
        let body = res.text().await?;
        serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
    }

    /// POST where only the status matters (like/unlike, follow, wishlist add).
    async fn post_unit(&self, path: &str, body: Option<serde_json::Value>) -> Result<(), ApiError> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let mut rb = self.http.post(url);
        if let Some(body) = body {
            rb = rb.json(&body);
        }
        self.execute(rb).await?;
        Ok(())
    }

    async fn delete_unit(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(path)?;
        debug!(%url, "DELETE");
        let mut rb = self.http.delete(url);
        if let Some(body) = body {
            rb = rb.json(&body);
        }
        self.execute(rb).await?;
        Ok(())
    }
}

/// Wire shape of the items endpoint: either a DRF-style paginated envelope
/// or a bare array when pagination is disabled server-side.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ItemsResponse {
    Envelope {
        results: Vec<ListingSummary>,
        #[serde(default)]
        next: Option<String>,
    },
    Bare(Vec<ListingSummary>),
}

/// The single place both shapes collapse into `{items, has_more}`. A bare
/// array carries no "next" signal, so it is terminal; an envelope has more
/// pages exactly when `next` is non-null.
pub fn normalize_items(response: ItemsResponse) -> ItemPage {
    match response {
        ItemsResponse::Envelope { results, next } => ItemPage {
            items: results,
            has_more: next.is_some(),
        },
        ItemsResponse::Bare(items) => ItemPage {
            items,
            has_more: false,
        },
    }
}

#[async_trait]
impl MarketApi for MarketClient {
    #[instrument(skip_all)]
    async fn fetch_items(
        &self,
        filters: &FeedFilters,
        page: u32,
        page_size: u32,
    ) -> Result<ItemPage, ApiError> {
        let url = self.items_url(filters, page, page_size)?;
        debug!(%url, "fetching feed page");
        let res = self.execute(self.http.get(url)).await?;
        let body = res.text().await?;
        let parsed: ItemsResponse =
            serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(normalize_items(parsed))
    }

    async fn like_item(&self, item_id: i64) -> Result<(), ApiError> {
        self.post_unit(&format!("items/{}/like/", item_id), None)
            .await
    }

    async fn unlike_item(&self, item_id: i64) -> Result<(), ApiError> {
        self.post_unit(&format!("items/{}/unlike/", item_id), None)
            .await
    }

    async fn add_wishlist(&self, item_id: i64) -> Result<(), ApiError> {
        self.post_unit("wishlist/", Some(json!({ "item": item_id })))
            .await
    }

    async fn remove_wishlist(&self, item_id: i64) -> Result<(), ApiError> {
        self.delete_unit("wishlist/remove/", Some(json!({ "item": item_id })))
            .await
    }

    async fn follow_user(&self, username: &str) -> Result<(), ApiError> {
        self.post_unit(&format!("users/{}/follow/", username), None)
            .await
    }

    async fn unfollow_user(&self, username: &str) -> Result<(), ApiError> {
        self.delete_unit(&format!("users/{}/unfollow/", username), None)
            .await
    }

    async fn conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.get_json("conversations/").await
    }

    async fn messages(&self, conversation_id: i64) -> Result<Vec<ChatMessage>, ApiError> {
        self.get_json(&format!("conversations/{}/messages/", conversation_id))
            .await
    }

    #[instrument(skip_all)]
    async fn send_message(
        &self,
        conversation_id: i64,
        content: &str,
    ) -> Result<ChatMessage, ApiError> {
        let url = self.endpoint("messages/")?;
        let body = json!({ "conversation": conversation_id, "content": content });
        let res = self.execute(self.http.post(url).json(&body)).await?;
        let text = res.text().await?;
        serde_json::from_str(&text).map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.get_json("notifications/").await
    }

    async fn create_checkout_session(&self, item_id: i64) -> Result<CheckoutSession, ApiError> {
        let url = self.endpoint("create-checkout-session/")?;
        let body = json!({ "item_id": item_id });
        let res = self.execute(self.http.post(url).json(&body)).await?;
        let text = res.text().await?;
        serde_json::from_str(&text).map_err(|err| ApiError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn client_with_token(token: Option<&str>) -> MarketClient {
        let session = Arc::new(Session::new(Arc::new(MemoryStore::new()), "thriftgram"));
        if let Some(token) = token {
            session.set_identity(token, "refresh", "tester");
        }
        MarketClient::new(
            "http://localhost:8000/api",
            Duration::from_secs(90),
            session,
        )
        .unwrap()
    }

    #[test]
    fn build_get_joins_paths_and_sets_bearer() {
        let client = client_with_token(Some("token"));
        let request = client.build_get("items/").unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/api/items/");
        assert_eq!(
            request
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "Bearer token"
        );
    }

    #[test]
    fn build_get_without_token_omits_header() {
        let client = client_with_token(None);
        let request = client.build_get("conversations/").unwrap();
        assert!(request.headers().get("Authorization").is_none());
    }

    #[test]
    fn items_url_carries_filters_and_paging() {
        let client = client_with_token(None);
        let filters = FeedFilters::new().with("search", "denim").with("size", "M");
        let url = client.items_url(&filters, 2, 20).unwrap();
        assert_eq!(
            url.query().unwrap(),
            "search=denim&size=M&page=2&page_size=20"
        );
    }

    fn sample_listing(id: i64) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Vintage tee",
            "price": "12.00",
            "size": "S",
            "condition": "good",
            "images": [{ "id": 1, "image": "https://cdn.example/tee.jpg" }],
            "seller": { "username": "thrifter", "profile_picture": null },
            "likes_count": 3,
            "is_liked": false
        })
    }

    #[test]
    fn normalize_envelope_with_next() {
        let parsed: ItemsResponse = serde_json::from_value(json!({
            "results": [sample_listing(1), sample_listing(2)],
            "next": "http://localhost:8000/api/items/?page=2"
        }))
        .unwrap();
        let page = normalize_items(parsed);
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
    }

    #[test]
    fn normalize_envelope_null_next_is_terminal() {
        let parsed: ItemsResponse = serde_json::from_value(json!({
            "results": [sample_listing(1)],
            "next": null
        }))
        .unwrap();
        assert!(!normalize_items(parsed).has_more);
    }

    #[test]
    fn normalize_envelope_missing_next_is_terminal() {
        let parsed: ItemsResponse = serde_json::from_value(json!({
            "results": [sample_listing(1)]
        }))
        .unwrap();
        assert!(!normalize_items(parsed).has_more);
    }

    #[test]
    fn normalize_bare_array_is_terminal() {
        let parsed: ItemsResponse =
            serde_json::from_value(json!([sample_listing(1), sample_listing(2)])).unwrap();
        let page = normalize_items(parsed);
        assert_eq!(page.items.len(), 2);
        assert!(!page.has_more);
    }

    #[test]
    fn malformed_shape_is_a_decode_error_not_a_panic() {
        let parsed: Result<ItemsResponse, _> =
            serde_json::from_value(json!({ "unexpected": true }));
        assert!(parsed.is_err());
    }
}
