//! Paginated feed loader.
//!
//! The loader is a state machine driven by two signals: a filter change
//! (hard reset to page 1) and a near-end-of-list trigger (append the next
//! page). Transitions are synchronous and take effect before any network
//! response arrives; completions are matched against a generation stamp so a
//! response for an abandoned epoch (filters changed, view torn down) is
//! dropped instead of corrupting state.
use crate::api::{ApiError, MarketApi};
use crate::model::{FeedFilters, ItemPage, ListingSummary};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Idle,
    Loading,
    Loaded,
    LoadingMore,
    Failed,
}

impl FeedPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedPhase::Idle => "idle",
            FeedPhase::Loading => "loading",
            FeedPhase::Loaded => "loaded",
            FeedPhase::LoadingMore => "loading_more",
            FeedPhase::Failed => "failed",
        }
    }
}

/// Descriptor for one in-flight page fetch. Handed back to
/// [`FeedLoader::complete`] with the response; a stale descriptor is ignored.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    generation: u64,
    pub page: u32,
    pub page_size: u32,
    pub filters: FeedFilters,
}

pub struct FeedLoader {
    filters: FeedFilters,
    page_size: u32,
    items: Vec<ListingSummary>,
    page: u32,
    phase: FeedPhase,
    exhausted: bool,
    error: Option<String>,
    generation: u64,
}

impl FeedLoader {
    pub fn new(page_size: u32) -> Self {
        Self {
            filters: FeedFilters::new(),
            page_size,
            items: Vec::new(),
            page: 1,
            phase: FeedPhase::Idle,
            exhausted: false,
            error: None,
            generation: 0,
        }
    }

    pub fn items(&self) -> &[ListingSummary] {
        &self.items
    }

    pub fn phase(&self) -> FeedPhase {
        self.phase
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn filters(&self) -> &FeedFilters {
        &self.filters
    }

    /// Unconditional reset: previously loaded items are discarded and the
    /// page counter returns to 1 *before* the new page resolves.
    pub fn set_filters(&mut self, filters: FeedFilters) -> LoadRequest {
        self.filters = filters;
        self.reload()
    }

    /// Restarts from page 1 with the current filters. Also the retry
    /// affordance after a failed initial load.
    pub fn reload(&mut self) -> LoadRequest {
        self.generation += 1;
        self.items.clear();
        self.page = 1;
        self.exhausted = false;
        self.error = None;
        self.phase = FeedPhase::Loading;
        LoadRequest {
            generation: self.generation,
            page: 1,
            page_size: self.page_size,
            filters: self.filters.clone(),
        }
    }

    /// The near-end-of-list trigger. Idempotent: while a load is in flight,
    /// or once the feed is exhausted, the signal is ignored and no request
    /// descriptor is produced.
    pub fn request_more(&mut self) -> Option<LoadRequest> {
        if self.phase != FeedPhase::Loaded || self.exhausted {
            return None;
        }
        self.phase = FeedPhase::LoadingMore;
        Some(LoadRequest {
            generation: self.generation,
            page: self.page + 1,
            page_size: self.page_size,
            filters: self.filters.clone(),
        })
    }

    /// Applies a page response. A completion from a superseded generation is
    /// a no-op: the epoch it belongs to no longer exists.
    pub fn complete(&mut self, request: &LoadRequest, result: Result<ItemPage, ApiError>) {
        if request.generation != self.generation {
            debug!(
                page = request.page,
                "dropping stale page response from a superseded epoch"
            );
            return;
        }
        match self.phase {
            FeedPhase::Loading => match result {
                Ok(page) => {
                    // A zero-item page is authoritative end-of-data, whatever
                    // the envelope's next link claims.
                    self.exhausted = page.items.is_empty() || !page.has_more;
                    self.items = page.items;
                    self.page = 1;
                    self.phase = FeedPhase::Loaded;
                }
                Err(err) => {
                    warn!(?err, "initial feed load failed");
                    self.error = Some(err.to_string());
                    self.phase = FeedPhase::Failed;
                }
            },
            FeedPhase::LoadingMore => match result {
                Ok(page) => {
                    if page.items.is_empty() {
                        self.exhausted = true;
                    } else {
                        self.items.extend(page.items);
                        self.page = request.page;
                        self.exhausted = !page.has_more;
                    }
                    self.phase = FeedPhase::Loaded;
                }
                Err(err) => {
                    // Keep the pages we have; the trigger can fire again.
                    warn!(?err, page = request.page, "load-more failed");
                    self.phase = FeedPhase::Loaded;
                }
            },
            _ => {
                debug!(phase = self.phase.as_str(), "unexpected page completion dropped");
            }
        }
    }

    /// Filter change driven end to end against the API.
    pub async fn apply_filters(&mut self, api: &dyn MarketApi, filters: FeedFilters) {
        let request = self.set_filters(filters);
        let result = api
            .fetch_items(&request.filters, request.page, request.page_size)
            .await;
        self.complete(&request, result);
    }

    /// Full reload with the current filters (user-initiated retry).
    pub async fn retry(&mut self, api: &dyn MarketApi) {
        let request = self.reload();
        let result = api
            .fetch_items(&request.filters, request.page, request.page_size)
            .await;
        self.complete(&request, result);
    }

    /// Load-more trigger driven end to end. Returns false when the signal was
    /// ignored (already loading, exhausted, or nothing loaded yet).
    pub async fn load_more(&mut self, api: &dyn MarketApi) -> bool {
        let Some(request) = self.request_more() else {
            return false;
        };
        let result = api
            .fetch_items(&request.filters, request.page, request.page_size)
            .await;
        self.complete(&request, result);
        true
    }
}
