//! Optimistic mutation engine for the like/wishlist/follow toggles.
//!
//! Each attempt is a tiny state machine, `Idle -> Pending -> {Committed |
//! RolledBack}`: the optimistic state is applied before the network call, the
//! forward endpoint is chosen by the *previous* committed state, and a failure
//! restores that previous state verbatim. A per-entity in-flight set
//! serializes mutations: a second toggle on an entity whose mutation is
//! still pending is rejected outright and issues no network call.
use crate::api::{ApiError, MarketApi};
use crate::model::ListingSummary;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The optimistic state stood; nothing else to do.
    Committed,
    /// The request failed and the previous state was restored.
    RolledBack,
    /// Unknown entity, or a mutation for it was already in flight.
    Rejected,
}

/// Token for one pending attempt. Consumed by [`ToggleSet::complete`], so an
/// attempt cannot be resolved twice.
#[derive(Debug)]
pub struct Ticket<K, S> {
    key: K,
    pub previous: S,
}

/// Committed-state table plus the in-flight guard, generic over the entity
/// key and the toggled state. Every toggle feature in the app runs through
/// this one implementation.
#[derive(Debug)]
pub struct ToggleSet<K, S> {
    states: HashMap<K, S>,
    pending: HashSet<K>,
}

impl<K, S> Default for ToggleSet<K, S> {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
            pending: HashSet::new(),
        }
    }
}

impl<K, S> ToggleSet<K, S>
where
    K: Eq + Hash + Clone + fmt::Debug,
    S: Copy + fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, key: K, state: S) {
        self.states.insert(key, state);
    }

    pub fn state(&self, key: &K) -> Option<S> {
        self.states.get(key).copied()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains(key)
    }

    /// Starts an attempt: captures the previous state, applies `next` to the
    /// visible copy, and registers the key as in flight. Returns None, and
    /// changes nothing, for an unknown key or one already pending.
    pub fn begin(&mut self, key: &K, next: impl FnOnce(S) -> S) -> Option<Ticket<K, S>> {
        if self.pending.contains(key) {
            debug!(?key, "toggle ignored; mutation already in flight");
            return None;
        }
        let Some(slot) = self.states.get_mut(key) else {
            debug!(?key, "toggle requested for unknown entity");
            return None;
        };
        let previous = *slot;
        *slot = next(previous);
        self.pending.insert(key.clone());
        Some(Ticket {
            key: key.clone(),
            previous,
        })
    }

    /// Resolves an attempt: releases the guard, and on failure restores the
    /// captured previous state exactly.
    pub fn complete(&mut self, ticket: Ticket<K, S>, result: Result<(), ApiError>) -> ToggleOutcome {
        self.pending.remove(&ticket.key);
        match result {
            Ok(()) => ToggleOutcome::Committed,
            Err(err) => {
                warn!(?err, key = ?ticket.key, "optimistic mutation failed; rolling back");
                self.states.insert(ticket.key, ticket.previous);
                ToggleOutcome::RolledBack
            }
        }
    }
}

/// Per-listing like state as shown on a feed card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub is_liked: bool,
    pub likes_count: i64,
}

impl LikeState {
    /// The optimistic flip: count moves by one with the flag.
    pub fn toggled(self) -> Self {
        Self {
            is_liked: !self.is_liked,
            likes_count: if self.is_liked {
                self.likes_count - 1
            } else {
                self.likes_count + 1
            },
        }
    }
}

/// Which endpoint a like attempt must call, decided by the pre-toggle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Like,
    Unlike,
}

/// A pending like attempt for shells that drive the network call themselves.
#[derive(Debug)]
pub struct LikeTicket {
    ticket: Ticket<i64, LikeState>,
    pub action: LikeAction,
}

/// Like/unlike across the listings currently on screen.
#[derive(Debug, Default)]
pub struct LikeToggles {
    set: ToggleSet<i64, LikeState>,
}

impl LikeToggles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds committed state from a freshly fetched feed page.
    pub fn seed_page(&mut self, items: &[ListingSummary]) {
        for item in items {
            self.set.seed(
                item.id,
                LikeState {
                    is_liked: item.is_liked,
                    likes_count: item.likes_count,
                },
            );
        }
    }

    pub fn seed(&mut self, item_id: i64, state: LikeState) {
        self.set.seed(item_id, state);
    }

    pub fn state(&self, item_id: i64) -> Option<LikeState> {
        self.set.state(&item_id)
    }

    pub fn is_pending(&self, item_id: i64) -> bool {
        self.set.is_pending(&item_id)
    }

    /// Starts an attempt without issuing the network call: the optimistic
    /// state is applied and the guard taken. Returns None when the listing is
    /// unknown or already has a mutation in flight.
    pub fn begin(&mut self, item_id: i64) -> Option<LikeTicket> {
        let ticket = self.set.begin(&item_id, LikeState::toggled)?;
        let action = if ticket.previous.is_liked {
            LikeAction::Unlike
        } else {
            LikeAction::Like
        };
        Some(LikeTicket { ticket, action })
    }

    pub fn complete(&mut self, ticket: LikeTicket, result: Result<(), ApiError>) -> ToggleOutcome {
        self.set.complete(ticket.ticket, result)
    }

    /// The endpoint is chosen by the pre-toggle state: a listing that *was*
    /// liked gets an unlike call, and vice versa.
    pub async fn toggle(&mut self, api: &dyn MarketApi, item_id: i64) -> ToggleOutcome {
        let Some(ticket) = self.begin(item_id) else {
            return ToggleOutcome::Rejected;
        };
        let result = match ticket.action {
            LikeAction::Like => api.like_item(item_id).await,
            LikeAction::Unlike => api.unlike_item(item_id).await,
        };
        self.complete(ticket, result)
    }
}

/// Wishlist membership per item.
#[derive(Debug, Default)]
pub struct WishlistToggles {
    set: ToggleSet<i64, bool>,
}

impl WishlistToggles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, item_id: i64, wishlisted: bool) {
        self.set.seed(item_id, wishlisted);
    }

    pub fn is_wishlisted(&self, item_id: i64) -> Option<bool> {
        self.set.state(&item_id)
    }

    pub async fn toggle(&mut self, api: &dyn MarketApi, item_id: i64) -> ToggleOutcome {
        let Some(ticket) = self.set.begin(&item_id, |w| !w) else {
            return ToggleOutcome::Rejected;
        };
        let result = if ticket.previous {
            api.remove_wishlist(item_id).await
        } else {
            api.add_wishlist(item_id).await
        };
        self.set.complete(ticket, result)
    }
}

/// Follow state per seller handle.
#[derive(Debug, Default)]
pub struct FollowToggles {
    set: ToggleSet<String, bool>,
}

impl FollowToggles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, username: &str, following: bool) {
        self.set.seed(username.to_string(), following);
    }

    pub fn is_following(&self, username: &str) -> Option<bool> {
        self.set.state(&username.to_string())
    }

    pub async fn toggle(&mut self, api: &dyn MarketApi, username: &str) -> ToggleOutcome {
        let key = username.to_string();
        let Some(ticket) = self.set.begin(&key, |f| !f) else {
            return ToggleOutcome::Rejected;
        };
        let result = if ticket.previous {
            api.unfollow_user(username).await
        } else {
            api.follow_user(username).await
        };
        self.set.complete(ticket, result)
    }
}
