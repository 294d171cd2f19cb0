//! Client engine for the Thriftgram secondhand-clothing marketplace.
//!
//! Every page of the UI is a thin view over the state containers and network
//! clients in this crate: the cart, the paginated feed, the optimistic
//! like/wishlist/follow toggles, and the chat/notification streams. The crate
//! owns no rendering; it owns state, I/O, and the rules connecting them.

pub mod api;
pub mod cart;
pub mod chat;
pub mod config;
pub mod feed;
pub mod model;
pub mod optimistic;
pub mod search;
pub mod session;
pub mod store;
