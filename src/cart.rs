//! Local shopping cart.
//!
//! The cart is not a source of truth (the server-side checkout is), so
//! persistence is best-effort: every mutation is followed synchronously by a
//! write to the store, and write failures are logged and swallowed. Loading a
//! corrupt blob fails open to an empty cart.
use crate::model::CartLine;
use crate::store::KeyValueStore;
use std::sync::Arc;
use tracing::warn;

pub struct CartStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    lines: Vec<CartLine>,
    is_open: bool,
}

impl CartStore {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            store,
            key: format!("{}_cart", namespace),
            lines: Vec::new(),
            is_open: false,
        }
    }

    /// Invoked once at startup. A missing blob means an empty cart; a corrupt
    /// blob is logged and discarded rather than surfaced.
    pub fn load(&mut self) {
        let blob = match self.store.read(&self.key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return,
            Err(err) => {
                warn!(?err, "failed to read persisted cart; starting empty");
                return;
            }
        };
        match serde_json::from_str::<Vec<CartLine>>(&blob) {
            Ok(lines) => self.lines = lines,
            Err(err) => {
                warn!(?err, "failed to parse persisted cart; starting empty");
            }
        }
    }

    /// Appends unconditionally; adding the same item twice yields two lines.
    /// Also opens the cart panel, mirroring the storefront behavior.
    pub fn add_line(&mut self, line: CartLine) {
        self.lines.push(line);
        self.persist();
        self.is_open = true;
    }

    /// Removes every line matching `id`; a miss is a no-op that still
    /// persists the (unchanged) snapshot.
    pub fn remove_line(&mut self, id: i64) {
        self.lines.retain(|line| line.id != id);
        self.persist();
    }

    /// Recomputed on every read so it can never go stale.
    pub fn total(&self) -> f64 {
        self.lines.iter().map(|line| line.unit_price).sum()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Wholesale reset, used after the external checkout completes.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.persist();
    }

    pub fn open(&mut self) {
        self.is_open = true;
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    fn persist(&self) {
        let blob = match serde_json::to_string(&self.lines) {
            Ok(blob) => blob,
            Err(err) => {
                warn!(?err, "failed to serialize cart");
                return;
            }
        };
        if let Err(err) = self.store.write(&self.key, &blob) {
            warn!(?err, "failed to persist cart");
        }
    }
}
