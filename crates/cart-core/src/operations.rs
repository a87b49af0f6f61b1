//! # Cart Operations
//!
//! The orchestrator behind every commerce flow. It owns the in-memory
//! [`CartStore`], runs raw items through the [`ItemNormalizer`], and keeps
//! the persisted record in step through a single background writer.
//!
//! ## Lifecycle
//! ```text
//!   new() ──► init() ──► [ Idle ──load()──► Loading ──► Idle ] ──► dispose()
//!                │
//!                └── spawns the writer task
//! ```
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller            state lock (sync)                 writer task       │
//! │  ──────            ─────────────────                 ───────────       │
//! │  add_to_cart ────► normalize, merge, bump gen ─┐                       │
//! │                    publish new snapshot        │                       │
//! │                                                └─ notify ──► drain:    │
//! │                                                              read gen  │
//! │                                                              + LIVE    │
//! │                                                              snapshot  │
//! │                                                              set/remove│
//! │                                                              mark gen  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations apply under one lock, so nobody sees a half-applied change.
//! Only the writer task touches the adapter after load, one call at a time,
//! and it always writes the snapshot that is current when the write starts.
//! Any number of mutations during a slow write collapse into one follow-up
//! write of the latest state. A failed or timed-out write is logged and
//! never rolls back memory.

use crate::aggregate;
use crate::config::CartConfig;
use crate::entry::{CartEntry, Institution, ItemKind, Provider};
use crate::error::{PersistenceError, PersistenceResult, ValidationError, ValidationResult};
use crate::normalize::{ItemNormalizer, RawDrug, RawItem, RawPackage, RawService};
use crate::persistence::{decode_entries, encode_entries, BoxedPersistenceAdapter};
use crate::price::{Currency, Price};
use crate::store::CartStore;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable view of the cart at one point in time.
#[derive(Debug, Clone)]
pub struct CartSnapshot {
    /// Entries in insertion order
    pub cart_items: Arc<[CartEntry]>,
    /// A load is in progress
    pub loading: bool,
    /// Number of distinct entries
    pub item_count: usize,
    /// Σ unit price × quantity over `cart_items`
    pub total_price: Price,
}

impl CartSnapshot {
    fn new(cart_items: Arc<[CartEntry]>, loading: bool) -> Self {
        let item_count = cart_items.len();
        let total_price = aggregate::total_price(&cart_items);
        Self {
            cart_items,
            loading,
            item_count,
            total_price,
        }
    }

    /// Σ quantity
    pub fn total_items(&self) -> u64 {
        aggregate::total_items(&self.cart_items)
    }

    pub fn is_empty(&self) -> bool {
        self.cart_items.is_empty()
    }
}

/// Load state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
}

// =============================================================================
// Shared State
// =============================================================================

/// What the next persistence call must do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PersistAction {
    Write,
    Remove,
}

#[derive(Debug)]
struct CartState {
    store: CartStore,
    load_state: LoadState,
    /// At least one load has finished
    loaded: bool,
    /// Writer task is running
    writer_running: bool,
    /// Bumped by every mutation that changes the cart
    generation: u64,
    /// Action requested by the latest mutation
    pending: PersistAction,
    /// The cart was cleared while a load was outstanding
    discard_persisted: bool,
}

enum WriteJob {
    Write(Arc<[CartEntry]>),
    Remove,
}

struct Shared {
    adapter: BoxedPersistenceAdapter,
    config: CartConfig,
    state: Mutex<CartState>,
    snapshot_tx: watch::Sender<CartSnapshot>,
    /// Last generation the writer has settled (written, removed or given up on)
    settled_tx: watch::Sender<u64>,
    wake: Notify,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &CartState) {
        self.snapshot_tx.send_replace(CartSnapshot::new(
            state.store.get_all(),
            state.load_state == LoadState::Loading,
        ));
    }

    /// Record a change; must be called with the lock held
    fn mark_dirty(&self, state: &mut CartState, action: PersistAction) {
        state.generation += 1;
        state.pending = action;
        self.publish(state);
    }

    async fn with_timeout<T, F>(
        &self,
        operation: &'static str,
        timeout: Duration,
        fut: F,
    ) -> PersistenceResult<T>
    where
        F: Future<Output = PersistenceResult<T>>,
    {
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(PersistenceError::Timeout {
                operation,
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    async fn persist(&self, job: WriteJob) -> PersistenceResult<()> {
        let key = self.config.storage_key.as_str();
        match job {
            WriteJob::Write(entries) => {
                let body = encode_entries(&entries)?;
                self.with_timeout("write", self.config.write_timeout(), self.adapter.set(key, &body))
                    .await
            }
            WriteJob::Remove => {
                self.with_timeout("remove", self.config.write_timeout(), self.adapter.remove(key))
                    .await
            }
        }
    }

    /// Write until the persisted generation catches up with memory.
    async fn drain(&self) {
        loop {
            let (generation, job) = {
                let state = self.lock_state();
                if !state.loaded || state.generation == *self.settled_tx.borrow() {
                    return;
                }
                let job = match state.pending {
                    PersistAction::Write => WriteJob::Write(state.store.get_all()),
                    PersistAction::Remove => WriteJob::Remove,
                };
                (state.generation, job)
            };

            match self.persist(job).await {
                Ok(()) => debug!(generation, adapter = self.adapter.adapter_name(), "Cart persisted"),
                Err(e) => warn!(
                    generation,
                    adapter = self.adapter.adapter_name(),
                    "Failed to persist cart: {}",
                    e
                ),
            }

            self.settled_tx.send_replace(generation);
        }
    }

    async fn read_persisted(&self) -> Vec<CartEntry> {
        let key = self.config.storage_key.as_str();
        let raw = match self
            .with_timeout("read", self.config.read_timeout(), self.adapter.get(key))
            .await
        {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "No persisted cart");
                return Vec::new();
            }
            Err(e) => {
                warn!(key, "Failed to read persisted cart, starting empty: {}", e);
                return Vec::new();
            }
        };

        match decode_entries(&raw) {
            Ok(entries) => {
                let total = entries.len();
                let kept: Vec<CartEntry> =
                    entries.into_iter().filter(CartEntry::is_well_formed).collect();
                if kept.len() != total {
                    warn!(key, dropped = total - kept.len(), "Dropped invalid persisted entries");
                }
                kept
            }
            Err(e) => {
                warn!(key, "Persisted cart is malformed, starting empty: {}", e);
                Vec::new()
            }
        }
    }
}

async fn run_writer(shared: Arc<Shared>) {
    loop {
        shared.wake.notified().await;
        shared.drain().await;

        let running = shared.lock_state().writer_running;
        if !running {
            break;
        }
    }
    debug!("Cart writer stopped");
}

// =============================================================================
// Cart Operations
// =============================================================================

/// The cart engine.
///
/// Construct one per session, call [`init`](Self::init), share it by
/// reference (or `Arc`), and [`dispose`](Self::dispose) it on shutdown.
pub struct CartOperations {
    shared: Arc<Shared>,
    normalizer: ItemNormalizer,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for CartOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartOperations")
            .field("adapter", &self.shared.adapter.adapter_name())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl CartOperations {
    /// Create an empty, not yet loaded cart
    pub fn new(adapter: BoxedPersistenceAdapter, config: CartConfig) -> Self {
        let store = CartStore::new();
        let (snapshot_tx, _) = watch::channel(CartSnapshot::new(store.get_all(), false));
        let (settled_tx, _) = watch::channel(0);

        Self {
            normalizer: ItemNormalizer::new(config.currency),
            shared: Arc::new(Shared {
                adapter,
                config,
                state: Mutex::new(CartState {
                    store,
                    load_state: LoadState::Idle,
                    loaded: false,
                    writer_running: false,
                    generation: 0,
                    pending: PersistAction::Write,
                    discard_persisted: false,
                }),
                snapshot_tx,
                settled_tx,
                wake: Notify::new(),
            }),
            writer: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CartConfig {
        &self.shared.config
    }

    pub fn currency(&self) -> Currency {
        self.shared.config.currency
    }

    /// Start the writer and load the persisted cart.
    ///
    /// Calling it again is harmless.
    pub async fn init(&self) {
        {
            let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
            if writer.is_none() {
                self.shared.lock_state().writer_running = true;
                *writer = Some(tokio::spawn(run_writer(Arc::clone(&self.shared))));
                info!(
                    adapter = self.shared.adapter.adapter_name(),
                    key = %self.shared.config.storage_key,
                    "Cart writer started"
                );
            }
        }
        self.load().await;
    }

    /// Flush pending writes and stop the writer.
    pub async fn dispose(&self) {
        self.flush().await;

        let handle = self
            .writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.shared.lock_state().writer_running = false;
        self.shared.wake.notify_one();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Cart writer terminated abnormally: {}", e);
            }
        }
        info!("Cart disposed");
    }

    /// Read the persisted record into memory.
    ///
    /// A missing key, a read failure or malformed JSON all give an empty
    /// cart. Entries added before the first load completes are kept: they
    /// are merged over the persisted ones by key and written back. A
    /// `clear_cart` issued while the load is outstanding discards the
    /// persisted entries as well.
    #[instrument(skip(self), fields(key = %self.shared.config.storage_key))]
    pub async fn load(&self) {
        let reloading = {
            let mut state = self.shared.lock_state();
            state.load_state = LoadState::Loading;
            self.shared.publish(&state);
            state.loaded
        };

        // Let in-flight writes land so a reload doesn't read stale data
        if reloading {
            self.flush().await;
        }

        let persisted = self.shared.read_persisted().await;

        {
            let mut state = self.shared.lock_state();
            let local: Vec<CartEntry> = state.store.get_all().to_vec();
            let had_local = !local.is_empty();

            // A clear issued before the record arrived empties it too
            let mut merged = if std::mem::take(&mut state.discard_persisted) {
                Vec::new()
            } else {
                persisted
            };
            merged.extend(local);
            state.store.replace_all(merged);
            state.load_state = LoadState::Idle;
            state.loaded = true;

            let unsettled = state.generation != *self.shared.settled_tx.borrow();
            if had_local || unsettled {
                let action = if state.store.is_empty() {
                    PersistAction::Remove
                } else {
                    PersistAction::Write
                };
                self.shared.mark_dirty(&mut state, action);
            } else {
                self.shared.publish(&state);
            }
            info!(entries = state.store.len(), "Cart loaded");
        }

        self.shared.wake.notify_one();
    }

    /// Wait until the persisted record reflects the latest mutation.
    ///
    /// Returns immediately when nothing can be written (not loaded, or
    /// the writer is not running).
    pub async fn flush(&self) {
        let target = {
            let state = self.shared.lock_state();
            if !state.loaded || !state.writer_running {
                return;
            }
            state.generation
        };

        self.shared.wake.notify_one();
        let mut settled = self.shared.settled_tx.subscribe();
        // The sender lives in `shared`, so this cannot observe a closed channel.
        let _ = settled.wait_for(|g| *g >= target).await;
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Add `quantity` of `raw`. An existing entry with the same key has its
    /// quantity increased and keeps its original unit price.
    ///
    /// On error nothing changed.
    pub fn add(&self, raw: &RawItem, quantity: u32) -> ValidationResult<CartEntry> {
        if quantity == 0 {
            return Err(ValidationError::InvalidQuantity { quantity: 0 });
        }
        let candidate = self.normalizer.normalize(raw)?;

        let entry = {
            let mut state = self.shared.lock_state();
            let entry = match state.store.find_by_key(candidate.key()) {
                Some(existing) => {
                    existing.with_quantity(existing.quantity().saturating_add(quantity))
                }
                None => candidate.with_quantity(quantity),
            };
            state.store.upsert(entry.clone());
            self.shared.mark_dirty(&mut state, PersistAction::Write);
            entry
        };
        self.shared.wake.notify_one();

        debug!(key = entry.key(), kind = %entry.kind(), quantity = entry.quantity(), "Added to cart");
        Ok(entry)
    }

    /// Add one unit of any raw item
    pub fn add_to_cart(&self, item: impl Into<RawItem>) -> ValidationResult<CartEntry> {
        self.add(&item.into(), 1)
    }

    pub fn add_drug_to_cart(&self, drug: RawDrug) -> ValidationResult<CartEntry> {
        self.add(&RawItem::Drug(drug), 1)
    }

    /// The same package from two institutions is two entries
    pub fn add_package_to_cart(
        &self,
        package: RawPackage,
        institution: Institution,
    ) -> ValidationResult<CartEntry> {
        self.add(&RawItem::Package(package.with_institution(institution)), 1)
    }

    pub fn add_service_to_cart(
        &self,
        service: RawService,
        provider: Provider,
    ) -> ValidationResult<CartEntry> {
        self.add(&RawItem::Service(service.with_provider(provider)), 1)
    }

    /// Remove by key. Removing an absent key is a no-op.
    ///
    /// Returns whether an entry was removed.
    pub fn remove_from_cart(&self, key: &str) -> bool {
        let removed = {
            let mut state = self.shared.lock_state();
            let removed = state.store.remove(key).is_some();
            if removed {
                self.shared.mark_dirty(&mut state, PersistAction::Write);
            }
            removed
        };

        if removed {
            self.shared.wake.notify_one();
            debug!(key, "Removed from cart");
        }
        removed
    }

    /// Set the quantity of `key` to `quantity`.
    ///
    /// `quantity <= 0` removes the entry. An absent key is a no-op.
    /// Returns the updated entry, `None` when removed or absent.
    pub fn update_quantity(&self, key: &str, quantity: i64) -> Option<CartEntry> {
        if quantity <= 0 {
            self.remove_from_cart(key);
            return None;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        let updated = {
            let mut state = self.shared.lock_state();
            let updated = state.store.find_by_key(key)?.with_quantity(quantity);
            state.store.upsert(updated.clone());
            self.shared.mark_dirty(&mut state, PersistAction::Write);
            updated
        };
        self.shared.wake.notify_one();

        debug!(key, quantity, "Updated quantity");
        Some(updated)
    }

    /// Empty the cart and delete the persisted record
    pub fn clear_cart(&self) {
        {
            let mut state = self.shared.lock_state();
            state.store.clear();
            if !state.loaded || state.load_state == LoadState::Loading {
                state.discard_persisted = true;
            }
            self.shared.mark_dirty(&mut state, PersistAction::Remove);
        }
        self.shared.wake.notify_one();
        info!("Cart cleared");
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Current snapshot
    pub fn snapshot(&self) -> CartSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Receiver that observes every new snapshot
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn cart_items(&self) -> Arc<[CartEntry]> {
        self.shared.lock_state().store.get_all()
    }

    pub fn find(&self, key: &str) -> Option<CartEntry> {
        self.shared.lock_state().store.find_by_key(key).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.lock_state().load_state == LoadState::Loading
    }

    pub fn load_state(&self) -> LoadState {
        self.shared.lock_state().load_state
    }

    /// Number of distinct entries
    pub fn item_count(&self) -> usize {
        self.shared.lock_state().store.len()
    }

    pub fn total_price(&self) -> Price {
        aggregate::total_price(&self.cart_items())
    }

    /// Σ quantity
    pub fn total_items(&self) -> u64 {
        aggregate::total_items(&self.cart_items())
    }

    pub fn items_by_type(&self, kind: ItemKind) -> Vec<CartEntry> {
        aggregate::by_type(&self.cart_items(), kind)
    }

    pub fn count_by_type(&self) -> BTreeMap<ItemKind, u64> {
        aggregate::count_by_type(&self.cart_items())
    }

    pub fn subtotal_by_type(&self) -> BTreeMap<ItemKind, Price> {
        aggregate::subtotal_by_type(&self.cart_items())
    }
}

impl Drop for CartOperations {
    fn drop(&mut self) {
        let handle = self
            .writer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}
