//! Cart controller.
//!
//! The single owner of cart contents and panel visibility. UI surfaces read
//! through [`CartController::subscribe`] and [`CartController::events`] and
//! write through the action methods; nothing else mutates the state.

use std::{
    fmt,
    ops::ControlFlow,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use jiff::Timestamp;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use lieferspatz::{
    errors::CartError,
    items::{CartItem, ItemId},
    panel::{DismissTrigger, Transition},
    payloads::{CartPayload, MutationAck},
    pending::{OperationKind, Ticket},
    pricing::subtotal,
    receipt::{CartSummary, ReceiptError},
    state::CartState,
};

use crate::api::CartApi;

pub use events::{CartAction, CartEvent, Notice, NoticeLevel};
pub use settings::ControllerSettings;

use loads::{Join, LoadRegistry, LoadResult, outcome};
use locks::ItemLocks;

mod events;
mod loads;
mod locks;
mod settings;

const EVENT_CAPACITY: usize = 64;

/// Cart synchronization controller.
///
/// Cheap to clone; clones share the same cart.
#[derive(Clone)]
pub struct CartController {
    shared: Arc<Shared>,
}

struct Shared {
    api: Arc<dyn CartApi>,
    settings: ControllerSettings,
    state: Mutex<CartState>,
    published: watch::Sender<CartState>,
    events: broadcast::Sender<CartEvent>,
    loads: LoadRegistry,
    locks: ItemLocks,
    tickets: AtomicU64,
    epoch: AtomicU64,
    revision: AtomicU64,
    published_revision: AtomicU64,
}

impl fmt::Debug for CartController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartController")
            .field("settings", &self.shared.settings)
            .field("state", &*self.lock_state())
            .finish_non_exhaustive()
    }
}

impl CartController {
    /// Create a controller with an empty, closed cart.
    pub fn new(api: Arc<dyn CartApi>, settings: ControllerSettings) -> Self {
        let (published, _) = watch::channel(CartState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                api,
                settings,
                state: Mutex::new(CartState::default()),
                published,
                events,
                loads: LoadRegistry::default(),
                locks: ItemLocks::default(),
                tickets: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                revision: AtomicU64::new(0),
                published_revision: AtomicU64::new(0),
            }),
        }
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.shared.published.subscribe()
    }

    /// Receive one-shot notifications.
    pub fn events(&self) -> broadcast::Receiver<CartEvent> {
        self.shared.events.subscribe()
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> CartState {
        self.lock_state().clone()
    }

    /// Units shown in the header bubble. Never touches the network.
    pub fn get_count(&self) -> u32 {
        self.lock_state().count()
    }

    /// Settings in effect.
    pub fn settings(&self) -> &ControllerSettings {
        &self.shared.settings
    }

    /// Fetch the lines from the storefront and adopt them.
    ///
    /// Concurrent calls share a single request and all observe its result.
    /// On failure the previous lines stay in place.
    ///
    /// # Errors
    ///
    /// Returns the [`CartError`] the request failed with.
    pub async fn load_cart(&self) -> Result<CartState, CartError> {
        self.load_since(0).await
    }

    /// Add units of an item, showing them before the storefront confirms.
    ///
    /// # Errors
    ///
    /// - [`CartError::InvalidQuantity`]: `quantity` is zero.
    /// - Any error from the storefront; the optimistic units are taken back.
    pub async fn add_item(&self, item_id: ItemId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(self.fail(CartAction::Add, CartError::InvalidQuantity(quantity)));
        }

        let ticket = self.next_ticket();

        self.modify(|state| state.begin(ticket, OperationKind::Add, item_id, i64::from(quantity)));

        let guard = self.shared.locks.acquire(item_id).await;

        let ack = match self.shared.api.add_item(item_id, quantity).await {
            Ok(ack) => ack,
            Err(error) => {
                warn!(%item_id, quantity, "add rejected, rolling back: {error}");

                return Err(self.roll_back(ticket, CartAction::Add, error));
            }
        };

        let (known, epoch) = self.modify(|state| {
            (state.confirm_add(ticket, item_id, quantity), self.bump_epoch())
        });

        drop(guard);

        info!(%item_id, quantity, "item added to cart");

        self.emit(CartEvent::ItemAdded { item_id, quantity });

        if self.shared.settings.open_on_add {
            self.transition(CartState::open_panel);
        }

        self.reconcile(epoch, &ack, !known).await;

        Ok(())
    }

    /// Remove an item's line.
    ///
    /// The visible count drops by one straight away; once confirmed the whole
    /// line goes. Emptying the cart while the panel is open closes the panel
    /// after the grace delay.
    ///
    /// # Errors
    ///
    /// Returns any error from the storefront; the optimistic change is taken back.
    pub async fn remove_item(&self, item_id: ItemId) -> Result<(), CartError> {
        let ticket = self.next_ticket();

        self.modify(|state| state.begin(ticket, OperationKind::Remove, item_id, -1));

        let guard = self.shared.locks.acquire(item_id).await;

        let ack = match self.shared.api.remove_item(item_id).await {
            Ok(ack) => ack,
            Err(error) => {
                warn!(%item_id, "remove rejected, rolling back: {error}");

                return Err(self.roll_back(ticket, CartAction::Remove, error));
            }
        };

        let (removed, epoch) = self.modify(|state| {
            (state.confirm_remove(Some(ticket), item_id), self.bump_epoch())
        });

        drop(guard);

        info!(%item_id, units = removed.as_ref().map_or(0, |item| item.quantity), "item removed from cart");

        self.emit(CartEvent::ItemRemoved { item_id });
        self.schedule_auto_close();
        self.reconcile(epoch, &ack, false).await;

        Ok(())
    }

    /// Set a line to an exact quantity. Zero removes the line.
    ///
    /// Increases are sent as an addition of the difference. Decreases are
    /// sent as a removal followed by an addition of the new quantity; if only
    /// the removal goes through, the lines are reloaded.
    ///
    /// # Errors
    ///
    /// - [`CartError::NotInCart`]: the item has no confirmed line.
    /// - Any error from the storefront; the optimistic change is taken back.
    pub async fn set_quantity(&self, item_id: ItemId, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove_item(item_id).await;
        }

        let ticket = self.next_ticket();

        // Show the new quantity against what is visible now, queued requests included.
        let listed = self.modify(|state| {
            let confirmed = state.item(item_id)?.quantity;
            let visible = (i64::from(confirmed) + state.pending().delta_for(item_id)).max(0);

            state.begin(
                ticket,
                OperationKind::UpdateQuantity,
                item_id,
                i64::from(quantity) - visible,
            );

            Some(confirmed)
        });

        if listed.is_none() {
            return Err(self.fail(CartAction::UpdateQuantity, CartError::NotInCart(item_id)));
        }

        let guard = self.shared.locks.acquire(item_id).await;

        // Earlier requests for this item have settled; restate the delta against them.
        let current = self.modify(|state| {
            state.rollback(ticket);

            let current = state.item(item_id)?.quantity;

            if current != quantity {
                let delta = i64::from(quantity) - i64::from(current);

                state.begin(ticket, OperationKind::UpdateQuantity, item_id, delta);
            }

            Some(current)
        });

        let Some(current) = current else {
            return Err(self.fail(CartAction::UpdateQuantity, CartError::NotInCart(item_id)));
        };

        if current == quantity {
            return Ok(());
        }

        let api = &self.shared.api;

        let result = if quantity > current {
            api.add_item(item_id, quantity - current).await
        } else {
            match api.remove_item(item_id).await {
                Ok(_) => match api.add_item(item_id, quantity).await {
                    Ok(ack) => Ok(ack),
                    Err(error) => {
                        drop(guard);

                        warn!(%item_id, quantity, "line removed but not re-added: {error}");

                        let error = self.roll_back(ticket, CartAction::UpdateQuantity, error);
                        let epoch = self.modify(|_| self.bump_epoch());

                        if let Err(reload) = self.load_since(epoch).await {
                            debug!("reload after partial update failed: {reload}");
                        }

                        return Err(error);
                    }
                },
                Err(error) => Err(error),
            }
        };

        let ack = match result {
            Ok(ack) => ack,
            Err(error) => {
                warn!(%item_id, quantity, "quantity change rejected, rolling back: {error}");

                return Err(self.roll_back(ticket, CartAction::UpdateQuantity, error));
            }
        };

        let (known, epoch) = self.modify(|state| {
            (state.confirm_quantity(ticket, item_id, quantity), self.bump_epoch())
        });

        drop(guard);

        info!(%item_id, from = current, to = quantity, "quantity updated");

        self.emit(CartEvent::QuantityChanged { item_id, quantity });
        self.reconcile(epoch, &ack, !known).await;

        Ok(())
    }

    /// Compare the count with the storefront and reload on disagreement.
    ///
    /// Returns the visible count afterwards.
    ///
    /// # Errors
    ///
    /// Returns the [`CartError`] the probe or the reload failed with.
    pub async fn sync_count(&self) -> Result<u32, CartError> {
        let server = match self.shared.api.fetch_count().await {
            Ok(count) => count,
            Err(error) => {
                self.modify(|state| state.record_error(error.clone()));

                return Err(self.fail(CartAction::Sync, error));
            }
        };

        let confirmed = self.lock_state().confirmed_count();

        if server != confirmed {
            debug!(server, confirmed, "count drifted, reloading");

            self.load_since(self.current_epoch()).await?;
        }

        Ok(self.get_count())
    }

    /// Request the panel to open, loading the lines when they are missing or
    /// stale and no load is already running.
    ///
    /// # Errors
    ///
    /// Returns the [`CartError`] the load failed with. The panel opens anyway.
    pub async fn open(&self) -> Result<Transition, CartError> {
        let transition = self.transition(CartState::open_panel);

        if transition.changed() && self.needs_refresh() {
            self.load_cart().await?;
        }

        Ok(transition)
    }

    /// Request the panel to close.
    pub fn close(&self) -> Transition {
        self.transition(CartState::close_panel)
    }

    /// Open when closed, close when open.
    ///
    /// # Errors
    ///
    /// Returns the [`CartError`] an opening load failed with.
    pub async fn toggle(&self) -> Result<Transition, CartError> {
        if self.lock_state().is_open() {
            Ok(self.close())
        } else {
            self.open().await
        }
    }

    /// Close the panel in response to a dismiss gesture.
    pub fn dismiss(&self, trigger: DismissTrigger) -> Transition {
        debug!(?trigger, "panel dismissed");

        self.close()
    }

    /// Complete the panel's slide animation.
    pub fn finish_transition(&self) -> Transition {
        self.transition(CartState::finish_panel_transition)
    }

    /// Priced view of the confirmed lines.
    ///
    /// # Errors
    ///
    /// Returns a [`ReceiptError`] if a line or the delivery fee cannot be priced.
    pub fn summary(&self) -> Result<CartSummary, ReceiptError> {
        let fee = self.shared.settings.delivery_fee()?;
        let items = self.lock_state().items().to_vec();

        CartSummary::new(&items, fee)
    }

    async fn load_since(&self, min_epoch: u64) -> LoadResult {
        loop {
            match self.shared.loads.join(min_epoch, self.current_epoch()) {
                Join::Leader {
                    seq,
                    epoch,
                    publish,
                    outcome: result,
                } => {
                    self.spawn_load(seq, epoch, publish);

                    return outcome(result).await;
                }
                Join::Follower(result) => return outcome(result).await,
                Join::Stale(result) => {
                    debug!(min_epoch, "waiting out a load that predates the last mutation");

                    _ = outcome(result).await;
                }
            }
        }
    }

    fn spawn_load(&self, seq: u64, epoch: u64, publish: watch::Sender<Option<LoadResult>>) {
        self.modify(|state| state.set_loading(true));

        let controller = self.clone();

        tokio::spawn(async move {
            let mut epoch = epoch;

            let result = loop {
                debug!(seq, epoch, "loading cart");

                let fetched = controller.fetch_items().await;

                match controller.apply_load(seq, epoch, fetched) {
                    ControlFlow::Break(result) => break result,
                    ControlFlow::Continue(current) => epoch = current,
                }
            };

            if let Err(error) = &result {
                controller.emit(CartEvent::Failed {
                    action: CartAction::Load,
                    error: error.clone(),
                });
            }

            publish.send_replace(Some(result));
        });
    }

    async fn fetch_items(&self) -> Result<Vec<CartItem>, CartError> {
        let payload: CartPayload = self.shared.api.fetch_cart().await?;
        let reported = payload.total_price;
        let items = payload.into_items()?;

        if let Ok(computed) = subtotal(&items, self.shared.settings.currency)
            && computed.amount() != &reported
        {
            debug!(%reported, computed = %computed.amount(), "storefront total differs from line sum");
        }

        Ok(items)
    }

    /// Adopt a finished load.
    ///
    /// Lines fetched before a mutation was confirmed would undo it. Such a
    /// load continues with a fresh request stamped with the current epoch.
    /// The epoch is read under the state lock, where mutations bump it.
    fn apply_load(
        &self,
        seq: u64,
        epoch: u64,
        fetched: Result<Vec<CartItem>, CartError>,
    ) -> ControlFlow<LoadResult, u64> {
        self.modify(|state| {
            let current = self.current_epoch();

            if fetched.is_ok() && epoch < current {
                debug!(seq, epoch, current, "load predates a mutation, fetching again");

                self.shared.loads.restamp(seq, current);

                return ControlFlow::Continue(current);
            }

            let newest = self.shared.loads.finish(seq);

            state.set_loading(self.shared.loads.is_loading());

            ControlFlow::Break(match fetched {
                Ok(items) => {
                    if newest {
                        state.replace_items(items, Timestamp::now());
                    } else {
                        debug!(seq, "discarding superseded load");
                    }

                    Ok(state.clone())
                }
                Err(error) => {
                    warn!(seq, "cart load failed: {error}");

                    state.record_error(error.clone());

                    Err(error)
                }
            })
        })
    }

    async fn reconcile(&self, epoch: u64, ack: &MutationAck, item_unknown: bool) {
        let panel_open = self.lock_state().is_open();

        let must_load = if item_unknown || panel_open {
            true
        } else {
            let server = match ack.count {
                Some(count) => Ok(count),
                None => self.shared.api.fetch_count().await,
            };

            match server {
                Ok(count) => {
                    let confirmed = self.lock_state().confirmed_count();

                    count != confirmed
                }
                Err(error) => {
                    self.modify(|state| state.record_error(error.clone()));
                    self.fail(CartAction::Sync, error);

                    return;
                }
            }
        };

        if must_load && let Err(error) = self.load_since(epoch).await {
            debug!("reconciliation load failed: {error}");
        }
    }

    fn schedule_auto_close(&self) {
        let state = self.lock_state();

        if !(state.is_empty() && state.is_open()) {
            return;
        }

        drop(state);

        let controller = self.clone();
        let grace = self.shared.settings.auto_close_grace;

        tokio::spawn(async move {
            tokio::time::sleep(grace).await;

            let still_empty = {
                let state = controller.lock_state();

                state.is_empty() && state.is_open()
            };

            if still_empty {
                debug!("closing panel on empty cart");

                controller.close();
            }
        });
    }

    fn needs_refresh(&self) -> bool {
        let state = self.lock_state();

        let outdated = state.items().is_empty()
            || state.is_stale(Timestamp::now(), self.shared.settings.stale_after);

        outdated && !self.shared.loads.is_loading()
    }

    fn transition(&self, request: impl FnOnce(&mut CartState) -> Transition) -> Transition {
        let transition = self.modify(request);

        if let Transition::Moved { from, to } = transition {
            debug!(?from, ?to, "panel moved");

            self.emit(CartEvent::PanelMoved { from, to });
        }

        transition
    }

    fn roll_back(&self, ticket: Ticket, action: CartAction, error: CartError) -> CartError {
        self.modify(|state| {
            state.rollback(ticket);
            state.record_error(error.clone());
        });

        self.fail(action, error)
    }

    fn fail(&self, action: CartAction, error: CartError) -> CartError {
        self.emit(CartEvent::Failed {
            action,
            error: error.clone(),
        });

        error
    }

    fn emit(&self, event: CartEvent) {
        // No subscribers is fine.
        _ = self.shared.events.send(event);
    }

    /// Change the state and publish the result.
    ///
    /// Publishing happens after the state lock is released, so a subscriber
    /// holding a borrowed snapshot can still read the controller. Revisions
    /// are taken under the state lock and keep an older snapshot from
    /// replacing a newer one.
    fn modify<R>(&self, change: impl FnOnce(&mut CartState) -> R) -> R {
        let (result, snapshot, revision) = {
            let mut state = self.lock_state();
            let result = change(&mut state);
            let revision = self.shared.revision.fetch_add(1, Ordering::Relaxed) + 1;

            (result, state.clone(), revision)
        };

        self.shared.published.send_if_modified(|published| {
            if revision <= self.shared.published_revision.load(Ordering::Relaxed) {
                return false;
            }

            self.shared
                .published_revision
                .store(revision, Ordering::Relaxed);
            *published = snapshot;

            true
        });

        result
    }

    fn lock_state(&self) -> MutexGuard<'_, CartState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn next_ticket(&self) -> Ticket {
        Ticket::new(self.shared.tickets.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn current_epoch(&self) -> u64 {
        self.shared.epoch.load(Ordering::Acquire)
    }

    fn bump_epoch(&self) -> u64 {
        self.shared.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }
}
