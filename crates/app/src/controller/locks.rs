//! Per-item request serialization.

use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use lieferspatz::items::ItemId;

/// One async lock per item, so requests for the same item reach the
/// storefront in the order they were made while other items proceed.
#[derive(Debug, Default)]
pub(crate) struct ItemLocks {
    locks: Mutex<FxHashMap<ItemId, Arc<AsyncMutex<()>>>>,
}

impl ItemLocks {
    /// Wait for exclusive access to an item.
    pub(crate) async fn acquire(&self, item_id: ItemId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

            // Nobody holds or waits on an entry whose only owner is the map.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);

            Arc::clone(locks.entry(item_id).or_default())
        };

        lock.lock_owned().await
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
