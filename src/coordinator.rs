//! The single write path for [`HudConfig`].
//!
//! Tray clicks, hotkeys and the display surface all end up in
//! [`ConfigCoordinator::update`], which re-reads the store, merges, persists
//! and only then tells every observer about the merged record.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use log::{debug, info};

use crate::settings::{ConfigField, ConfigPatch, HudConfig, SettingsStore};

/// Reacts to a configuration change. Implementations refresh their own state
/// wholesale from `config` and must not call back into the coordinator.
pub trait ConfigObserver: Send + Sync {
    fn name(&self) -> &'static str;

    fn config_changed(&self, config: &HudConfig);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct ConfigCoordinator {
    store: SettingsStore,
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn ConfigObserver>)>>,
    next_id: AtomicU64,
    /// Held across read, merge, persist and notify.
    write_gate: Mutex<()>,
}

impl ConfigCoordinator {
    pub fn new(store: SettingsStore) -> Self {
        debug!("Config store at {}", store.path().display());
        Self {
            store,
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            write_gate: Mutex::new(()),
        }
    }

    /// Loading may repair a corrupt file, so reads take the gate too.
    pub fn current(&self) -> HudConfig {
        let _gate = lock(&self.write_gate);
        self.store.load()
    }

    pub fn subscribe(&self, observer: Arc<dyn ConfigObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!("Config observer '{}' subscribed as {:?}", observer.name(), id);
        lock(&self.observers).push((id, observer));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn update(&self, patch: ConfigPatch) -> HudConfig {
        self.apply(|_| patch)
    }

    /// Flips `field` based on the value on disk at the time of the call.
    pub fn toggle(&self, field: ConfigField) -> HudConfig {
        self.apply(|current| field.patch(!field.get(current)))
    }

    fn apply<F>(&self, make_patch: F) -> HudConfig
    where
        F: FnOnce(&HudConfig) -> ConfigPatch,
    {
        let _gate = lock(&self.write_gate);

        let current = self.store.load();
        let patch = make_patch(&current);
        let next = current.merged(&patch);
        self.store.save(&next);
        if patch.is_empty() {
            debug!("Empty config patch; re-broadcasting {:?}", next);
        } else {
            info!("Config updated {:?} -> {:?}", patch, next);
        }

        let observers: Vec<Arc<dyn ConfigObserver>> = lock(&self.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer.config_changed(&next);
        }

        next
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
