//! Lazily loaded, cached fragment dialogs for one view.
//!
//! Each fragment name maps to at most one instance. The first `show_fragment`
//! for a name loads it, attaches it to the view and caches it; later calls only
//! open the cached instance. A name stays cached until `destroy_fragment`.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use shared::domain::FragmentName;
use tracing::{debug, error, info};

use crate::{
    error::FragmentLoadError, notification::NotificationSink, FragmentInstance,
    FragmentLoadRequest, FragmentLoader, ViewHost,
};

type LoadResult = Result<Arc<dyn FragmentInstance>, FragmentLoadError>;
type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;
type Slots = HashMap<FragmentName, FragmentSlot>;

/// Runs after a load settles, with the owning view and the cached instance (if the load succeeded).
pub type FragmentCallback =
    Box<dyn FnOnce(&dyn ViewHost, Option<&Arc<dyn FragmentInstance>>) + Send>;

/// An in-flight load. `adopted` is settled by the first waiter to see the
/// result; later waiters reuse that outcome.
#[derive(Clone)]
struct PendingLoad {
    future: SharedLoad,
    adopted: Arc<OnceLock<Option<Arc<dyn FragmentInstance>>>>,
}

impl PendingLoad {
    fn is_current(&self, slots: &Slots, name: &FragmentName) -> bool {
        matches!(
            slots.get(name),
            Some(FragmentSlot::Loading(current)) if Shared::ptr_eq(&current.future, &self.future)
        )
    }
}

enum FragmentSlot {
    /// Load in flight; concurrent callers await the same future.
    Loading(PendingLoad),
    Ready(Arc<dyn FragmentInstance>),
}

pub struct FragmentDialogDispatcher {
    view: Arc<dyn ViewHost>,
    loader: Arc<dyn FragmentLoader>,
    notifier: Arc<dyn NotificationSink>,
    fragments: Mutex<Slots>,
}

impl FragmentDialogDispatcher {
    pub fn new(
        view: Arc<dyn ViewHost>,
        loader: Arc<dyn FragmentLoader>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            view,
            loader,
            notifier,
            fragments: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.fragments.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn show_fragment(&self, name: &FragmentName, callback: Option<FragmentCallback>) {
        let load = {
            let mut slots = self.slots();
            match slots.get(name) {
                Some(FragmentSlot::Ready(instance)) => {
                    let instance = instance.clone();
                    drop(slots);
                    debug!(fragment = %name, "opening cached fragment");
                    instance.open();
                    return;
                }
                Some(FragmentSlot::Loading(load)) => {
                    debug!(fragment = %name, "joining in-flight fragment load");
                    load.clone()
                }
                None => {
                    let load = self.start_load(name);
                    slots.insert(name.clone(), FragmentSlot::Loading(load.clone()));
                    load
                }
            }
        };

        let result = load.future.clone().await;
        let cached = load
            .adopted
            .get_or_init(|| self.adopt(name, &load, &result))
            .clone();

        if let Some(callback) = callback {
            callback(self.view.as_ref(), cached.as_ref());
        }
        self.open_fragment_dialog(name);

        if let Err(err) = result {
            error!(fragment = %name, "fragment load failed: {err}");
            self.notifier
                .show_error(&format!("Error showing fragment {name}"), Some(&err.to_string()));
            self.close_fragment_dialog(name);
        }
    }

    fn start_load(&self, name: &FragmentName) -> PendingLoad {
        let request = FragmentLoadRequest {
            id: name.short_id().to_string(),
            name: name.clone(),
            controller: self.view.controller_name().to_string(),
        };
        info!(fragment = %name, id = %request.id, "loading fragment");
        let loader = self.loader.clone();
        PendingLoad {
            future: async move { loader.load(request).await }.boxed().shared(),
            adopted: Arc::new(OnceLock::new()),
        }
    }

    /// Runs once per load. Attaches the instance to the view and caches it, unless
    /// the name was destroyed or replaced meanwhile, in which case the instance is
    /// destroyed. The view is called without holding the slot lock.
    fn adopt(
        &self,
        name: &FragmentName,
        load: &PendingLoad,
        result: &LoadResult,
    ) -> Option<Arc<dyn FragmentInstance>> {
        let instance = match result {
            Ok(instance) => instance.clone(),
            Err(_) => {
                let mut slots = self.slots();
                if load.is_current(&slots, name) {
                    slots.remove(name);
                }
                return None;
            }
        };

        let current = load.is_current(&self.slots(), name);
        if !current {
            debug!(fragment = %name, "discarding fragment loaded after destroy");
            instance.destroy();
            return None;
        }

        self.view.add_dependent(instance.clone());

        {
            let mut slots = self.slots();
            if load.is_current(&slots, name) {
                slots.insert(name.clone(), FragmentSlot::Ready(instance.clone()));
                debug!(fragment = %name, "fragment cached");
                return Some(instance);
            }
        }

        debug!(fragment = %name, "fragment destroyed while attaching");
        self.view.remove_dependent(instance.id());
        instance.destroy();
        None
    }

    /// No-op unless the fragment is cached.
    pub fn open_fragment_dialog(&self, name: &FragmentName) -> bool {
        match self.fragment(name) {
            Some(instance) => {
                instance.open();
                true
            }
            None => false,
        }
    }

    /// No-op unless the fragment is cached.
    pub fn close_fragment_dialog(&self, name: &FragmentName) -> bool {
        match self.fragment(name) {
            Some(instance) => {
                instance.close();
                true
            }
            None => false,
        }
    }

    /// Destroys the cached instance and forgets the name. Returns whether anything was cached.
    pub fn destroy_fragment(&self, name: &FragmentName) -> bool {
        let removed = self.slots().remove(name);
        match removed {
            Some(FragmentSlot::Ready(instance)) => {
                self.view.remove_dependent(instance.id());
                instance.destroy();
                info!(fragment = %name, "fragment destroyed");
                true
            }
            Some(FragmentSlot::Loading(_)) => {
                debug!(fragment = %name, "fragment destroyed while loading");
                true
            }
            None => false,
        }
    }

    pub fn fragment(&self, name: &FragmentName) -> Option<Arc<dyn FragmentInstance>> {
        match self.slots().get(name) {
            Some(FragmentSlot::Ready(instance)) => Some(instance.clone()),
            _ => None,
        }
    }

    pub fn is_loaded(&self, name: &FragmentName) -> bool {
        self.fragment(name).is_some()
    }

    pub fn is_loading(&self, name: &FragmentName) -> bool {
        matches!(self.slots().get(name), Some(FragmentSlot::Loading(_)))
    }
}

#[cfg(test)]
#[path = "tests/fragment_dispatcher_tests.rs"]
mod tests;
