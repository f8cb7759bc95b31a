//! A [`FragmentLoader`] backed by factories registered up front, and a plain
//! dialog fragment whose state can be observed.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use shared::domain::FragmentName;
use tracing::debug;

use crate::{error::FragmentLoadError, FragmentInstance, FragmentLoadRequest, FragmentLoader};

type FragmentFactory =
    Arc<dyn Fn(&FragmentLoadRequest) -> Result<Arc<dyn FragmentInstance>, FragmentLoadError> + Send + Sync>;

#[derive(Debug)]
pub struct DialogFragment {
    id: String,
    controller: String,
    open: AtomicBool,
    destroyed: AtomicBool,
}

impl DialogFragment {
    pub fn new(id: impl Into<String>, controller: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            controller: controller.into(),
            open: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl FragmentInstance for DialogFragment {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self) {
        if !self.is_destroyed() {
            self.open.store(true, Ordering::SeqCst);
        }
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn destroy(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RegisteredFragmentLoader {
    factories: HashMap<FragmentName, FragmentFactory>,
}

impl RegisteredFragmentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<FragmentName>, factory: F)
    where
        F: Fn(&FragmentLoadRequest) -> Result<Arc<dyn FragmentInstance>, FragmentLoadError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Registers a [`DialogFragment`] built from the request's id and controller.
    pub fn register_dialog(&mut self, name: impl Into<FragmentName>) {
        self.register(name, |request| {
            let dialog: Arc<dyn FragmentInstance> =
                Arc::new(DialogFragment::new(request.id.clone(), request.controller.clone()));
            Ok(dialog)
        });
    }
}

#[async_trait]
impl FragmentLoader for RegisteredFragmentLoader {
    async fn load(
        &self,
        request: FragmentLoadRequest,
    ) -> Result<Arc<dyn FragmentInstance>, FragmentLoadError> {
        let factory = self
            .factories
            .get(&request.name)
            .ok_or_else(|| FragmentLoadError::NotFound(request.name.clone()))?;
        debug!(fragment = %request.name, id = %request.id, "instantiating fragment");
        factory(&request)
    }
}
