//! Per-view helpers: lazily loaded fragment dialogs and a descriptor-driven
//! CRUD request orchestrator over an injected data service.

use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{ControlId, FragmentName, Record},
    error::{DataServiceError, ErrorCode},
    query::{Filter, Sorter, UrlParameters},
};

pub mod busy;
pub mod config;
pub mod controls_validation;
pub mod error;
pub mod fragment_dispatcher;
pub mod fragment_registry;
pub mod notification;
pub mod orchestrator;
pub mod request;

pub use busy::{BusyDialog, BusyIndicator, BusyScope};
pub use config::{load_settings, load_settings_from, Settings};
pub use controls_validation::ControlsValidation;
pub use error::{FragmentLoadError, RequestDescriptorError};
pub use fragment_dispatcher::{FragmentCallback, FragmentDialogDispatcher};
pub use fragment_registry::{DialogFragment, RegisteredFragmentLoader};
pub use notification::{
    BroadcastNotificationSink, Notification, NotificationSink, NotificationTitles, Severity,
    TracingNotificationSink,
};
pub use orchestrator::{RequestOrchestrator, RequestOutcome};
pub use request::{NormalizedRequestParameters, RequestDescriptor, RequestDescriptorBuilder};

/// A loaded fragment (dialog, popover, ...). Visual state lives in the instance.
pub trait FragmentInstance: Send + Sync {
    fn id(&self) -> &str;
    fn open(&self);
    fn close(&self);
    fn is_open(&self) -> bool;
    fn destroy(&self);
}

/// The view/controller pair that owns fragments and receives callbacks.
pub trait ViewHost: Send + Sync {
    fn controller_name(&self) -> &str;
    fn add_dependent(&self, fragment: Arc<dyn FragmentInstance>);
    fn remove_dependent(&self, fragment_id: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentLoadRequest {
    pub id: String,
    pub name: FragmentName,
    /// Event-binding target for handlers declared in the fragment.
    pub controller: String,
}

#[async_trait]
pub trait FragmentLoader: Send + Sync {
    async fn load(
        &self,
        request: FragmentLoadRequest,
    ) -> Result<Arc<dyn FragmentInstance>, FragmentLoadError>;
}

pub struct MissingFragmentLoader;

#[async_trait]
impl FragmentLoader for MissingFragmentLoader {
    async fn load(
        &self,
        request: FragmentLoadRequest,
    ) -> Result<Arc<dyn FragmentInstance>, FragmentLoadError> {
        Err(FragmentLoadError::NotFound(request.name))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    pub filters: Vec<Filter>,
    pub sorters: Vec<Sorter>,
    pub url_parameters: UrlParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub url_parameters: UrlParameters,
    pub refresh_after_change: bool,
}

/// Entity-oriented remote data service. Paths are service-relative (`/Orders`, `/Orders('A1')`).
#[async_trait]
pub trait DataServiceClient: Send + Sync {
    async fn read(&self, path: &str, options: ReadOptions) -> Result<Record, DataServiceError>;
    async fn create(
        &self,
        path: &str,
        payload: Record,
        options: WriteOptions,
    ) -> Result<Record, DataServiceError>;
    async fn update(
        &self,
        path: &str,
        payload: Record,
        options: WriteOptions,
    ) -> Result<Record, DataServiceError>;
    async fn remove(&self, path: &str, options: WriteOptions) -> Result<Record, DataServiceError>;
}

pub struct MissingDataService;

impl MissingDataService {
    fn unavailable(path: &str) -> DataServiceError {
        DataServiceError::new(ErrorCode::Unavailable, "data service is unavailable")
            .with_response_text(format!("no data service configured for {path}"))
    }
}

#[async_trait]
impl DataServiceClient for MissingDataService {
    async fn read(&self, path: &str, _options: ReadOptions) -> Result<Record, DataServiceError> {
        Err(Self::unavailable(path))
    }

    async fn create(
        &self,
        path: &str,
        _payload: Record,
        _options: WriteOptions,
    ) -> Result<Record, DataServiceError> {
        Err(Self::unavailable(path))
    }

    async fn update(
        &self,
        path: &str,
        _payload: Record,
        _options: WriteOptions,
    ) -> Result<Record, DataServiceError> {
        Err(Self::unavailable(path))
    }

    async fn remove(&self, path: &str, _options: WriteOptions) -> Result<Record, DataServiceError> {
        Err(Self::unavailable(path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Input,
    TextArea,
    DatePicker,
    Select,
    Button,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueState {
    None,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedItem {
    pub key: String,
    pub text: String,
}

/// A live UI control as seen by validation helpers.
pub trait ViewControl: Send + Sync {
    fn id(&self) -> &ControlId;
    fn kind(&self) -> ControlKind;
    /// Current text of inputs, text areas and date pickers.
    fn value(&self) -> Option<String>;
    fn selected_item(&self) -> Option<SelectedItem> {
        None
    }
    fn set_value_state(&self, state: ValueState);
    fn set_enabled(&self, enabled: bool);
}

pub trait ViewControlLocator: Send + Sync {
    fn by_id(&self, id: &ControlId) -> Option<Arc<dyn ViewControl>>;
}
