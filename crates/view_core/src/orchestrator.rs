use std::sync::Arc;

use shared::{domain::Record, error::DataServiceError, query::OperationKind};
use tracing::{debug, info, warn};

use crate::{
    busy::{BusyIndicator, BusyScope},
    config::Settings,
    error::RequestDescriptorError,
    notification::NotificationSink,
    request::{NormalizedRequestParameters, RequestDescriptor},
    ReadOptions, WriteOptions,
};

/// How an `execute` call settled. Failures have already been shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Completed(Record),
    Failed(DataServiceError),
    Rejected(RequestDescriptorError),
}

impl RequestOutcome {
    pub fn record(&self) -> Option<&Record> {
        match self {
            RequestOutcome::Completed(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<Record> {
        match self {
            RequestOutcome::Completed(record) => Some(record),
            _ => None,
        }
    }
}

/// Runs one CRUD call per configured descriptor against the descriptor's data service.
///
/// `execute` borrows the orchestrator mutably, so an instance never has more than
/// one call in flight. The busy indicator is shown right before the call and hidden
/// once it settles, before the success callback or error notification runs.
pub struct RequestOrchestrator {
    notifier: Arc<dyn NotificationSink>,
    busy: Arc<dyn BusyIndicator>,
    refresh_after_change: bool,
    parameters: Option<NormalizedRequestParameters>,
}

impl RequestOrchestrator {
    pub fn new(notifier: Arc<dyn NotificationSink>, busy: Arc<dyn BusyIndicator>) -> Self {
        Self {
            notifier,
            busy,
            refresh_after_change: true,
            parameters: None,
        }
    }

    pub fn with_settings(
        notifier: Arc<dyn NotificationSink>,
        busy: Arc<dyn BusyIndicator>,
        settings: &Settings,
    ) -> Self {
        Self {
            refresh_after_change: settings.refresh_after_change,
            ..Self::new(notifier, busy)
        }
    }

    /// Replaces any previous configuration.
    pub fn configure(&mut self, descriptor: RequestDescriptor) {
        let parameters = NormalizedRequestParameters::from(descriptor);
        debug!(
            entity_set = %parameters.entity_path,
            filters = parameters.filters.len(),
            sorters = parameters.sorters.len(),
            url_parameters = parameters.url_parameters.len(),
            "request configured"
        );
        self.parameters = Some(parameters);
    }

    pub fn parameters(&self) -> Option<&NormalizedRequestParameters> {
        self.parameters.as_ref()
    }

    /// Parses a textual operation kind. Unknown kinds are reported to the user and
    /// never reach the data service.
    pub async fn execute_named(&mut self, kind: &str) -> RequestOutcome {
        match kind.parse::<OperationKind>() {
            Ok(kind) => self.execute(kind).await,
            Err(_) => self.reject(RequestDescriptorError::MissingOperationKind(kind.to_string())),
        }
    }

    pub async fn execute(&mut self, kind: OperationKind) -> RequestOutcome {
        let Some(parameters) = self.parameters.as_ref() else {
            return self.reject(RequestDescriptorError::NotConfigured);
        };
        if matches!(kind, OperationKind::Create | OperationKind::Update)
            && parameters.payload.is_none()
        {
            return self.reject(RequestDescriptorError::MissingPayload(kind));
        }

        let busy = BusyScope::enter(self.busy.clone());
        let result = self.dispatch(kind, parameters).await;
        busy.release();

        match result {
            Ok(record) => {
                info!(operation = %kind, entity_set = %parameters.entity_path, "request completed");
                (parameters.on_success)(parameters.view.as_ref(), record.clone());
                RequestOutcome::Completed(record)
            }
            Err(err) => {
                warn!(
                    operation = %kind,
                    entity_set = %parameters.entity_path,
                    status = ?err.status_code,
                    "request failed: {err}"
                );
                self.notifier
                    .show_error(&err.message, err.response_text.as_deref());
                RequestOutcome::Failed(err)
            }
        }
    }

    async fn dispatch(
        &self,
        kind: OperationKind,
        parameters: &NormalizedRequestParameters,
    ) -> Result<Record, DataServiceError> {
        let service = &parameters.service;
        let path = parameters.entity_path.as_str();
        debug!(operation = %kind, entity_set = %path, "sending request");

        match kind {
            OperationKind::Read => {
                let options = ReadOptions {
                    filters: parameters.filters.clone(),
                    sorters: parameters.sorters.clone(),
                    url_parameters: parameters.url_parameters.clone(),
                };
                service.read(path, options).await
            }
            OperationKind::Create => {
                service
                    .create(path, self.payload(parameters), self.write_options(parameters))
                    .await
            }
            OperationKind::Update => {
                service
                    .update(path, self.payload(parameters), self.write_options(parameters))
                    .await
            }
            OperationKind::Delete => service.remove(path, self.write_options(parameters)).await,
        }
    }

    fn payload(&self, parameters: &NormalizedRequestParameters) -> Record {
        parameters.payload.clone().unwrap_or(Record::Null)
    }

    fn write_options(&self, parameters: &NormalizedRequestParameters) -> WriteOptions {
        WriteOptions {
            url_parameters: parameters.url_parameters.clone(),
            refresh_after_change: self.refresh_after_change,
        }
    }

    fn reject(&self, err: RequestDescriptorError) -> RequestOutcome {
        warn!("request rejected: {err}");
        self.notifier.show_error(&err.to_string(), None);
        RequestOutcome::Rejected(err)
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
