use shared::{domain::FragmentName, query::OperationKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FragmentLoadError {
    #[error("fragment '{0}' is not registered")]
    NotFound(FragmentName),
    #[error("failed to instantiate fragment '{name}': {reason}")]
    Instantiation { name: FragmentName, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestDescriptorError {
    #[error("operation kind must be supplied as one of read, create, update, delete (got '{0}')")]
    MissingOperationKind(String),
    #[error("request descriptor is missing mandatory field '{0}'")]
    MissingField(&'static str),
    #[error("{0} requests need a payload")]
    MissingPayload(OperationKind),
    #[error("request orchestrator has not been configured")]
    NotConfigured,
}
