use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    Conflict,
    Timeout,
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => ErrorCode::NotFound,
            408 | 504 => ErrorCode::Timeout,
            409 | 412 => ErrorCode::Conflict,
            400..=499 => ErrorCode::BadRequest,
            502 | 503 => ErrorCode::Unavailable,
            _ => ErrorCode::Internal,
        }
    }

    pub fn status(self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::Conflict => 409,
            ErrorCode::Timeout => 504,
            ErrorCode::Unavailable => 503,
            ErrorCode::Internal => 500,
        }
    }
}

/// Failure reported by a data service call.
///
/// `response_text` carries the raw response body when the service produced one;
/// it is shown to the user as the detail of the error notification.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct DataServiceError {
    pub code: ErrorCode,
    pub message: String,
    pub response_text: Option<String>,
    pub status_code: Option<u16>,
}

impl DataServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            response_text: None,
            status_code: Some(code.status()),
        }
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            message: message.into(),
            response_text: None,
            status_code: Some(status),
        }
    }

    pub fn with_response_text(mut self, response_text: impl Into<String>) -> Self {
        self.response_text = Some(response_text.into());
        self
    }

    pub fn without_status(mut self) -> Self {
        self.status_code = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_classify() {
        assert_eq!(ErrorCode::from_status(404), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from_status(422), ErrorCode::BadRequest);
        assert_eq!(ErrorCode::from_status(503), ErrorCode::Unavailable);
        assert_eq!(ErrorCode::from_status(500), ErrorCode::Internal);
    }

    #[test]
    fn display_is_the_message_only() {
        let err = DataServiceError::new(ErrorCode::Timeout, "timeout").with_response_text("gateway");
        assert_eq!(err.to_string(), "timeout");
        assert_eq!(err.response_text.as_deref(), Some("gateway"));
        assert_eq!(err.status_code, Some(504));
    }
}
