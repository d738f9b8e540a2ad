use std::time::Duration;
use thiserror::Error;

/// Failures that abort an operation before or while it mutates the workbook.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Missing sheet: {0}")]
    MissingSheet(String),
    #[error("could not acquire document lock within {}ms", .0.as_millis())]
    LockTimeout(Duration),
    #[error("Invalid New IDs counter value: {0:?}")]
    InvalidCounter(String),
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct AuthError {
    message: &'static str,
}

impl AuthError {
    pub fn missing_signature() -> Self {
        Self {
            message: "Missing X-Signature header",
        }
    }

    pub fn invalid_signature() -> Self {
        Self {
            message: "Invalid signature",
        }
    }

    pub fn message(&self) -> &'static str {
        self.message
    }
}

/// A request body the endpoint server could not accept.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RequestError {
    endpoint: &'static str,
    message: String,
}

impl RequestError {
    pub fn new(endpoint: &'static str, message: impl Into<String>) -> Self {
        Self {
            endpoint,
            message: message.into(),
        }
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Transport-level failure talking to the cloud endpoint.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CloudError {
    status: Option<u16>,
    message: String,
    details: Option<serde_json::Value>,
}

impl CloudError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }
}
