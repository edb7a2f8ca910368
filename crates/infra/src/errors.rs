//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use satchel_domain::SatchelError;

/// Error newtype that keeps conversions on the infrastructure side and can
/// be converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SatchelError);

impl From<InfraError> for SatchelError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SatchelError> for InfraError {
    fn from(value: SatchelError) -> Self {
        InfraError(value)
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        if value.is_timeout() {
            return InfraError(SatchelError::Network("HTTP request timed out".into()));
        }

        if value.is_connect() {
            return InfraError(SatchelError::Network("HTTP connection failure".into()));
        }

        if let Some(status) = value.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return InfraError(match code {
                401 | 403 => SatchelError::Auth(message),
                404 => SatchelError::NotFound(message),
                400..=499 => SatchelError::InvalidInput(message),
                _ => SatchelError::Network(message),
            });
        }

        InfraError(SatchelError::Network(value.to_string()))
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(match value.kind() {
            std::io::ErrorKind::NotFound => SatchelError::NotFound(value.to_string()),
            std::io::ErrorKind::PermissionDenied => SatchelError::Auth(value.to_string()),
            _ => SatchelError::Internal(format!("io error: {value}")),
        })
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(SatchelError::InvalidInput(format!("invalid JSON: {value}")))
    }
}
