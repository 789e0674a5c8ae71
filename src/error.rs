//! Error types for registry operations
//!
//! Every failure the client can produce is a [`RegistryError`]. Callers
//! classify failures through [`RegistryError::kind`] (or the `is_*` helpers)
//! instead of matching on message text.

use std::fmt;

use crate::template::TemplateError;

/// MLflow error codes that influence classification.
pub mod codes {
    pub const RESOURCE_DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";
    pub const RESOURCE_ALREADY_EXISTS: &str = "RESOURCE_ALREADY_EXISTS";
    pub const INVALID_PARAMETER_VALUE: &str = "INVALID_PARAMETER_VALUE";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
}

/// Error response returned by the MLflow REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Machine-readable `error_code` from the response body, if any
    pub code: Option<String>,
    /// Human-readable message
    pub message: String,
    /// Value of the `x-request-id` response header, if present
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.filter(|c| !c.is_empty()).map(str::to_string),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn kind(&self) -> ErrorKind {
        match (self.status, self.code()) {
            (_, Some(codes::RESOURCE_DOES_NOT_EXIST)) | (404, _) => ErrorKind::NotFound,
            (_, Some(codes::UNAUTHENTICATED)) | (401, _) => ErrorKind::Unauthorized,
            (_, Some(codes::PERMISSION_DENIED)) | (403, _) => ErrorKind::PermissionDenied,
            (409, None) | (_, Some(codes::RESOURCE_ALREADY_EXISTS)) => ErrorKind::AlreadyExists,
            // A conflict that is not a creation clash: an alias still points at the target.
            (409, Some(_)) => ErrorKind::AliasConflict,
            (_, Some(codes::INVALID_PARAMETER_VALUE)) | (400, _) => ErrorKind::InvalidArgument,
            _ => ErrorKind::Server,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "mlflow: {}: {} (status {})", code, self.message, self.status),
            None => write!(f, "mlflow: {} (status {})", self.message, self.status),
        }
    }
}

impl std::error::Error for ApiError {}

/// Classification of a [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    PermissionDenied,
    InvalidArgument,
    AlreadyExists,
    AliasConflict,
    MissingVariable,
    TypeMismatch,
    Transport,
    Cancelled,
    DeadlineExceeded,
    Decode,
    Server,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("mlflow: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("mlflow: request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mlflow: failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("mlflow: failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("mlflow: malformed record: {0}")]
    MalformedRecord(String),

    #[error("mlflow: operation cancelled")]
    Cancelled,

    #[error("mlflow: deadline exceeded")]
    DeadlineExceeded,

    #[error("mlflow: invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

impl RegistryError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(api) => api.kind(),
            Self::InvalidArgument(_) | Self::Config(_) => ErrorKind::InvalidArgument,
            Self::Template(TemplateError::TypeMismatch { .. }) => ErrorKind::TypeMismatch,
            Self::Template(_) => ErrorKind::MissingVariable,
            Self::Transport(err) if err.is_timeout() => ErrorKind::DeadlineExceeded,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Decode { .. } | Self::Encode { .. } | Self::MalformedRecord(_) => ErrorKind::Decode,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
        }
    }

    /// The API error behind this failure, if the server produced one.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(api) => Some(api),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }

    pub fn is_permission_denied(&self) -> bool {
        self.kind() == ErrorKind::PermissionDenied
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    /// Version deletion was blocked because an alias still targets it.
    ///
    /// MLflow OSS silently detaches aliases instead, so this only fires on
    /// backends that enforce alias protection.
    pub fn is_alias_conflict(&self) -> bool {
        self.kind() == ErrorKind::AliasConflict
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind(), ErrorKind::Cancelled | ErrorKind::DeadlineExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::new(
            404,
            Some("RESOURCE_DOES_NOT_EXIST"),
            "Registered Model with name=foo not found",
        );
        assert_eq!(
            err.to_string(),
            "mlflow: RESOURCE_DOES_NOT_EXIST: Registered Model with name=foo not found (status 404)"
        );

        let err = ApiError::new(500, None, "Internal server error");
        assert_eq!(err.to_string(), "mlflow: Internal server error (status 500)");
    }

    #[test]
    fn test_empty_code_is_treated_as_absent() {
        let err = ApiError::new(409, Some(""), "conflict");
        assert_eq!(err.code, None);
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_status_classification() {
        let cases = [
            (404, None, ErrorKind::NotFound),
            (401, None, ErrorKind::Unauthorized),
            (403, None, ErrorKind::PermissionDenied),
            (400, None, ErrorKind::InvalidArgument),
            (409, None, ErrorKind::AlreadyExists),
            (409, Some("RESOURCE_ALREADY_EXISTS"), ErrorKind::AlreadyExists),
            (409, Some("ALIAS_EXISTS"), ErrorKind::AliasConflict),
            (500, None, ErrorKind::Server),
            (400, Some("RESOURCE_DOES_NOT_EXIST"), ErrorKind::NotFound),
        ];

        for (status, code, expected) in cases {
            let err = RegistryError::from(ApiError::new(status, code, "x"));
            assert_eq!(err.kind(), expected, "status {} code {:?}", status, code);
        }
    }

    #[test]
    fn test_alias_conflict_is_not_already_exists() {
        let err = RegistryError::from(ApiError::new(409, Some("ALIAS_EXISTS"), "alias"));
        assert!(err.is_alias_conflict());
        assert!(!err.is_already_exists());
    }

    #[test]
    fn test_client_side_kinds() {
        assert!(RegistryError::invalid("prompt name is required").is_invalid_argument());
        assert!(RegistryError::Cancelled.is_cancelled());
        assert!(RegistryError::DeadlineExceeded.is_cancelled());
        assert!(RegistryError::Cancelled.api().is_none());
    }
}
