use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DocShardError {
    #[error("Schema violation: field '{field}' is not declared for entity '{entity}'")]
    SchemaViolation { entity: String, field: String },

    #[error("Type mismatch for field {field}: expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid document id: {0}")]
    InvalidDocumentId(String),

    #[error("Invalid tenant: {0}")]
    InvalidTenant(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Document size {size} exceeds max {max} bytes")]
    DocumentTooLarge { size: usize, max: usize },

    #[error("Too many concurrent writes: {current} active, max {max}")]
    TooManyConcurrentWrites { current: usize, max: usize },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Tantivy error: {0}")]
    Tantivy(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DocShardError>;

impl From<std::convert::Infallible> for DocShardError {
    fn from(e: std::convert::Infallible) -> Self {
        match e {}
    }
}

impl From<std::io::Error> for DocShardError {
    fn from(e: std::io::Error) -> Self {
        DocShardError::Io(e.to_string())
    }
}

#[cfg(feature = "tantivy-store")]
impl From<tantivy::TantivyError> for DocShardError {
    fn from(e: tantivy::TantivyError) -> Self {
        DocShardError::Tantivy(e.to_string())
    }
}

impl From<serde_json::Error> for DocShardError {
    fn from(e: serde_json::Error) -> Self {
        DocShardError::Json(e.to_string())
    }
}

#[cfg(feature = "opensearch")]
impl From<reqwest::Error> for DocShardError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            DocShardError::Unavailable(e.to_string())
        } else if e.is_decode() {
            DocShardError::Json(e.to_string())
        } else {
            DocShardError::Store(e.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for DocShardError {
    fn from(e: tokio::task::JoinError) -> Self {
        DocShardError::Store(format!("store task failed: {}", e))
    }
}

impl DocShardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DocShardError::SchemaViolation { .. } => StatusCode::BAD_REQUEST,
            DocShardError::TypeMismatch { .. } => StatusCode::BAD_REQUEST,
            DocShardError::InvalidDocumentId(_) => StatusCode::BAD_REQUEST,
            DocShardError::InvalidTenant(_) => StatusCode::BAD_REQUEST,
            DocShardError::InvalidSchema(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DocShardError::InvalidDocument(_) => StatusCode::BAD_REQUEST,
            DocShardError::DocumentTooLarge { .. } => StatusCode::BAD_REQUEST,
            DocShardError::TooManyConcurrentWrites { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DocShardError::Store(_) => StatusCode::BAD_GATEWAY,
            DocShardError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DocShardError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DocShardError::Tantivy(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DocShardError::Json(_) => StatusCode::BAD_REQUEST,
            DocShardError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures raised before any store interaction.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DocShardError::SchemaViolation { .. }
                | DocShardError::TypeMismatch { .. }
                | DocShardError::InvalidDocumentId(_)
                | DocShardError::InvalidTenant(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_client_errors() {
        let err = DocShardError::SchemaViolation {
            entity: "job_parameters".to_string(),
            field: "Foo".to_string(),
        };
        assert!(err.is_validation());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Foo"));
    }

    #[test]
    fn test_store_errors_are_not_validation() {
        let err = DocShardError::Unavailable("connection refused".to_string());
        assert!(!err.is_validation());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: DocShardError = io.into();
        assert!(matches!(err, DocShardError::Io(ref m) if m.contains("missing")));
    }
}
