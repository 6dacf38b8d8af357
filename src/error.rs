//! Error types for the AWX and Prometheus client cores
//!
//! The MCP adapter converts these to error tool results; nothing in this
//! module knows about the protocol layer.

use thiserror::Error;

/// Result type for client-core operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Unified error type for the broker core
#[derive(Debug, Error)]
pub enum ClientError {
    // Configuration
    #[error("either an API token or username/password must be provided")]
    MissingCredentials,

    // Authentication
    #[error("authentication failed: {0}")]
    Auth(String),

    // Argument validation (adapter-level; never reaches the backend)
    #[error("{0}")]
    Validation(String),

    // Template resolution
    #[error("job template '{identifier}' not found. Available templates: {available}")]
    TemplateNotFound {
        identifier: String,
        available: String,
    },

    // Launch permission probe
    #[error("insufficient permissions to launch this job template")]
    InsufficientPermissions,

    // Backend returned a structured error detail
    #[error("AWX API error: {0}")]
    Backend(String),

    // Backend returned a non-2xx without a parseable detail
    #[error("AWX API error: status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("metrics query failed: {error_type} - {message}")]
    MetricsQuery { error_type: String, message: String },

    #[error("Prometheus client not configured")]
    MetricsUnavailable,
}

impl ClientError {
    /// Validation error from any displayable message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::TemplateNotFound { .. })
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, ClientError::InsufficientPermissions)
            || matches!(self, ClientError::Status { status: 403, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_not_found_display() {
        let err = ClientError::TemplateNotFound {
            identifier: "99".into(),
            available: "'deploy' (ID: 7)".into(),
        };
        let text = err.to_string();
        assert!(text.contains("not found"));
        assert!(text.contains("'deploy' (ID: 7)"));
    }

    #[test]
    fn test_status_display_carries_code() {
        let err = ClientError::Status {
            status: 502,
            body: "bad gateway".into(),
        };
        assert!(err.to_string().contains("status 502"));
    }

    #[test]
    fn test_error_categories() {
        assert!(ClientError::InsufficientPermissions.is_permission());
        assert!(ClientError::Status { status: 403, body: String::new() }.is_permission());
        assert!(!ClientError::Status { status: 500, body: String::new() }.is_permission());
        assert!(ClientError::TemplateNotFound {
            identifier: "x".into(),
            available: String::new()
        }
        .is_not_found());
    }
}
