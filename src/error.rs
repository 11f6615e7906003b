use thiserror::Error;

/// Unified error type for the Forager retrieval core
#[derive(Error, Debug)]
pub enum ForagerError {
    // Proxy errors
    #[error("No proxies available")]
    NoProxiesAvailable,

    #[error("Invalid proxy URL: {0}")]
    InvalidProxyUrl(String),

    #[error("Unsupported proxy scheme: {0}")]
    UnsupportedScheme(String),

    // Request outcomes
    #[error("Resource not found: {url}")]
    NotFound { url: String },

    #[error("Client error {status} for {url}")]
    ClientError { status: u16, url: String },

    #[error("Request failed after {attempts} attempts: {last_error}")]
    RequestExhausted { attempts: u32, last_error: String },

    #[error("Request cancelled")]
    Cancelled,

    #[error("Operation timed out")]
    Timeout,

    // Proxy source errors
    #[error("Proxy source '{source_name}' failed: {message}")]
    SourceFetch {
        source_name: &'static str,
        message: String,
    },

    #[error("Proxy source returned no usable rows")]
    EmptySource,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Persistence errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Forager operations
pub type Result<T> = std::result::Result<T, ForagerError>;

impl ForagerError {
    /// Whether a fresh attempt at the same logical request could succeed.
    ///
    /// Transport errors are transient, and an empty proxy selection clears
    /// up once cooldowns expire. Not-found and ordinary client errors are
    /// terminal. Exhausted-retry errors are also terminal because the
    /// client has already run its bounded retry loop by the time they
    /// surface.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ForagerError::Http(_) | ForagerError::Timeout | ForagerError::NoProxiesAvailable
        )
    }
}

// Convert from URL parse errors
impl From<url::ParseError> for ForagerError {
    fn from(err: url::ParseError) -> Self {
        ForagerError::InvalidProxyUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ForagerError::Timeout.is_retryable());
        assert!(ForagerError::NoProxiesAvailable.is_retryable());
        assert!(!ForagerError::NotFound {
            url: "http://example.com/x".into()
        }
        .is_retryable());
        assert!(!ForagerError::ClientError {
            status: 403,
            url: "http://example.com/x".into()
        }
        .is_retryable());
        assert!(!ForagerError::Cancelled.is_retryable());
        assert!(!ForagerError::RequestExhausted {
            attempts: 5,
            last_error: "x".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = ForagerError::RequestExhausted {
            attempts: 5,
            last_error: "connect refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "Request failed after 5 attempts: connect refused"
        );

        let err = ForagerError::SourceFetch {
            source_name: "free-proxy-list.net",
            message: "table not found".into(),
        };
        assert!(err.to_string().contains("free-proxy-list.net"));
    }
}
