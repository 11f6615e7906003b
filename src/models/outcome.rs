use std::time::Duration;

/// Classification of a terminal request error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorKind {
    /// No error, the request succeeded
    #[default]
    None,
    /// HTTP 404, terminal and counted separately from failures
    NotFound,
    /// Other 4xx response
    ClientError,
    /// 5xx response after exhausting retries
    ServerError,
    /// Connect/timeout/protocol failure after exhausting retries
    Network,
    /// Caller-driven cancellation mid-retry
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::None => "none",
            ErrorKind::NotFound => "not_found",
            ErrorKind::ClientError => "client_error",
            ErrorKind::ServerError => "server_error",
            ErrorKind::Network => "network",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

/// Terminal result of one logical request, as exchanged between the
/// retrying client, the whitelist manager, and the statistics collector.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub success: bool,
    pub http_status: Option<u16>,
    pub proxy_used: Option<String>,
    pub elapsed: Duration,
    pub error_kind: ErrorKind,
}

impl RequestOutcome {
    pub fn success(status: u16, proxy_used: Option<String>, elapsed: Duration) -> Self {
        Self {
            success: true,
            http_status: Some(status),
            proxy_used,
            elapsed,
            error_kind: ErrorKind::None,
        }
    }

    pub fn failure(
        status: Option<u16>,
        proxy_used: Option<String>,
        elapsed: Duration,
        error_kind: ErrorKind,
    ) -> Self {
        Self {
            success: false,
            http_status: status,
            proxy_used,
            elapsed,
            error_kind,
        }
    }
}
