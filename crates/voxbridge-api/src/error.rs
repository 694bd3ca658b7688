use thiserror::Error;

/// Top-level error type for the `voxbridge-api` crate.
///
/// Only transport problems end up here. A non-200 answer from an actuator is
/// still a response and is returned as [`HttpResponse`](crate::HttpResponse).
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Only plain `http`/`https` endpoints can be actuated.
    #[error("Unsupported URL scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    /// Request did not complete within its timeout.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl Error {
    /// Returns `true` if the failure came from the network rather than
    /// from a malformed request.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}
