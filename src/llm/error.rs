//! Gateway error taxonomy.

use thiserror::Error;

/// Coarse classification of a failed gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// 429 from the gateway or provider
    RateLimited,
    /// 401/403
    Unauthorized,
    /// Model or route not found
    NotFound,
    /// Other 4xx
    BadRequest,
    /// 5xx
    ServerError,
    /// Connection, DNS, TLS...
    Transport,
    /// Call exceeded the per-call timeout
    Timeout,
    /// Body could not be decoded
    InvalidResponse,
}

impl GatewayErrorKind {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError | Self::Transport | Self::Timeout
        )
    }
}

/// Error reported by an [`LlmGateway`](super::LlmGateway).
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
    pub status: Option<u16>,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            kind: classify_http_status(status),
            message: body.into(),
            status: Some(status),
        }
    }

    pub fn timeout(after_secs: u64) -> Self {
        Self::new(
            GatewayErrorKind::Timeout,
            format!("no response after {}s", after_secs),
        )
    }
}

/// Map an HTTP status code to an error kind.
pub fn classify_http_status(status: u16) -> GatewayErrorKind {
    match status {
        429 => GatewayErrorKind::RateLimited,
        401 | 403 => GatewayErrorKind::Unauthorized,
        404 => GatewayErrorKind::NotFound,
        400..=499 => GatewayErrorKind::BadRequest,
        _ => GatewayErrorKind::ServerError,
    }
}
