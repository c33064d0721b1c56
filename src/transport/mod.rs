//! The HTTP transport collaborator named in the crate's external interfaces:
//! `execute(request, deadline) -> response` plus a graceful `shutdown()`.

use std::time::Duration;

use async_trait::async_trait;
use http::{Request, Response};

use crate::error::WebPushError;

#[cfg(feature = "hyper-rustls-client")]
mod hyper_rustls_transport;
#[cfg(feature = "hyper-client")]
mod hyper_tls_transport;

#[cfg(feature = "hyper-rustls-client")]
pub use hyper_rustls_transport::HyperRustlsTransport;
#[cfg(feature = "hyper-client")]
pub use hyper_tls_transport::HyperTlsTransport;

/// The largest response body the crate will buffer before erroring.
pub const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// The timeout budget for a single HTTP attempt, bounding distinct phases
/// (§5): `deadline` is the remaining retry budget and bounds the whole
/// attempt, `send_timeout` bounds writing the request and receiving
/// headers, and `confirmation_timeout` bounds reading the response body.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestTimeouts {
    pub deadline: Option<Duration>,
    pub send_timeout: Option<Duration>,
    pub confirmation_timeout: Option<Duration>,
}

/// The tighter of two optional timeouts, treating `None` as "no bound".
#[cfg(any(feature = "hyper-rustls-client", feature = "hyper-client"))]
pub(crate) fn tighter(a: Option<Duration>, b: Option<Duration>) -> Option<Duration> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Capability set a push manager needs from its HTTP client: send one
/// request, bounded by `timeouts`, and shut down the connection pool on
/// graceful exit.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Executes `request`. When a bound in `timeouts` elapses before the
    /// corresponding phase completes, returns [`WebPushError::DeadlineExceeded`].
    async fn execute(&self, request: Request<Vec<u8>>, timeouts: RequestTimeouts) -> Result<Response<Vec<u8>>, WebPushError>;

    /// Stops accepting new work and closes the connection pool. Called once,
    /// at graceful shutdown.
    async fn shutdown(&self);
}
