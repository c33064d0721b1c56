use std::time::Duration;

use async_trait::async_trait;
use http::{Request, Response};
use hyper::body::HttpBody;
use hyper::client::HttpConnector;
use hyper::{Body, Client};
use hyper_rustls::HttpsConnector;

use crate::error::WebPushError;
use crate::transport::{tighter, PushTransport, RequestTimeouts, MAX_RESPONSE_SIZE};

/// The default transport: `hyper` with `hyper-rustls` for TLS, pure-Rust and
/// ideal for docker/musl builds that don't want native-tls. Clones share the
/// same connection pool.
///
/// A single HTTP connection pool is kept with a 12-hour idle timeout so
/// HTTP/2 connections to the push service stay warm between sends.
#[derive(Clone)]
pub struct HyperRustlsTransport {
    client: Client<HttpsConnector<HttpConnector>>,
}

impl Default for HyperRustlsTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl HyperRustlsTransport {
    /// Creates a transport whose TCP/TLS handshake is bounded by `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Self {
        let mut http_connector = HttpConnector::new();
        http_connector.set_connect_timeout(Some(connect_timeout));
        http_connector.enforce_http(false);

        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(12 * 3600))
            .build(https);

        HyperRustlsTransport { client }
    }
}

#[async_trait]
impl PushTransport for HyperRustlsTransport {
    async fn execute(&self, request: Request<Vec<u8>>, timeouts: RequestTimeouts) -> Result<Response<Vec<u8>>, WebPushError> {
        let (parts, body) = request.into_parts();
        let request = Request::from_parts(parts, Body::from(body));

        let responding = self.client.request(request);

        let send_bound = tighter(timeouts.deadline, timeouts.send_timeout);
        let response = match send_bound {
            Some(bound) => tokio::time::timeout(bound, responding)
                .await
                .map_err(|_| WebPushError::DeadlineExceeded(bound))?
                .map_err(|e| WebPushError::Transport(e.to_string()))?,
            None => responding.await.map_err(|e| WebPushError::Transport(e.to_string()))?,
        };

        let (parts, mut body) = response.into_parts();
        let read_body = async {
            let mut buf = Vec::new();
            while let Some(chunk) = body.data().await {
                let chunk = chunk.map_err(|e| WebPushError::Transport(e.to_string()))?;
                if buf.len() + chunk.len() > MAX_RESPONSE_SIZE {
                    return Err(WebPushError::ResponseTooLarge);
                }
                buf.extend_from_slice(&chunk);
            }
            Ok(buf)
        };

        let read_bound = tighter(timeouts.deadline, timeouts.confirmation_timeout);
        let buf = match read_bound {
            Some(bound) => tokio::time::timeout(bound, read_body).await.map_err(|_| WebPushError::DeadlineExceeded(bound))??,
            None => read_body.await?,
        };

        Ok(Response::from_parts(parts, buf))
    }

    async fn shutdown(&self) {
        // hyper's pool drains idle connections as Clients are dropped; there is
        // no explicit close handle to call here.
    }
}
