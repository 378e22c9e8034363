//! HTTP collector transport.
//!
//! Posts JSON bodies to the three `/api/track/*` endpoints under a base URL.
//! A non-2xx status counts as a delivery failure. Success bodies are parsed
//! as JSON when possible; an empty or non-JSON body is an empty ack.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{Ack, CollectorRequest, Endpoint};

use super::Transport;
use super::beacon::BeaconQueue;

// ============================================================================
// Constants
// ============================================================================

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Helpers
// ============================================================================

/// Resolves an endpoint under `base_url`, keeping any base path prefix.
pub(crate) fn endpoint_url(base_url: &Url, endpoint: Endpoint) -> Result<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let relative = endpoint.path().trim_start_matches('/');
    Ok(base.join(relative)?)
}

// ============================================================================
// HttpTransport
// ============================================================================

/// Transport posting to an HTTP collector.
///
/// Cloning shares the HTTP client and the beacon worker.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    beacon: BeaconQueue,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Creates a transport with the default request timeout.
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::with_timeout`].
    pub fn new(base_url: Url) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a transport with a custom request timeout.
    ///
    /// Must be called inside a tokio runtime: the beacon worker is spawned
    /// here.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is not http(s) or no runtime is active
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub fn with_timeout(base_url: Url, request_timeout: Duration) -> Result<Self> {
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Collector URL must be http or https, got: {base_url}"
            )));
        }

        let runtime = Handle::try_current().map_err(|_| {
            Error::config("HttpTransport must be created inside a tokio runtime")
        })?;

        let client = Client::builder().timeout(request_timeout).build()?;
        let beacon = BeaconQueue::spawn(client.clone(), base_url.clone(), &runtime);

        debug!(base_url = %base_url, timeout_ms = request_timeout.as_millis() as u64, "HTTP transport ready");

        Ok(Self {
            client,
            base_url,
            beacon,
        })
    }

    /// Returns the collector base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the full URL of an endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the URL cannot be joined.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url> {
        endpoint_url(&self.base_url, endpoint)
    }

    /// Stops the beacon worker after already queued beacons.
    pub fn shutdown(&self) {
        self.beacon.shutdown();
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &CollectorRequest) -> Result<Ack> {
        let endpoint = request.endpoint();
        let url = self.endpoint_url(endpoint)?;

        let response = self.client.post(url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(endpoint, status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        trace!(%endpoint, status = status.as_u16(), "Collector replied");
        Ok(Ack::new(body))
    }

    fn send_best_effort(&self, request: CollectorRequest) {
        let endpoint = request.endpoint();
        if let Err(e) = self.beacon.enqueue(request) {
            warn!(%endpoint, error = %e, "Best-effort send dropped");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
