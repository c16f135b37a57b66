//! Fire-and-forget transport for serialized pose payloads.
//!
//! [`Dispatcher`] is the seam between the streaming controller and the
//! network.  Implementations must return immediately: the controller calls
//! [`Dispatcher::dispatch`] from the tracking source's thread.
//!
//! [`HttpDispatcher`] POSTs each payload to a fixed endpoint.  The request is
//! built on the caller's thread and the exchange is spawned onto a Tokio
//! runtime through its [`Handle`], so the caller does not have to be a Tokio
//! worker.  Outcomes are counted in [`StreamStats`] and otherwise dropped:
//! no retry, no queue, no error reaches the caller.

use std::sync::Arc;
use std::time::Duration;

use puppetry_types::PuppetError;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::codec;
use crate::stats::StreamStats;

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher seam
// ─────────────────────────────────────────────────────────────────────────────

/// Sink for serialized payloads.
pub trait Dispatcher: Send + Sync {
    /// Start sending `payload`.  Must not block and must not panic on
    /// network failure.
    fn dispatch(&self, payload: Vec<u8>);
}

/// Optional limits on the HTTP transport.
///
/// Both are off by default, which leaves in-flight sends unbounded and
/// timeouts to the HTTP stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportOptions {
    /// Maximum number of concurrent in-flight sends.  A payload that finds
    /// every slot taken is discarded.
    pub max_in_flight: Option<usize>,
    /// Whole-request timeout.
    ///
    /// Departs from the default behaviour, where a send is left to the HTTP
    /// stack's own timeouts and the application never cuts it short.  Only
    /// set it to bound how long a capped in-flight slot can stay taken.
    pub request_timeout: Option<Duration>,
}

// ─────────────────────────────────────────────────────────────────────────────
// HttpDispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// POSTs payloads to a fixed HTTP endpoint without awaiting the result.
pub struct HttpDispatcher {
    endpoint: Url,
    client: reqwest::Client,
    runtime: Handle,
    in_flight: Option<Arc<Semaphore>>,
    stats: Arc<StreamStats>,
}

impl HttpDispatcher {
    /// Build a dispatcher targeting `endpoint`.
    ///
    /// # Errors
    ///
    /// - [`PuppetError::InvalidEndpoint`] – `endpoint` is not an absolute
    ///   `http`/`https` URL.
    /// - [`PuppetError::Runtime`] – the HTTP client could not be built.
    pub fn new(
        endpoint: &str,
        runtime: Handle,
        options: TransportOptions,
        stats: Arc<StreamStats>,
    ) -> Result<Self, PuppetError> {
        let endpoint = parse_endpoint(endpoint)?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PuppetError::Runtime(format!("http client: {e}")))?;
        Ok(Self::with_client(
            endpoint,
            client,
            runtime,
            options.max_in_flight,
            stats,
        ))
    }

    /// Build a dispatcher around an existing client.
    pub fn with_client(
        endpoint: Url,
        client: reqwest::Client,
        runtime: Handle,
        max_in_flight: Option<usize>,
        stats: Arc<StreamStats>,
    ) -> Self {
        Self {
            endpoint,
            client,
            runtime,
            in_flight: max_in_flight.map(|n| Arc::new(Semaphore::new(n))),
            stats,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Dispatcher for HttpDispatcher {
    fn dispatch(&self, payload: Vec<u8>) {
        let permit = match &self.in_flight {
            None => None,
            Some(slots) => match Arc::clone(slots).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    trace!("in-flight cap reached; dropping pose payload");
                    self.stats.record_dropped();
                    return;
                }
            },
        };

        let request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, codec::CONTENT_TYPE)
            .body(payload);
        let stats = Arc::clone(&self.stats);
        self.stats.record_dispatched();

        self.runtime.spawn(async move {
            let _permit = permit;
            match request.send().await {
                Ok(response) if response.status().is_success() => stats.record_delivered(),
                Ok(response) => {
                    debug!(status = %response.status(), "pose endpoint answered with non-success status");
                    stats.record_failed();
                }
                Err(e) => {
                    debug!(error = %e, "pose send failed");
                    stats.record_failed();
                }
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Endpoint parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parse and validate a pose endpoint URL.
pub fn parse_endpoint(raw: &str) -> Result<Url, PuppetError> {
    let url = Url::parse(raw).map_err(|e| PuppetError::InvalidEndpoint {
        endpoint: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PuppetError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
