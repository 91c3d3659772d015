//! Cached health checks for the model server.
//!
//! [`HealthMonitor`] answers "is the backend up?" without hitting the network
//! more than once per check interval. Probe failures never escape; they are
//! recorded in the [`HealthSnapshot`] instead.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api_types::TagsResponse;

/// Last known state of the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthSnapshot {
    /// Verdict of the last probe. False until the first probe succeeds.
    pub healthy: bool,
    /// When the last probe finished; `None` before the first probe.
    pub checked_at: Option<Instant>,
    /// Models reported by the last successful probe.
    pub models: BTreeSet<String>,
    /// Failure reason of the last probe, if it failed.
    pub error: Option<String>,
}

impl HealthSnapshot {
    /// Whether the snapshot is still valid for `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.checked_at
            .map(|at| at.elapsed() < ttl)
            .unwrap_or(false)
    }

    /// Whether the backend reported the given model.
    pub fn has_model(&self, model: &str) -> bool {
        self.models.contains(model)
    }
}

/// A liveness check against the backend.
#[async_trait]
pub trait BackendProbe: Send + Sync {
    /// Return the backend's model set, or a human-readable failure reason.
    async fn probe(&self) -> Result<BTreeSet<String>, String>;
}

/// Probe that lists models via `GET /api/tags`.
pub struct TagsProbe {
    client: Client,
    url: String,
    timeout: Duration,
}

impl TagsProbe {
    /// Create a probe for the given tags URL.
    pub fn new(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl BackendProbe for TagsProbe {
    async fn probe(&self) -> Result<BTreeSet<String>, String> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("probe timed out after {} ms", self.timeout.as_millis())
                } else {
                    format!("connection failed: {}", e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("probe returned HTTP {}", status.as_u16()));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| format!("malformed tags payload: {}", e))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

type PendingProbe = Shared<BoxFuture<'static, bool>>;

/// TTL-cached backend availability.
///
/// At most one probe runs at a time; callers arriving while it is in flight
/// await the same result.
pub struct HealthMonitor {
    probe: Arc<dyn BackendProbe>,
    ttl: Duration,
    snapshot: Arc<RwLock<HealthSnapshot>>,
    in_flight: Mutex<Option<(u64, PendingProbe)>>,
    next_ticket: AtomicU64,
}

impl HealthMonitor {
    /// Create a monitor that trusts a verdict for `ttl`.
    pub fn new(probe: Arc<dyn BackendProbe>, ttl: Duration) -> Self {
        Self {
            probe,
            ttl,
            snapshot: Arc::new(RwLock::new(HealthSnapshot::default())),
            in_flight: Mutex::new(None),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Whether the backend is available.
    ///
    /// Serves the cached verdict while it is younger than the TTL; otherwise
    /// joins the in-flight probe or starts one. The snapshot lock is not held
    /// during the probe.
    pub async fn is_available(&self) -> bool {
        if let Some(healthy) = self.fresh_verdict().await {
            return healthy;
        }

        let (ticket, pending) = {
            let mut in_flight = self.in_flight.lock().await;
            let joined = in_flight.as_ref().map(|(t, p)| (*t, p.clone()));
            match joined {
                Some(existing) => {
                    debug!("Joining in-flight health probe");
                    existing
                }
                None => {
                    // A probe may have finished between the check above and taking the lock.
                    if let Some(healthy) = self.fresh_verdict().await {
                        return healthy;
                    }
                    debug!("Health verdict stale, probing backend");
                    let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                    let pending = refresh(self.probe.clone(), self.snapshot.clone())
                        .boxed()
                        .shared();
                    *in_flight = Some((ticket, pending.clone()));
                    (ticket, pending)
                }
            }
        };

        let healthy = pending.await;

        let mut in_flight = self.in_flight.lock().await;
        if in_flight.as_ref().map(|(t, _)| *t) == Some(ticket) {
            *in_flight = None;
        }
        healthy
    }

    async fn fresh_verdict(&self) -> Option<bool> {
        let snapshot = self.snapshot.read().await;
        snapshot.is_fresh(self.ttl).then_some(snapshot.healthy)
    }

    /// A copy of the current snapshot, without probing.
    pub async fn snapshot(&self) -> HealthSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Force the next [`is_available`](Self::is_available) call to probe.
    pub async fn invalidate(&self) {
        self.snapshot.write().await.checked_at = None;
    }

    /// The verdict TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

async fn refresh(probe: Arc<dyn BackendProbe>, snapshot: Arc<RwLock<HealthSnapshot>>) -> bool {
    let result = probe.probe().await;

    let mut snapshot = snapshot.write().await;
    let was_healthy = snapshot.healthy;
    *snapshot = match result {
        Ok(models) => {
            if !was_healthy {
                info!("Backend healthy ({} models available)", models.len());
            }
            HealthSnapshot {
                healthy: true,
                checked_at: Some(Instant::now()),
                models,
                error: None,
            }
        }
        Err(reason) => {
            warn!("Backend health probe failed: {}", reason);
            HealthSnapshot {
                healthy: false,
                checked_at: Some(Instant::now()),
                models: BTreeSet::new(),
                error: Some(reason),
            }
        }
    };
    snapshot.healthy
}
