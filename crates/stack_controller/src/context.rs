use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleet_core::Error;
use kube::runtime::events::Reporter;
use kube::Client;
use prometheus::{histogram_opts, opts, HistogramVec, IntCounter, IntCounterVec, Registry};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use cluster_pool::EditionCache;

use crate::discovery::CrdAvailability;

/// Per-reconcile-loop metrics, relabeled for the two parent kinds this
/// controller owns.
#[derive(Clone)]
pub struct Metrics {
    pub reconciliations: IntCounter,
    pub failures: IntCounterVec,
    pub reconcile_duration: HistogramVec,
}

impl Default for Metrics {
    fn default() -> Self {
        let reconcile_duration = HistogramVec::new(
            histogram_opts!(
                "stack_controller_reconcile_duration_seconds",
                "time to complete one reconcile pass, in seconds",
            )
            .buckets(vec![0.01, 0.1, 0.25, 0.5, 1., 5., 15., 60.]),
            &["kind"],
        )
        .expect("static histogram config is valid");
        let failures = IntCounterVec::new(
            opts!("stack_controller_reconcile_errors_total", "reconcile errors by kind and error label"),
            &["kind", "error"],
        )
        .expect("static counter config is valid");
        let reconciliations = IntCounter::new("stack_controller_reconciliations_total", "completed reconcile passes")
            .expect("static counter config is valid");
        Metrics {
            reconciliations,
            failures,
            reconcile_duration,
        }
    }
}

impl Metrics {
    pub fn register(self, registry: &Registry) -> Result<Self, prometheus::Error> {
        registry.register(Box::new(self.reconcile_duration.clone()))?;
        registry.register(Box::new(self.failures.clone()))?;
        registry.register(Box::new(self.reconciliations.clone()))?;
        Ok(self)
    }

    pub fn reconcile_failure(&self, kind: &str, error: &Error) {
        self.failures.with_label_values(&[kind, error.metric_label().as_ref()]).inc();
    }

    pub fn count_and_measure(&self, kind: &str) -> ReconcileMeasurer {
        self.reconciliations.inc();
        ReconcileMeasurer {
            start: Instant::now(),
            metric: self.reconcile_duration.clone(),
            kind: kind.to_string(),
        }
    }
}

pub struct ReconcileMeasurer {
    start: Instant,
    metric: HistogramVec,
    kind: String,
}

impl Drop for ReconcileMeasurer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_millis() as f64 / 1000.0;
        self.metric.with_label_values(&[self.kind.as_str()]).observe(duration);
    }
}

/// Diagnostics exposed by the operator's HTTP server, mirroring the
/// teacher's reconciler-loop diagnostics shape.
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    #[serde(skip)]
    pub reporter: Reporter,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
            reporter: "stack-controller".into(),
        }
    }
}

/// State shared between both reconcilers and the web server.
#[derive(Clone, Default)]
pub struct State {
    diagnostics: Arc<RwLock<Diagnostics>>,
    registry: Registry,
}

impl State {
    pub fn metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    pub fn to_context(
        &self,
        client: Client,
        availability: Arc<CrdAvailability>,
        editions: Arc<EditionCache>,
        local_cluster_name: String,
        requeue_after: std::time::Duration,
    ) -> Arc<Context> {
        Arc::new(Context {
            client,
            metrics: Metrics::default().register(&self.registry).expect("metric names are unique"),
            diagnostics: self.diagnostics.clone(),
            availability,
            editions,
            local_cluster_name,
            requeue_after,
        })
    }
}

/// Context threaded through every reconcile invocation. The two parent kinds
/// this controller owns both live in the cluster the operator runs in; the
/// edition lookup for GatewayBundle add-ons consults the same cache the
/// health supervisor populates, keyed by `local_cluster_name`.
#[derive(Clone)]
pub struct Context {
    pub client: Client,
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    pub metrics: Metrics,
    pub availability: Arc<CrdAvailability>,
    pub editions: Arc<EditionCache>,
    pub local_cluster_name: String,
    pub requeue_after: std::time::Duration,
}
