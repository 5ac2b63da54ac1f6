//! Refresh Controller
//!
//! Owns the fetch-transform-render cycle. Every user trigger supersedes the
//! in-flight session: the stale fetch is aborted without being awaited, and
//! even if it resolves later its commit is gated out by issue order. Chart
//! state and the metrics readout are committed as one block or not at all.

use futures_util::future::{AbortHandle, Abortable, Aborted};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::inference::{InferenceApi, InferencePayload};
use crate::metrics::{format_metrics, MetricsPanel};
use crate::render::ChartRenderer;
use crate::transform::transform;
use crate::types::SessionOutcome;

/// User-facing failure sink; called at most once per failed refresh cycle
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// The rendered half of the dashboard: the four panes plus the metrics strip
pub struct DashboardView {
    renderer: ChartRenderer,
    metrics: Arc<dyn MetricsPanel>,
}

impl DashboardView {
    pub fn new(renderer: ChartRenderer, metrics: Arc<dyn MetricsPanel>) -> Self {
        Self { renderer, metrics }
    }

    /// Apply one payload to panes and metrics. Callers hold the view lock
    /// for the whole call, which is what makes the commit atomic.
    fn commit(&mut self, payload: &InferencePayload) {
        let series = transform(payload);
        self.renderer.render(&series);
        let summary = payload.metrics_backtest.unwrap_or_default();
        self.metrics.show(&format_metrics(&summary));
    }
}

struct SessionHandle {
    id: u64,
    abort: AbortHandle,
}

/// Top-level orchestrator for user-triggered refreshes
pub struct RefreshController {
    client: Arc<dyn InferenceApi>,
    view: Arc<Mutex<DashboardView>>,
    notifier: Arc<dyn Notifier>,
    /// Id of the most recently issued session; gates every commit
    issued: Arc<AtomicU64>,
    active: Option<SessionHandle>,
    default_backtest_days: u32,
}

impl RefreshController {
    pub fn new(
        client: Arc<dyn InferenceApi>,
        view: DashboardView,
        notifier: Arc<dyn Notifier>,
        default_backtest_days: u32,
    ) -> Self {
        Self {
            client,
            view: Arc::new(Mutex::new(view)),
            notifier,
            issued: Arc::new(AtomicU64::new(0)),
            active: None,
            default_backtest_days,
        }
    }

    /// Parse the backtest-window control value; any input that is not a
    /// positive integer falls back to the configured default.
    pub fn resolve_backtest_days(&self, raw: Option<&str>) -> u32 {
        raw.and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|days| *days > 0)
            .unwrap_or(self.default_backtest_days)
    }

    /// Handle a user trigger (symbol change, window change, initial load).
    ///
    /// Supersedes any in-flight session and returns a handle resolving to
    /// the new session's terminal outcome. An empty symbol is a no-op.
    pub fn trigger(&mut self, symbol: &str, backtest_days: u32) -> Option<JoinHandle<SessionOutcome>> {
        if symbol.is_empty() {
            return None;
        }

        // Supersede: signal the previous session, never await it.
        if let Some(previous) = self.active.take() {
            previous.abort.abort();
            debug!(session = previous.id, "superseded in-flight refresh");
        }

        let id = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let (abort, registration) = AbortHandle::new_pair();
        self.active = Some(SessionHandle { id, abort });

        let client = Arc::clone(&self.client);
        let view = Arc::clone(&self.view);
        let notifier = Arc::clone(&self.notifier);
        let issued = Arc::clone(&self.issued);
        let symbol = symbol.to_string();

        info!(session = id, %symbol, backtest_days, "refresh issued");

        Some(tokio::spawn(async move {
            let fetched =
                Abortable::new(client.infer(&symbol, backtest_days), registration).await;

            let mut view = view.lock().await;

            // Commit gate: only the most recently issued session may touch
            // rendered state, regardless of resolution order.
            if issued.load(Ordering::SeqCst) != id {
                debug!(session = id, "stale session resolved after supersede");
                return SessionOutcome::Cancelled;
            }

            match fetched {
                Err(Aborted) => {
                    debug!(session = id, "refresh cancelled");
                    SessionOutcome::Cancelled
                }
                Ok(Ok(payload)) => {
                    view.commit(&payload);
                    info!(
                        session = id,
                        backtest_rows = payload.backtest_df.as_ref().map_or(0, Vec::len),
                        forecast_rows = payload.future_df.as_ref().map_or(0, Vec::len),
                        "refresh rendered"
                    );
                    SessionOutcome::Rendered
                }
                Ok(Err(error)) => {
                    // Previous render and metrics stay as they are; stale
                    // but valid beats blanked.
                    warn!(session = id, %error, "refresh failed");
                    notifier.notify(&format!("Could not load dashboard data: {error}"));
                    SessionOutcome::Failed
                }
            }
        }))
    }
}
