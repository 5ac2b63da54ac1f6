//! Tests for the refresh/render coordination layer

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::{broadcast, Notify};

    use inferdash::inference::{
        FetchError, InferenceApi, InferencePayload, MetricsSummary, ObservationRecord,
    };
    use inferdash::metrics::{MetricsPanel, MetricsReadout, PLACEHOLDER};
    use inferdash::refresh::{DashboardView, Notifier, RefreshController};
    use inferdash::render::headless::{headless_pane_set, HeadlessPane};
    use inferdash::render::{ChartRenderer, Theme};
    use inferdash::resize::{DisplayFrameClock, FrameClock, ManualFrameClock};
    use inferdash::types::{AxisRange, SessionOutcome};

    // ============================================================================
    // Test doubles
    // ============================================================================

    /// Inference fake: `slow_symbol` requests block until `release` fires,
    /// everything else resolves immediately.
    struct GatedClient {
        slow_symbol: String,
        release: Arc<Notify>,
        fail_slow: bool,
    }

    impl GatedClient {
        fn build(slow_symbol: &str, fail_slow: bool) -> (Arc<Self>, Arc<Notify>) {
            let release = Arc::new(Notify::new());
            (
                Arc::new(Self {
                    slow_symbol: slow_symbol.to_string(),
                    release: release.clone(),
                    fail_slow,
                }),
                release,
            )
        }

        fn new(slow_symbol: &str) -> (Arc<Self>, Arc<Notify>) {
            Self::build(slow_symbol, false)
        }

        fn failing_slow(slow_symbol: &str) -> (Arc<Self>, Arc<Notify>) {
            Self::build(slow_symbol, true)
        }
    }

    #[async_trait]
    impl InferenceApi for GatedClient {
        async fn symbols(&self) -> Result<Vec<String>, FetchError> {
            Ok(vec![self.slow_symbol.clone()])
        }

        async fn infer(
            &self,
            symbol: &str,
            backtest_days: u32,
        ) -> Result<InferencePayload, FetchError> {
            if symbol == self.slow_symbol {
                self.release.notified().await;
                if self.fail_slow {
                    return Err(FetchError::Status {
                        status: 500,
                        path: "/infer".to_string(),
                    });
                }
            }
            Ok(payload_for(symbol, backtest_days as usize))
        }
    }

    struct RecordingPanel {
        shown: Mutex<Vec<MetricsReadout>>,
    }

    impl RecordingPanel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                shown: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> Option<MetricsReadout> {
            self.shown.lock().unwrap().last().cloned()
        }

        fn count(&self) -> usize {
            self.shown.lock().unwrap().len()
        }
    }

    impl MetricsPanel for RecordingPanel {
        fn show(&self, readout: &MetricsReadout) {
            self.shown.lock().unwrap().push(readout.clone());
        }
    }

    struct CountingNotifier {
        calls: AtomicUsize,
    }

    impl CountingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Notifier for CountingNotifier {
        fn notify(&self, _message: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Payload with `rows` backtest rows; `days` in the metrics carries the
    /// row count so tests can tell payloads apart through the readout.
    fn payload_for(symbol: &str, rows: usize) -> InferencePayload {
        let _ = symbol;
        InferencePayload {
            metrics_backtest: Some(MetricsSummary {
                rmse: Some(1.0),
                days: Some(rows as i64),
                ..MetricsSummary::default()
            }),
            backtest_df: Some(
                (0..rows)
                    .map(|i| ObservationRecord {
                        time: format!("2024-01-{:02}", i + 1),
                        actual: Some(100.0 + i as f64),
                        pred_1step: Some(100.5 + i as f64),
                        rsi_14: Some(50.0),
                        macd: Some(0.1),
                        macd_signal: Some(0.05),
                        macd_hist: Some(0.05),
                        volume: Some(1_000.0),
                        ..ObservationRecord::default()
                    })
                    .collect(),
            ),
            future_df: Some(Vec::new()),
        }
    }

    struct Harness {
        controller: RefreshController,
        panes: [Arc<HeadlessPane>; 4],
        panel: Arc<RecordingPanel>,
        notifier: Arc<CountingNotifier>,
        resize_tx: broadcast::Sender<()>,
    }

    fn harness(client: Arc<dyn InferenceApi>, clock: Arc<dyn FrameClock>) -> Harness {
        let (pane_set, panes) = headless_pane_set();
        let (resize_tx, _) = broadcast::channel(16);
        let renderer = ChartRenderer::new(pane_set, Theme::default(), resize_tx.clone(), clock);
        let panel = RecordingPanel::new();
        let notifier = CountingNotifier::new();
        let controller = RefreshController::new(
            client,
            DashboardView::new(renderer, panel.clone()),
            notifier.clone(),
            60,
        );
        Harness {
            controller,
            panes,
            panel,
            notifier,
            resize_tx,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    // ============================================================================
    // Refresh sessions: supersede, cancellation, failure
    // ============================================================================

    #[tokio::test]
    async fn later_session_wins_regardless_of_resolution_order() {
        let (client, release) = GatedClient::new("SLOW");
        let mut h = harness(client, Arc::new(DisplayFrameClock::default()));

        let slow = h.controller.trigger("SLOW", 5).unwrap();
        settle().await;
        let fast = h.controller.trigger("FAST", 2).unwrap();
        let fast_outcome = fast.await.unwrap();

        // Let the superseded fetch resolve after the newer one committed.
        release.notify_one();
        let slow_outcome = slow.await.unwrap();

        assert_eq!(fast_outcome, SessionOutcome::Rendered);
        assert_eq!(slow_outcome, SessionOutcome::Cancelled);

        // Only the later session's payload is observable.
        assert_eq!(h.panel.count(), 1);
        assert_eq!(h.panel.last().unwrap().days, "2");
        assert_eq!(h.panes[0].snapshot().traces[0].x.len(), 2);
        assert_eq!(h.notifier.count(), 0);
    }

    #[tokio::test]
    async fn superseded_failure_stays_silent() {
        let (client, release) = GatedClient::failing_slow("SLOW");
        let mut h = harness(client, Arc::new(DisplayFrameClock::default()));

        let slow = h.controller.trigger("SLOW", 5).unwrap();
        settle().await;
        let fast = h.controller.trigger("FAST", 3).unwrap();
        fast.await.unwrap();

        release.notify_one();
        let slow_outcome = slow.await.unwrap();

        // The slow session would have failed, but it was superseded first:
        // silent no-op, no user-visible notification.
        assert_eq!(slow_outcome, SessionOutcome::Cancelled);
        assert_eq!(h.notifier.count(), 0);
        assert_eq!(h.panel.last().unwrap().days, "3");
    }

    #[tokio::test]
    async fn failure_notifies_once_and_preserves_previous_render() {
        let (client, release) = GatedClient::failing_slow("SLOW");
        let mut h = harness(client, Arc::new(DisplayFrameClock::default()));

        h.controller.trigger("FAST", 4).unwrap().await.unwrap();
        let rendered = h.panes[0].snapshot();

        let failing = h.controller.trigger("SLOW", 9).unwrap();
        release.notify_one();
        let outcome = failing.await.unwrap();

        assert_eq!(outcome, SessionOutcome::Failed);
        assert_eq!(h.notifier.count(), 1);
        assert_eq!(h.panel.count(), 1);
        assert_eq!(h.panel.last().unwrap().days, "4");
        assert_eq!(
            h.panes[0].snapshot().traces[0].x,
            rendered.traces[0].x
        );
    }

    // ============================================================================
    // Rendering contract
    // ============================================================================

    #[tokio::test]
    async fn trace_counts_are_invariant_across_refreshes() {
        let (client, _release) = GatedClient::new("NEVER");
        let mut h = harness(client, Arc::new(DisplayFrameClock::default()));

        h.controller.trigger("FAST", 3).unwrap().await.unwrap();
        h.controller.trigger("FAST", 8).unwrap().await.unwrap();

        let [price, volume, rsi, macd] = &h.panes;
        assert_eq!(price.snapshot().traces.len(), 3);
        assert_eq!(volume.snapshot().traces.len(), 1);
        assert_eq!(rsi.snapshot().traces.len(), 1);
        assert_eq!(macd.snapshot().traces.len(), 3);
        // Full replace both times, never an append.
        assert_eq!(price.snapshot().replace_calls, 2);
        assert_eq!(price.snapshot().traces[0].x.len(), 8);
    }

    #[tokio::test]
    async fn empty_payload_still_renders_pinned_rsi_layout() {
        struct EmptyClient;

        #[async_trait]
        impl InferenceApi for EmptyClient {
            async fn symbols(&self) -> Result<Vec<String>, FetchError> {
                Ok(Vec::new())
            }

            async fn infer(
                &self,
                _symbol: &str,
                _backtest_days: u32,
            ) -> Result<InferencePayload, FetchError> {
                Ok(InferencePayload::default())
            }
        }

        let mut h = harness(Arc::new(EmptyClient), Arc::new(DisplayFrameClock::default()));
        h.controller.trigger("ANY", 60).unwrap().await.unwrap();

        let rsi = h.panes[2].snapshot();
        let layout = rsi.layout.expect("RSI pane must carry a layout");
        assert_eq!(layout.y_range, Some((0.0, 100.0)));
        assert_eq!(layout.ref_lines.len(), 2);
        assert!(rsi.traces[0].x.is_empty());

        // Missing metrics render as placeholders, not as an error.
        let readout = h.panel.last().unwrap();
        assert_eq!(readout.rmse, PLACEHOLDER);
        assert_eq!(readout.days, PLACEHOLDER);
        assert_eq!(h.notifier.count(), 0);
    }

    // ============================================================================
    // Linked zoom across render cycles
    // ============================================================================

    #[tokio::test]
    async fn zoom_propagates_once_even_after_rebind() {
        let (client, _release) = GatedClient::new("NEVER");
        let mut h = harness(client, Arc::new(DisplayFrameClock::default()));

        h.controller.trigger("FAST", 3).unwrap().await.unwrap();
        settle().await;

        let first = AxisRange::new("2024-01-01", "2024-03-01");
        h.panes[0].emit_range(Some(first.clone()));
        settle().await;

        for pane in &h.panes[1..] {
            assert_eq!(pane.snapshot().applied_ranges, vec![first.clone()]);
        }
        assert!(h.panes[0].snapshot().applied_ranges.is_empty());

        // Second render cycle replaces the binding; the old listener must
        // not survive and double-propagate.
        h.controller.trigger("FAST", 3).unwrap().await.unwrap();
        settle().await;

        let second = AxisRange::new("2024-02-01", "2024-02-15");
        h.panes[0].emit_range(Some(second.clone()));
        settle().await;

        for pane in &h.panes[1..] {
            let applied = pane.snapshot().applied_ranges;
            assert_eq!(applied, vec![first.clone(), second.clone()]);
        }
    }

    // ============================================================================
    // Resize coalescing across render cycles
    // ============================================================================

    #[tokio::test]
    async fn resize_burst_reflows_once_through_a_single_listener() {
        let (client, _release) = GatedClient::new("NEVER");
        let clock = ManualFrameClock::new();
        let mut h = harness(client, clock.clone());

        // Two render cycles: only the latest listener registration may act.
        h.controller.trigger("FAST", 3).unwrap().await.unwrap();
        h.controller.trigger("FAST", 3).unwrap().await.unwrap();
        settle().await;

        h.resize_tx.send(()).unwrap();
        h.resize_tx.send(()).unwrap();
        settle().await;
        clock.step();
        settle().await;

        for pane in &h.panes {
            assert_eq!(pane.snapshot().reflows, 1);
        }
    }
}
