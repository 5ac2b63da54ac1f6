//! Inferdash smoke binary
//!
//! Drives one full refresh cycle against headless panes: lists symbols,
//! fetches the first (or requested) symbol's backtest + forecast, renders,
//! and prints the metrics readout with per-pane trace counts.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

use inferdash::config::AppConfig;
use inferdash::inference::{HttpInferenceClient, InferenceApi};
use inferdash::metrics::{MetricsPanel, MetricsReadout};
use inferdash::refresh::{DashboardView, Notifier, RefreshController};
use inferdash::render::headless::headless_pane_set;
use inferdash::render::{ChartRenderer, Theme};
use inferdash::resize::DisplayFrameClock;

/// Prints the readout strip to stdout
struct StdoutPanel;

impl MetricsPanel for StdoutPanel {
    fn show(&self, readout: &MetricsReadout) {
        println!(
            "RMSE {}  MAPE {}  DA {}  TA {}  SDA {}  days {}",
            readout.rmse, readout.mape, readout.da, readout.ta, readout.sda, readout.days
        );
    }
}

/// Surfaces refresh failures on stderr
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = AppConfig::load().context("failed to load configuration")?;
    info!("starting inferdash ({})", cfg.digest());

    let client = Arc::new(
        HttpInferenceClient::new(
            cfg.api.base_url.clone(),
            Duration::from_millis(cfg.api.timeout_ms),
        )
        .with_lookback(cfg.dashboard.lookback_hist_plot),
    );

    let symbols = client.symbols().await.context("GET /symbols failed")?;
    if symbols.is_empty() {
        bail!("inference API returned no symbols");
    }
    let symbol = std::env::args()
        .nth(1)
        .unwrap_or_else(|| symbols[0].clone());
    info!(%symbol, available = symbols.len(), "symbol selected");

    let (panes, handles) = headless_pane_set();
    let (resize_tx, _) = broadcast::channel(16);
    let renderer = ChartRenderer::new(
        panes,
        Theme::default(),
        resize_tx,
        Arc::new(DisplayFrameClock::new(Duration::from_millis(
            cfg.dashboard.frame_interval_ms,
        ))),
    );
    let view = DashboardView::new(renderer, Arc::new(StdoutPanel));
    let mut controller = RefreshController::new(
        client,
        view,
        Arc::new(StderrNotifier),
        cfg.dashboard.default_backtest_days,
    );

    let Some(session) = controller.trigger(&symbol, cfg.dashboard.default_backtest_days) else {
        bail!("no symbol selected");
    };
    let outcome = session.await.context("refresh session panicked")?;
    info!(%symbol, %outcome, "refresh finished");

    for pane in &handles {
        let state = pane.snapshot();
        println!(
            "{:<8} traces={} points={}",
            pane.kind().to_string(),
            state.traces.len(),
            state.traces.iter().map(|t| t.x.len()).sum::<usize>()
        );
    }

    Ok(())
}
