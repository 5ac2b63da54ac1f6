//! Chart Renderer
//!
//! Renders the four dashboard panes against an injected theme and one shared
//! layout template, then re-installs the axis link and resize coordinator
//! against the fresh pane handles. Every render call is a full replace of a
//! pane's traces, never an append.

pub mod headless;

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

use crate::resize::{FrameClock, ResizeCoordinator};
use crate::sync::AxisSync;
use crate::transform::{PaneSeriesSet, TraceStyle};
use crate::types::{AxisRange, PaneKind, RangeEvent};

/// Theme resolved once by the host shell and injected, never queried
/// mid-render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub text: String,
    pub background: String,
    pub card: String,
    pub grid: String,
    pub muted: String,
    pub accent: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text: "#111827".to_string(),
            background: "#ffffff".to_string(),
            card: "#ffffff".to_string(),
            grid: "#e5e7eb".to_string(),
            muted: "#6b7280".to_string(),
            accent: "#2563eb".to_string(),
        }
    }
}

/// Horizontal reference line pinned to the pane, independent of data
#[derive(Debug, Clone, PartialEq)]
pub struct RefLine {
    pub y: f64,
    pub color: String,
    pub width: f64,
    pub dashed: bool,
}

/// Pane margins in layout units: top, right, bottom, left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// Per-pane layout: the shared template plus pane-specific extras
#[derive(Debug, Clone, PartialEq)]
pub struct PaneLayout {
    pub title: String,
    pub y_title: String,
    pub paper_color: String,
    pub plot_color: String,
    pub font_color: String,
    pub grid_color: String,
    pub muted_color: String,
    pub margins: Margins,
    /// Crosshair spikes across the pane on hover
    pub crosshair: bool,
    pub show_legend: bool,
    /// Pinned y-axis range; `None` lets the engine autoscale
    pub y_range: Option<(f64, f64)>,
    pub ref_lines: Vec<RefLine>,
}

/// One fully-styled trace handed to a pane surface
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<Option<f64>>,
    pub style: TraceStyle,
    /// Explicit color; `None` lets the engine cycle its palette
    pub color: Option<String>,
    pub opacity: f64,
}

impl Trace {
    fn from_series(name: impl Into<String>, series: &crate::transform::ChartSeries) -> Self {
        Self {
            name: name.into(),
            x: series.x.clone(),
            y: series.y.clone(),
            style: series.style,
            color: None,
            opacity: 1.0,
        }
    }

    fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

/// Boundary to the plotting engine.
///
/// A surface accepts full trace replacements with a layout, applies
/// programmatic x-ranges, reflows to its container, and publishes x-range
/// change events from user zoom/pan.
pub trait PaneSurface: Send + Sync {
    /// Full replace of the pane's traces and layout
    fn replace(&self, traces: Vec<Trace>, layout: PaneLayout);

    /// Programmatic x-range write (linked zoom)
    fn apply_x_range(&self, range: &AxisRange);

    /// Recompute layout to fill the container
    fn reflow(&self);

    /// Subscribe to x-range change events
    fn subscribe_ranges(&self) -> broadcast::Receiver<RangeEvent>;
}

/// The four live pane bindings for one render cycle
#[derive(Clone)]
pub struct PaneSet {
    pub price: Arc<dyn PaneSurface>,
    pub volume: Arc<dyn PaneSurface>,
    pub rsi: Arc<dyn PaneSurface>,
    pub macd: Arc<dyn PaneSurface>,
}

impl PaneSet {
    pub fn new(
        price: Arc<dyn PaneSurface>,
        volume: Arc<dyn PaneSurface>,
        rsi: Arc<dyn PaneSurface>,
        macd: Arc<dyn PaneSurface>,
    ) -> Self {
        Self {
            price,
            volume,
            rsi,
            macd,
        }
    }

    pub fn get(&self, kind: PaneKind) -> &Arc<dyn PaneSurface> {
        match kind {
            PaneKind::Price => &self.price,
            PaneKind::Volume => &self.volume,
            PaneKind::Rsi => &self.rsi,
            PaneKind::Macd => &self.macd,
        }
    }

    /// Pane handles tagged with their kind, in render order
    pub fn entries(&self) -> [(PaneKind, Arc<dyn PaneSurface>); 4] {
        [
            (PaneKind::Price, Arc::clone(&self.price)),
            (PaneKind::Volume, Arc::clone(&self.volume)),
            (PaneKind::Rsi, Arc::clone(&self.rsi)),
            (PaneKind::Macd, Arc::clone(&self.macd)),
        ]
    }

    /// Untagged handles, in render order
    pub fn handles(&self) -> [Arc<dyn PaneSurface>; 4] {
        [
            Arc::clone(&self.price),
            Arc::clone(&self.volume),
            Arc::clone(&self.rsi),
            Arc::clone(&self.macd),
        ]
    }
}

/// Renders the four panes and owns the per-cycle axis/resize bindings
pub struct ChartRenderer {
    panes: PaneSet,
    theme: Theme,
    resize_events: broadcast::Sender<()>,
    frame_clock: Arc<dyn FrameClock>,
    axis_sync: Option<AxisSync>,
    resize: Option<ResizeCoordinator>,
}

impl ChartRenderer {
    pub fn new(
        panes: PaneSet,
        theme: Theme,
        resize_events: broadcast::Sender<()>,
        frame_clock: Arc<dyn FrameClock>,
    ) -> Self {
        Self {
            panes,
            theme,
            resize_events,
            frame_clock,
            axis_sync: None,
            resize: None,
        }
    }

    /// Re-render all four panes from a fresh series set, then rebind the
    /// axis link and resize coordinator against the current handles.
    pub fn render(&mut self, series: &PaneSeriesSet) {
        self.panes
            .price
            .replace(price_traces(series), self.common_layout(PaneKind::Price));
        self.panes.volume.replace(
            volume_traces(series, &self.theme),
            self.common_layout(PaneKind::Volume),
        );
        self.panes
            .rsi
            .replace(rsi_traces(series), self.rsi_layout());
        self.panes
            .macd
            .replace(macd_traces(series), self.common_layout(PaneKind::Macd));

        self.rebind();
        debug!(
            backtest_points = series.price.actual.len(),
            forecast_points = series.price.forecast.len(),
            "panes rendered"
        );
    }

    /// Drop prior bindings before installing fresh ones so no listener from
    /// an earlier cycle survives.
    fn rebind(&mut self) {
        self.axis_sync = None;
        self.resize = None;
        self.axis_sync = Some(AxisSync::bind(&self.panes));
        self.resize = Some(ResizeCoordinator::bind(
            self.resize_events.subscribe(),
            Arc::clone(&self.frame_clock),
            self.panes.handles(),
        ));
    }

    /// Shared layout template: title placement, grid styling, margins, and
    /// crosshair-on-hover, colored from the injected theme.
    fn common_layout(&self, kind: PaneKind) -> PaneLayout {
        PaneLayout {
            title: kind.title().to_string(),
            y_title: kind.y_title().to_string(),
            paper_color: self.theme.card.clone(),
            plot_color: self.theme.card.clone(),
            font_color: self.theme.text.clone(),
            grid_color: self.theme.grid.clone(),
            muted_color: self.theme.muted.clone(),
            margins: Margins {
                top: 30,
                right: 40,
                bottom: 40,
                left: 60,
            },
            crosshair: true,
            show_legend: true,
            y_range: None,
            ref_lines: Vec::new(),
        }
    }

    /// RSI layout: y-axis pinned to [0,100] with oversold/overbought
    /// reference lines regardless of the data range.
    fn rsi_layout(&self) -> PaneLayout {
        let mut layout = self.common_layout(PaneKind::Rsi);
        layout.y_range = Some((0.0, 100.0));
        layout.ref_lines = vec![
            RefLine {
                y: 30.0,
                color: self.theme.muted.clone(),
                width: 1.0,
                dashed: true,
            },
            RefLine {
                y: 70.0,
                color: self.theme.muted.clone(),
                width: 1.0,
                dashed: true,
            },
        ];
        layout
    }
}

fn price_traces(series: &PaneSeriesSet) -> Vec<Trace> {
    vec![
        Trace::from_series("Actual (history)", &series.price.actual),
        Trace::from_series("1-step stitched", &series.price.one_step),
        Trace::from_series(
            format!("Forecast (+{})", series.price.forecast.len()),
            &series.price.forecast,
        ),
    ]
}

fn volume_traces(series: &PaneSeriesSet, theme: &Theme) -> Vec<Trace> {
    vec![Trace::from_series("Volume", &series.volume)
        .with_color(theme.accent.clone())
        .with_opacity(0.6)]
}

fn rsi_traces(series: &PaneSeriesSet) -> Vec<Trace> {
    vec![Trace::from_series("RSI(14)", &series.rsi)]
}

fn macd_traces(series: &PaneSeriesSet) -> Vec<Trace> {
    vec![
        Trace::from_series("MACD", &series.macd.line),
        Trace::from_series("Signal", &series.macd.signal),
        Trace::from_series("MACD Hist", &series.macd.histogram).with_opacity(0.45),
    ]
}
