//! Headless pane surface
//!
//! In-memory `PaneSurface` implementation that records every render call.
//! Backs the smoke binary and the test suites, so the coordination layer can
//! be exercised without a live plotting engine.
//!
//! Like a real engine, a programmatic x-range write is echoed back out as a
//! range event; the axis link must suppress those echoes itself.

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::{PaneLayout, PaneSet, PaneSurface, Trace};
use crate::types::{AxisRange, PaneKind, RangeEvent};

/// Observable state of one headless pane
#[derive(Debug, Clone, Default)]
pub struct PaneState {
    /// Traces from the most recent replace; prior traces are discarded
    pub traces: Vec<Trace>,
    /// Layout from the most recent replace
    pub layout: Option<PaneLayout>,
    /// Every x-range applied programmatically, in order
    pub applied_ranges: Vec<AxisRange>,
    /// Number of reflow instructions received
    pub reflows: u64,
    /// Number of replace calls received
    pub replace_calls: u64,
}

/// Recording pane surface
pub struct HeadlessPane {
    kind: PaneKind,
    ranges: broadcast::Sender<RangeEvent>,
    state: Mutex<PaneState>,
}

impl HeadlessPane {
    pub fn new(kind: PaneKind) -> Arc<Self> {
        let (ranges, _) = broadcast::channel(64);
        Arc::new(Self {
            kind,
            ranges,
            state: Mutex::new(PaneState::default()),
        })
    }

    pub fn kind(&self) -> PaneKind {
        self.kind
    }

    /// Simulate a user zoom/pan (or autorange reset) on this pane
    pub fn emit_range(&self, range: Option<AxisRange>) {
        // No receivers just means nothing is bound yet.
        let _ = self.ranges.send(RangeEvent { range });
    }

    /// Snapshot of everything recorded so far
    pub fn snapshot(&self) -> PaneState {
        self.state.lock().unwrap().clone()
    }
}

impl PaneSurface for HeadlessPane {
    fn replace(&self, traces: Vec<Trace>, layout: PaneLayout) {
        let mut state = self.state.lock().unwrap();
        state.traces = traces;
        state.layout = Some(layout);
        state.replace_calls += 1;
    }

    fn apply_x_range(&self, range: &AxisRange) {
        self.state
            .lock()
            .unwrap()
            .applied_ranges
            .push(range.clone());
        // Engines report programmatic relayouts through the same event
        // stream as user zooms.
        let _ = self.ranges.send(RangeEvent::explicit(range.clone()));
    }

    fn reflow(&self) {
        self.state.lock().unwrap().reflows += 1;
    }

    fn subscribe_ranges(&self) -> broadcast::Receiver<RangeEvent> {
        self.ranges.subscribe()
    }
}

/// Four headless panes wired into a `PaneSet`, plus the concrete handles for
/// snapshot assertions
pub fn headless_pane_set() -> (PaneSet, [Arc<HeadlessPane>; 4]) {
    let price = HeadlessPane::new(PaneKind::Price);
    let volume = HeadlessPane::new(PaneKind::Volume);
    let rsi = HeadlessPane::new(PaneKind::Rsi);
    let macd = HeadlessPane::new(PaneKind::Macd);

    let set = PaneSet::new(
        price.clone(),
        volume.clone(),
        rsi.clone(),
        macd.clone(),
    );
    (set, [price, volume, rsi, macd])
}
