//! Axis Sync
//!
//! Links the x-axis of the four panes: an explicit zoom/pan range on any
//! pane is propagated to the other three. Events without resolved bounds
//! (autorange/reset) are ignored, and echoes of the link's own programmatic
//! writes are suppressed so a propagated range never re-enters the loop.
//!
//! A binding holds a snapshot of the pane handles taken at bind time; each
//! render cycle drops the old binding and installs a fresh one.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::render::PaneSet;
use crate::types::{AxisRange, PaneKind, RangeEvent};

/// Live x-axis link across the four panes of one render cycle.
///
/// Dropping the link aborts its listener task, which is how a re-render
/// guarantees no duplicate propagation from earlier cycles.
pub struct AxisSync {
    task: JoinHandle<()>,
}

impl AxisSync {
    pub fn bind(panes: &PaneSet) -> Self {
        let mut price_rx = panes.price.subscribe_ranges();
        let mut volume_rx = panes.volume.subscribe_ranges();
        let mut rsi_rx = panes.rsi.subscribe_ranges();
        let mut macd_rx = panes.macd.subscribe_ranges();
        let handles = panes.entries();

        let task = tokio::spawn(async move {
            // Engines echo programmatic writes back through the same event
            // stream as user zooms; an echo of the last range this link
            // wrote must not count as a new user-originated event.
            let mut last_applied: Option<AxisRange> = None;

            loop {
                let (origin, event) = tokio::select! {
                    ev = price_rx.recv() => (PaneKind::Price, ev),
                    ev = volume_rx.recv() => (PaneKind::Volume, ev),
                    ev = rsi_rx.recv() => (PaneKind::Rsi, ev),
                    ev = macd_rx.recv() => (PaneKind::Macd, ev),
                };

                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        trace!(skipped, "axis link lagged, dropping stale range events");
                        continue;
                    }
                    // A pane handle went away; this binding is being replaced.
                    Err(RecvError::Closed) => break,
                };

                // Only explicit zoom/pan ranges propagate.
                let Some(range) = event.range else { continue };

                if last_applied.as_ref() == Some(&range) {
                    continue;
                }
                last_applied = Some(range.clone());

                trace!(%origin, %range, "propagating x-range");
                for (kind, pane) in &handles {
                    if *kind == origin {
                        continue;
                    }
                    pane.apply_x_range(&range);
                }
            }
        });

        Self { task }
    }
}

impl Drop for AxisSync {
    fn drop(&mut self) {
        self.task.abort();
    }
}
