//! Core types used throughout Inferdash
//!
//! Defines the pane identifiers, axis ranges, and session outcomes shared
//! between the refresh, render, and sync layers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four chart regions of the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaneKind {
    Price,
    Volume,
    Rsi,
    Macd,
}

impl PaneKind {
    /// Render order of the panes, top to bottom
    pub const ALL: [PaneKind; 4] = [
        PaneKind::Price,
        PaneKind::Volume,
        PaneKind::Rsi,
        PaneKind::Macd,
    ];

    /// Pane title shown in the layout header
    pub fn title(&self) -> &'static str {
        match self {
            PaneKind::Price => "Price & Forecast",
            PaneKind::Volume => "Volume",
            PaneKind::Rsi => "RSI(14)",
            PaneKind::Macd => "MACD",
        }
    }

    /// Y-axis label for the pane
    pub fn y_title(&self) -> &'static str {
        match self {
            PaneKind::Price => "Price",
            PaneKind::Volume => "Volume",
            PaneKind::Rsi => "RSI",
            PaneKind::Macd => "MACD",
        }
    }
}

impl fmt::Display for PaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaneKind::Price => write!(f, "price"),
            PaneKind::Volume => write!(f, "volume"),
            PaneKind::Rsi => write!(f, "rsi"),
            PaneKind::Macd => write!(f, "macd"),
        }
    }
}

/// Explicit x-axis bounds carried by a zoom/pan event.
///
/// Bounds are canonical calendar-date strings so that equality between a
/// propagated range and its echo is exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: String,
    pub max: String,
}

impl AxisRange {
    pub fn new(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }
}

impl fmt::Display for AxisRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// X-range change event emitted by a pane surface.
///
/// `range` is `None` for autorange/reset events, which carry no explicit
/// bounds and are never propagated.
#[derive(Debug, Clone)]
pub struct RangeEvent {
    pub range: Option<AxisRange>,
}

impl RangeEvent {
    pub fn explicit(range: AxisRange) -> Self {
        Self { range: Some(range) }
    }

    pub fn autorange() -> Self {
        Self { range: None }
    }
}

/// Terminal outcome of one refresh session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Payload fetched, transformed, and committed to the panes + metrics
    Rendered,
    /// Superseded by a later trigger; resolved as a silent no-op
    Cancelled,
    /// Transport/decode failure; previous rendered state left untouched
    Failed,
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Rendered => write!(f, "RENDERED"),
            SessionOutcome::Cancelled => write!(f, "CANCELLED"),
            SessionOutcome::Failed => write!(f, "FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pane_order_is_stable() {
        assert_eq!(PaneKind::ALL.len(), 4);
        assert_eq!(PaneKind::ALL[0], PaneKind::Price);
        assert_eq!(PaneKind::ALL[3], PaneKind::Macd);
    }

    #[test]
    fn axis_range_equality_is_exact() {
        let a = AxisRange::new("2024-01-01", "2024-03-01");
        let b = AxisRange::new("2024-01-01", "2024-03-01");
        assert_eq!(a, b);
        assert_ne!(a, AxisRange::new("2024-01-01", "2024-03-02"));
    }
}
