//! Metrics readout
//!
//! Formats the backtest evaluation summary for display. Missing values
//! render as a placeholder, never as an error.

use crate::inference::MetricsSummary;

/// Placeholder glyph for null/NaN metric values
pub const PLACEHOLDER: &str = "\u{2014}";

/// Two-decimal number, placeholder on null/NaN
pub fn fmt_num(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Two-decimal percentage, placeholder on null/NaN
pub fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}%"),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Formatted readout for the metrics strip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsReadout {
    pub rmse: String,
    pub mape: String,
    pub da: String,
    pub ta: String,
    pub sda: String,
    pub days: String,
}

impl MetricsReadout {
    /// All-placeholder readout, shown before the first successful refresh
    pub fn placeholder() -> Self {
        format_metrics(&MetricsSummary::default())
    }
}

/// Format the backtest summary for the readout strip
pub fn format_metrics(metrics: &MetricsSummary) -> MetricsReadout {
    MetricsReadout {
        rmse: fmt_num(metrics.rmse),
        mape: fmt_pct(metrics.mape),
        da: fmt_num(metrics.da),
        ta: fmt_num(metrics.ta),
        sda: fmt_num(metrics.sda),
        days: metrics
            .days
            .map(|d| d.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
    }
}

/// Readout sink owned by the host shell
pub trait MetricsPanel: Send + Sync {
    fn show(&self, readout: &MetricsReadout);
}
