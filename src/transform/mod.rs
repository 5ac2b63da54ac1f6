//! Data Transformer
//!
//! Pure conversion of a raw inference payload into renderable per-pane
//! series. No I/O, no state. Missing optional values pass through as nulls
//! so the renderer draws gaps, never zeros.

use chrono::NaiveDate;

use crate::inference::{InferencePayload, ObservationRecord};

/// Dash/bar styling for a derived series; colors come from the theme at
/// render time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceStyle {
    Solid,
    Dashed,
    Dotted,
    Bars,
}

/// One renderable series: ordered dates with numeric-or-null values
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub x: Vec<String>,
    pub y: Vec<Option<f64>>,
    pub style: TraceStyle,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Price-pane traces: history, stitched one-step alignment, forward forecast
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    /// Every backtest record's actual price, in original order
    pub actual: ChartSeries,
    /// Retrospective one-step predictions, finite values only; aligned to
    /// their historical dates, not offset forward
    pub one_step: ChartSeries,
    /// Forward forecast beyond the last actual date
    pub forecast: ChartSeries,
}

/// Moving-average overlays aligned one-to-one with the actual series
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySeries {
    pub ema20: ChartSeries,
    pub ema60: ChartSeries,
    pub ma10: ChartSeries,
    pub ma20: ChartSeries,
}

/// MACD-pane traces
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: ChartSeries,
    pub signal: ChartSeries,
    pub histogram: ChartSeries,
}

/// Everything the renderer needs for one refresh cycle.
///
/// Rebuilt in full on every refresh; never patched incrementally.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneSeriesSet {
    pub price: PriceSeries,
    pub overlays: OverlaySeries,
    pub volume: ChartSeries,
    pub rsi: ChartSeries,
    pub macd: MacdSeries,
}

/// Normalize a raw timestamp to date-only granularity.
///
/// Canonicalizes well-formed dates through chrono; anything else keeps its
/// 10-char prefix so malformed rows still line up positionally instead of
/// being dropped.
pub(crate) fn normalize_date(raw: &str) -> String {
    let prefix: String = raw.chars().take(10).collect();
    match NaiveDate::parse_from_str(&prefix, "%Y-%m-%d") {
        Ok(date) => date.to_string(),
        Err(_) => prefix,
    }
}

fn aligned_series(
    records: &[ObservationRecord],
    dates: &[String],
    style: TraceStyle,
    value: impl Fn(&ObservationRecord) -> Option<f64>,
) -> ChartSeries {
    ChartSeries {
        x: dates.to_vec(),
        y: records.iter().map(value).collect(),
        style,
    }
}

/// Convert a raw payload into the four pane series sets.
///
/// Total over any decoded payload: absent frames become empty series.
pub fn transform(payload: &InferencePayload) -> PaneSeriesSet {
    let backtest: &[ObservationRecord] = payload.backtest_df.as_deref().unwrap_or(&[]);
    let future = payload.future_df.as_deref().unwrap_or(&[]);

    let dates: Vec<String> = backtest.iter().map(|r| normalize_date(&r.time)).collect();

    let actual = aligned_series(backtest, &dates, TraceStyle::Solid, |r| r.actual);

    // Stitched one-step: keep only finite predictions, preserving order.
    let (one_step_x, one_step_y): (Vec<String>, Vec<Option<f64>>) = backtest
        .iter()
        .zip(&dates)
        .filter_map(|(r, d)| match r.pred_1step {
            Some(p) if p.is_finite() => Some((d.clone(), Some(p))),
            _ => None,
        })
        .unzip();
    let one_step = ChartSeries {
        x: one_step_x,
        y: one_step_y,
        style: TraceStyle::Dashed,
    };

    let forecast = ChartSeries {
        x: future.iter().map(|r| normalize_date(&r.time)).collect(),
        y: future.iter().map(|r| r.pred_price).collect(),
        style: TraceStyle::Dotted,
    };

    PaneSeriesSet {
        price: PriceSeries {
            actual,
            one_step,
            forecast,
        },
        overlays: OverlaySeries {
            ema20: aligned_series(backtest, &dates, TraceStyle::Solid, |r| r.ema20),
            ema60: aligned_series(backtest, &dates, TraceStyle::Solid, |r| r.ema60),
            ma10: aligned_series(backtest, &dates, TraceStyle::Solid, |r| r.ma10),
            ma20: aligned_series(backtest, &dates, TraceStyle::Solid, |r| r.ma20),
        },
        volume: aligned_series(backtest, &dates, TraceStyle::Bars, |r| r.volume),
        rsi: aligned_series(backtest, &dates, TraceStyle::Solid, |r| r.rsi_14),
        macd: MacdSeries {
            line: aligned_series(backtest, &dates, TraceStyle::Solid, |r| r.macd),
            signal: aligned_series(backtest, &dates, TraceStyle::Solid, |r| r.macd_signal),
            histogram: aligned_series(backtest, &dates, TraceStyle::Bars, |r| r.macd_hist),
        },
    }
}

impl PaneSeriesSet {
    /// Empty set, used when a payload carries no frames at all
    pub fn empty() -> Self {
        transform(&InferencePayload::default())
    }
}
