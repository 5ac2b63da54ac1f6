//! Inference API Client
//!
//! Fetches the symbol list and backtest/forecast payloads from the remote
//! inference service. Wire rows are decoded leniently: absent arrays and
//! fields never fail the decode, they surface as empty/null downstream.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Errors surfaced by the inference API client
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Non-2xx HTTP response, with the numeric status and requested path
    #[error("HTTP {status} for {path}")]
    Status { status: u16, path: String },
    /// Network-level failure (connect, timeout, body read)
    #[error("request failed for {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// Response body was not the expected JSON shape
    #[error("malformed payload for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

/// One row of the backtest frame
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservationRecord {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub actual: Option<f64>,
    #[serde(default)]
    pub pred_1step: Option<f64>,
    #[serde(default)]
    pub ema20: Option<f64>,
    #[serde(default)]
    pub ema60: Option<f64>,
    #[serde(default)]
    pub ma10: Option<f64>,
    #[serde(default)]
    pub ma20: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub rsi_14: Option<f64>,
    #[serde(default)]
    pub macd: Option<f64>,
    #[serde(default)]
    pub macd_signal: Option<f64>,
    #[serde(default)]
    pub macd_hist: Option<f64>,
}

/// One row of the forward forecast frame
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastRecord {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub pred_price: Option<f64>,
}

/// Backtest evaluation metrics; every field independently nullable
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
pub struct MetricsSummary {
    #[serde(default)]
    pub rmse: Option<f64>,
    #[serde(default)]
    pub mape: Option<f64>,
    #[serde(default)]
    pub da: Option<f64>,
    #[serde(default)]
    pub ta: Option<f64>,
    #[serde(default)]
    pub sda: Option<f64>,
    #[serde(default)]
    pub days: Option<i64>,
}

/// Full `/infer` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InferencePayload {
    #[serde(default)]
    pub metrics_backtest: Option<MetricsSummary>,
    #[serde(default)]
    pub backtest_df: Option<Vec<ObservationRecord>>,
    #[serde(default)]
    pub future_df: Option<Vec<ForecastRecord>>,
}

/// `/symbols` responds either with a bare array or a wrapped object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SymbolsResponse {
    Bare(Vec<String>),
    Wrapped {
        #[serde(default)]
        symbols: Vec<String>,
    },
}

impl SymbolsResponse {
    fn into_list(self) -> Vec<String> {
        match self {
            SymbolsResponse::Bare(list) => list,
            SymbolsResponse::Wrapped { symbols } => symbols,
        }
    }
}

/// Boundary trait over the inference API, mockable in controller tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceApi: Send + Sync {
    /// List the symbols the model can be queried for
    async fn symbols(&self) -> Result<Vec<String>, FetchError>;

    /// Fetch backtest + forward forecast for one symbol
    async fn infer(
        &self,
        symbol: &str,
        backtest_days: u32,
    ) -> Result<InferencePayload, FetchError>;
}

/// reqwest-backed client for the inference service
pub struct HttpInferenceClient {
    client: reqwest::Client,
    base_url: String,
    lookback_hist_plot: u32,
}

impl HttpInferenceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            lookback_hist_plot: 120,
        }
    }

    /// Override the plotting history lookback forwarded to `/infer`
    pub fn with_lookback(mut self, days: u32) -> Self {
        self.lookback_hist_plot = days;
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .query(query)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        response.json::<T>().await.map_err(|source| FetchError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl InferenceApi for HttpInferenceClient {
    async fn symbols(&self) -> Result<Vec<String>, FetchError> {
        let response: SymbolsResponse = self.get_json("/symbols", &[]).await?;
        let list = response.into_list();
        debug!("fetched {} symbols", list.len());
        Ok(list)
    }

    async fn infer(
        &self,
        symbol: &str,
        backtest_days: u32,
    ) -> Result<InferencePayload, FetchError> {
        let query = [
            ("symbol", symbol.to_string()),
            ("backtest_days", backtest_days.to_string()),
            ("lookback_hist_plot", self.lookback_hist_plot.to_string()),
        ];

        let payload: InferencePayload = self.get_json("/infer", &query).await?;
        debug!(
            %symbol,
            backtest_rows = payload.backtest_df.as_ref().map_or(0, Vec::len),
            forecast_rows = payload.future_df.as_ref().map_or(0, Vec::len),
            "fetched inference payload"
        );
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_rows_decode_with_missing_fields() {
        let json = r#"[
            {"time": "2024-01-01T00:00:00", "actual": 100.0, "pred_1step": 101.0},
            {"time": "2024-01-02", "actual": 102.0, "pred_1step": null}
        ]"#;
        let rows: Vec<ObservationRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pred_1step, Some(101.0));
        assert_eq!(rows[1].pred_1step, None);
        assert_eq!(rows[1].ema20, None);
    }

    #[test]
    fn payload_decodes_without_top_level_keys() {
        let payload: InferencePayload = serde_json::from_str("{}").unwrap();
        assert!(payload.metrics_backtest.is_none());
        assert!(payload.backtest_df.is_none());
        assert!(payload.future_df.is_none());
    }

    #[test]
    fn payload_tolerates_null_frames() {
        let json = r#"{"metrics_backtest": null, "backtest_df": null, "future_df": null}"#;
        let payload: InferencePayload = serde_json::from_str(json).unwrap();
        assert!(payload.backtest_df.is_none());
        assert!(payload.future_df.is_none());
    }

    #[test]
    fn symbols_decode_from_both_shapes() {
        let bare: SymbolsResponse = serde_json::from_str(r#"["FPT", "GAS"]"#).unwrap();
        assert_eq!(bare.into_list(), vec!["FPT", "GAS"]);

        let wrapped: SymbolsResponse =
            serde_json::from_str(r#"{"symbols": ["PVS"]}"#).unwrap();
        assert_eq!(wrapped.into_list(), vec!["PVS"]);
    }

    #[test]
    fn metrics_fields_are_independently_nullable() {
        let json = r#"{"rmse": 1.5, "mape": null, "days": 60}"#;
        let metrics: MetricsSummary = serde_json::from_str(json).unwrap();
        assert_eq!(metrics.rmse, Some(1.5));
        assert_eq!(metrics.mape, None);
        assert_eq!(metrics.da, None);
        assert_eq!(metrics.days, Some(60));
    }

    #[test]
    fn status_error_names_status_and_path() {
        let err = FetchError::Status {
            status: 502,
            path: "/infer".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502 for /infer");
    }
}
