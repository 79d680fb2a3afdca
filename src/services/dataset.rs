//! Replay Dataset
//!
//! The replay provider's input: a mapping `symbol -> {series, spreadBps}`.
//! Loaded once at startup, either from the JSON file named by
//! `REPLAY_DATA_PATH` or from the built-in dataset compiled in below so the
//! server and tests run with no external files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Dataset loading errors.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read replay dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse replay dataset: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("replay series for {0} is empty")]
    EmptySeries(String),
}

/// Per-symbol replay configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesConfig {
    /// Mid prices the provider cycles through
    pub series: Vec<f64>,
    /// Quoted spread in basis points; falls back to the broker default
    #[serde(default)]
    pub spread_bps: Option<f64>,
}

/// The full replay dataset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ReplayDataset {
    pub symbols: BTreeMap<String, SeriesConfig>,
}

impl ReplayDataset {
    /// Load a dataset from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let dataset: ReplayDataset = serde_json::from_str(&raw)?;
        dataset.validate()?;
        info!(
            "Loaded replay dataset from {} ({} symbols)",
            path.display(),
            dataset.symbols.len()
        );
        Ok(dataset)
    }

    /// The shipped default dataset.
    pub fn builtin() -> Self {
        let mut symbols = BTreeMap::new();
        symbols.insert(
            "AAPL".to_string(),
            SeriesConfig {
                series: vec![
                    189.84, 190.12, 190.55, 189.97, 190.43, 191.02, 191.38, 190.86, 191.21,
                    191.77, 192.15, 191.64, 192.08, 192.51, 193.04, 192.62, 192.97, 193.42,
                    193.11, 193.68, 194.05, 193.57, 194.12, 194.48,
                ],
                spread_bps: Some(6.0),
            },
        );
        symbols.insert(
            "TSLA".to_string(),
            SeriesConfig {
                series: vec![
                    241.05, 242.3, 240.88, 243.12, 244.6, 243.75, 245.22, 246.01, 244.9, 246.55,
                    247.8, 246.32, 248.15, 249.4, 248.02, 250.1, 251.45, 249.88, 251.9, 253.02,
                    251.6, 253.55, 254.7, 253.18,
                ],
                spread_bps: Some(10.0),
            },
        );
        symbols.insert(
            "MSFT".to_string(),
            SeriesConfig {
                series: vec![
                    411.22, 412.05, 411.68, 412.84, 413.3, 412.76, 413.92, 414.51, 413.87,
                    414.96, 415.6, 414.88, 415.94, 416.43, 415.71, 416.88, 417.35, 416.62,
                    417.78, 418.2, 417.44, 418.63, 419.1, 418.37,
                ],
                spread_bps: Some(5.0),
            },
        );
        symbols.insert(
            "NVDA".to_string(),
            SeriesConfig {
                series: vec![
                    116.4, 117.22, 116.05, 118.1, 119.35, 118.2, 119.88, 120.74, 119.6, 121.05,
                    122.3, 120.92, 122.6, 123.55, 122.14, 123.95, 124.8, 123.38, 124.9, 125.62,
                    124.21, 125.84, 126.5, 125.07,
                ],
                spread_bps: Some(9.0),
            },
        );
        symbols.insert(
            "SPY".to_string(),
            SeriesConfig {
                series: vec![
                    545.3, 545.82, 545.51, 546.24, 546.7, 546.33, 547.05, 547.48, 547.02, 547.76,
                    548.21, 547.79, 548.5, 548.93, 548.44, 549.18, 549.6, 549.12, 549.84, 550.27,
                    549.73, 550.48, 550.9, 550.36,
                ],
                spread_bps: Some(3.0),
            },
        );
        Self { symbols }
    }

    fn validate(&self) -> Result<(), DatasetError> {
        for (symbol, config) in &self.symbols {
            if config.series.is_empty() {
                return Err(DatasetError::EmptySeries(symbol.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_dataset_has_nonempty_series() {
        let dataset = ReplayDataset::builtin();
        assert!(dataset.symbols.contains_key("AAPL"));
        assert!(dataset.symbols.contains_key("TSLA"));
        for config in dataset.symbols.values() {
            assert!(config.series.len() >= 2);
            assert!(config.series.iter().all(|p| *p > 0.0));
        }
    }

    #[test]
    fn test_parse_dataset_json() {
        let raw = r#"{"ACME":{"series":[10.0,10.5,11.0],"spreadBps":12.0},"BARE":{"series":[5.0]}}"#;
        let dataset: ReplayDataset = serde_json::from_str(raw).unwrap();
        assert_eq!(dataset.symbols["ACME"].series.len(), 3);
        assert_eq!(dataset.symbols["ACME"].spread_bps, Some(12.0));
        assert_eq!(dataset.symbols["BARE"].spread_bps, None);
    }

    #[test]
    fn test_empty_series_rejected() {
        let raw = r#"{"VOID":{"series":[]}}"#;
        let dataset: ReplayDataset = serde_json::from_str(raw).unwrap();
        assert!(dataset.validate().is_err());
    }
}
