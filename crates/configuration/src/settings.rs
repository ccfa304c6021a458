use crate::error::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
    pub loader: LoaderSettings,
    pub analysis: AnalysisConfig,
}

/// Where the HTTP API listens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Connection pool settings. The URL itself comes from `DATABASE_URL`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    pub level: String,
    /// When set, a daily-rolling log file is written here as well.
    pub directory: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Pause before the single retry of an unavailable price source.
    pub retry_backoff_ms: u64,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            retry_backoff_ms: 250,
        }
    }
}

impl LoaderSettings {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Window sizes and thresholds for every computation in the analytics core.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sma_short: usize,
    pub sma_long: usize,

    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,

    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,

    pub bb_period: usize,
    pub bb_std_dev: f64,

    /// Trailing samples reduced to high/low/close for the pivot levels.
    pub levels_window: usize,
    /// Trailing return windows reported as `volatility_{n}d`.
    pub volatility_windows: Vec<usize>,
    pub periods_per_year: u32,
    /// Either 0.95 or 0.99.
    pub confidence_level: f64,

    /// Threshold on the z-score against the whole series' mean and std.
    pub zscore_threshold: f64,
    /// Trailing samples (current one included) for the rolling z-score.
    pub rolling_window: usize,
    pub rolling_threshold: f64,
    pub iqr_multiplier: f64,
    /// Absolute daily return, in percent, above which a sample is a spike.
    pub spike_threshold_pct: f64,
    pub anomaly_dates_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sma_short: 7,
            sma_long: 30,
            rsi_period: 14,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std_dev: 2.0,
            levels_window: 30,
            volatility_windows: vec![7, 30],
            periods_per_year: 365,
            confidence_level: 0.95,
            zscore_threshold: 3.0,
            rolling_window: 20,
            rolling_threshold: 2.5,
            iqr_multiplier: 1.5,
            spike_threshold_pct: 10.0,
            anomaly_dates_limit: 10,
        }
    }
}

impl AnalysisConfig {
    /// Rejects parameter sets the engine cannot compute with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let windows = [
            ("sma_short", self.sma_short),
            ("sma_long", self.sma_long),
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("bb_period", self.bb_period),
            ("levels_window", self.levels_window),
            ("rolling_window", self.rolling_window),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, w)| *w == 0) {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be greater than zero"
            )));
        }
        if self.volatility_windows.iter().any(|w| *w < 2) {
            return Err(ConfigError::ValidationError(
                "volatility windows need at least 2 returns".to_string(),
            ));
        }
        if self.sma_short >= self.sma_long {
            return Err(ConfigError::ValidationError(
                "sma_short must be shorter than sma_long".to_string(),
            ));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(ConfigError::ValidationError(
                "macd_fast must be shorter than macd_slow".to_string(),
            ));
        }
        if self.rsi_oversold >= self.rsi_overbought
            || self.rsi_oversold < 0.0
            || self.rsi_overbought > 100.0
        {
            return Err(ConfigError::ValidationError(
                "RSI thresholds must satisfy 0 <= oversold < overbought <= 100".to_string(),
            ));
        }
        let positive = [
            ("bb_std_dev", self.bb_std_dev),
            ("zscore_threshold", self.zscore_threshold),
            ("rolling_threshold", self.rolling_threshold),
            ("iqr_multiplier", self.iqr_multiplier),
            ("spike_threshold_pct", self.spike_threshold_pct),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| !(*v > 0.0)) {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be positive"
            )));
        }
        // A window that includes the scored value caps |z| at (n - 1) / sqrt(n).
        if self.max_rolling_zscore() <= self.rolling_threshold {
            return Err(ConfigError::ValidationError(format!(
                "rolling_window {} can never reach rolling_threshold {}",
                self.rolling_window, self.rolling_threshold
            )));
        }
        if self.periods_per_year == 0 {
            return Err(ConfigError::ValidationError(
                "periods_per_year must be greater than zero".to_string(),
            ));
        }
        if self.confidence_z().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "confidence_level {} is not supported (use 0.95 or 0.99)",
                self.confidence_level
            )));
        }
        Ok(())
    }

    /// One-sided normal quantile for the configured confidence level.
    pub fn confidence_z(&self) -> Option<f64> {
        if (self.confidence_level - 0.95).abs() < 1e-9 {
            Some(1.645)
        } else if (self.confidence_level - 0.99).abs() < 1e-9 {
            Some(2.326)
        } else {
            None
        }
    }

    /// Largest |z| a single outlier can reach inside the rolling window.
    pub fn max_rolling_zscore(&self) -> f64 {
        let n = self.rolling_window as f64;
        (n - 1.0) / n.sqrt()
    }

    /// The longest history any indicator needs before it produces values.
    pub fn longest_window(&self) -> usize {
        [
            self.sma_long,
            self.rsi_period + 1,
            self.macd_slow + self.macd_signal - 1,
            self.bb_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Command-line overrides for the HTTP listener.
#[cfg(feature = "clap")]
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ServerArgs {
    /// Interface to bind (overrides `server.host`).
    #[arg(long)]
    pub host: Option<String>,
    /// Port to bind (overrides `server.port`).
    #[arg(long)]
    pub port: Option<u16>,
}

#[cfg(feature = "clap")]
impl ServerSettings {
    pub fn apply_args(&mut self, args: &ServerArgs) {
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AnalysisConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.confidence_z(), Some(1.645));
        assert_eq!(cfg.longest_window(), 34);
    }

    #[test]
    fn rejects_inverted_macd_windows() {
        let cfg = AnalysisConfig {
            macd_fast: 26,
            macd_slow: 12,
            ..AnalysisConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn rejects_rolling_window_that_cannot_flag() {
        for rolling_window in [1, 2, 8] {
            let cfg = AnalysisConfig {
                rolling_window,
                ..AnalysisConfig::default()
            };
            assert!(
                matches!(cfg.validate(), Err(ConfigError::ValidationError(_))),
                "window {rolling_window}"
            );
        }
        let cfg = AnalysisConfig {
            rolling_window: 9,
            ..AnalysisConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_confidence_level() {
        let cfg = AnalysisConfig {
            confidence_level: 0.9,
            ..AnalysisConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let raw = r#"
            [server]
            port = 8080

            [analysis]
            spike_threshold_pct = 15.0
        "#;
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.analysis.spike_threshold_pct, 15.0);
        assert_eq!(settings.analysis.rsi_period, 14);
        assert_eq!(settings.loader.retry_backoff_ms, 250);
    }
}
