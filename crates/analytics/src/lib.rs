//! # Coinscope Analytics Engine
//!
//! This crate turns a coin's stored price history into the technical-analysis,
//! risk, anomaly and trend payloads served to the dashboard.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** Pure computation over an immutable [`Series`]. The only I/O seam
//!   is the [`PriceSource`] trait, implemented by the database adapter (Layer 3) and by
//!   [`MemorySource`] for tests.
//! - **Stateless Calculation:** `IndicatorEngine`, `RiskEngine`, `AnomalyDetector` and
//!   `ReportAssembler` hold nothing but a borrowed `AnalysisConfig`, so concurrent
//!   requests never share mutable state.
//! - **Explicit Nulls:** Any metric without enough history is `None` and serializes as
//!   `null`. NaN and infinity never reach a payload.
//!
//! ## Public API
//!
//! - `AnalyticsService`: Loads a series and assembles the requested payload.
//! - `SeriesLoader` / `PriceSource`: Ordered, de-duplicated history from any store.
//! - `ReportAssembler`: Builds the `analysis`, `report`, `anomalies` and `levels` payloads.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

pub mod anomaly;
pub mod comparison;
pub mod error;
pub mod indicators;
pub mod levels;
pub mod loader;
mod math;
pub mod memory;
pub mod report;
pub mod risk;
pub mod series;
pub mod service;
pub mod stats;
pub mod trend;

pub use anomaly::{AnomalyDetector, AnomalyReport};
pub use comparison::{CorrelationMatrix, IndexedComparison};
pub use error::{AnalyticsError, SourceError};
pub use indicators::{IndicatorEngine, IndicatorFrame};
pub use levels::Levels;
pub use loader::{PriceSource, SeriesLoader};
pub use memory::MemorySource;
pub use report::{AnalysisPayload, AnomaliesPayload, LevelsPayload, ReportAssembler, ReportPayload};
pub use risk::{RiskEngine, RiskMetrics};
pub use series::{DataQuality, Series};
pub use service::{AnalyticsService, parse_coin_list};
pub use stats::DescriptiveStats;
