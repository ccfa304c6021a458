//! An in-process `PriceSource`, used by tests and local experiments.

use crate::error::SourceError;
use crate::loader::PriceSource;
use async_trait::async_trait;
use core_types::PricePoint;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemorySource {
    coins: BTreeMap<String, Vec<PricePoint>>,
    failures_left: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coin(mut self, coin: impl Into<String>, points: Vec<PricePoint>) -> Self {
        self.coins.insert(coin.into(), points);
        self
    }

    /// Makes the next `n` calls fail with `SourceError::Unavailable`.
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    fn check_available(&self) -> Result<(), SourceError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(SourceError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceSource for MemorySource {
    async fn fetch_prices(&self, coin: &str) -> Result<Vec<PricePoint>, SourceError> {
        self.check_available()?;
        Ok(self.coins.get(coin).cloned().unwrap_or_default())
    }

    async fn list_coins(&self) -> Result<Vec<String>, SourceError> {
        self.check_available()?;
        Ok(self.coins.keys().cloned().collect())
    }
}
