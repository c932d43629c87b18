use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StrategyError;

/// Daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    fn validate(&self) -> Result<(), String> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(format!("{}: non-positive or non-finite price", self.date));
        }
        if self.high < self.open.max(self.close).max(self.low) {
            return Err(format!("{}: high below open/close/low", self.date));
        }
        if self.low > self.open.min(self.close).min(self.high) {
            return Err(format!("{}: low above open/close/high", self.date));
        }
        Ok(())
    }
}

/// Chronologically ordered daily price history for a single symbol.
///
/// Construction validates the series once; every downstream stage can then
/// index freely without re-checking ordering or bar shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series from bars already sorted oldest-first.
    ///
    /// Rejects empty input, out-of-order or duplicate dates, and bars that
    /// violate OHLC shape. A rejected series is a caller bug, not a signal
    /// outcome, so this is the one place the crate fails fast.
    pub fn new(bars: Vec<Bar>) -> Result<Self, StrategyError> {
        if bars.is_empty() {
            return Err(StrategyError::InvalidSeries("empty series".to_string()));
        }
        for bar in &bars {
            bar.validate().map_err(StrategyError::InvalidSeries)?;
        }
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(StrategyError::InvalidSeries(format!(
                    "dates not strictly increasing: {} then {}",
                    pair[0].date, pair[1].date
                )));
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        false // len >= 1 by construction
    }

    /// Most recent bar.
    pub fn last(&self) -> &Bar {
        self.bars.last().expect("series is non-empty by construction")
    }

    pub fn last_index(&self) -> usize {
        self.bars.len() - 1
    }

    /// Position of a trading date, if present.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by(|b| b.date.cmp(&date)).ok()
    }
}
