use serde::{Deserialize, Serialize};
use strategy_core::PriceSeries;

/// Momentum precondition: the close must have risen by a minimum percentage
/// over a fixed trailing window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiserConfig {
    pub window_days: usize,
    pub min_increase_pct: f64,
}

impl Default for RiserConfig {
    fn default() -> Self {
        Self {
            window_days: 63,
            min_increase_pct: 30.0,
        }
    }
}

/// Riser diagnostics, populated on pass and fail alike.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiserInfo {
    pub window_days: usize,
    pub min_required_pct: f64,
    pub price_then: f64,
    pub price_now: f64,
    pub increase_pct: f64,
    pub passed: bool,
    pub message: String,
}

/// Fixed-offset lookback: compares the last close against the close exactly
/// `window_days` bars back (inclusive counting), not a searched extreme.
pub fn evaluate_riser(series: &PriceSeries, config: &RiserConfig) -> RiserInfo {
    let mut info = RiserInfo {
        window_days: config.window_days,
        min_required_pct: config.min_increase_pct,
        ..Default::default()
    };

    let bars = series.bars();
    if bars.len() < config.window_days {
        info.message = format!(
            "Insufficient data: {} < {} days",
            bars.len(),
            config.window_days
        );
        return info;
    }

    let current = bars[bars.len() - 1].close;
    let past = bars[bars.len() - config.window_days].close;
    let increase_pct = (current - past) / past * 100.0;

    info.price_then = past;
    info.price_now = current;
    info.increase_pct = increase_pct;
    info.passed = increase_pct >= config.min_increase_pct;
    info.message = if info.passed {
        format!(
            "Riser PASS: +{:.1}% in {} days",
            increase_pct, config.window_days
        )
    } else {
        format!(
            "Riser FAIL: +{:.1}% < {}%",
            increase_pct, config.min_increase_pct
        )
    };

    info
}
