use serde::{Deserialize, Serialize};
use strategy_core::PriceSeries;
use technical_indicators::sma_at;

/// Liquidity and trend thresholds. Defaults follow the production scan:
/// $3 minimum price, 300k average volume, 50-bar lookback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    pub min_price: f64,
    pub min_volume: f64,
    pub sma_period: usize,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            min_price: 3.0,
            min_volume: 300_000.0,
            sma_period: 50,
        }
    }
}

/// Outcome of a screen, with a human-readable reason either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerResult {
    pub passed: bool,
    pub reason: String,
}

impl ScreenerResult {
    fn pass(reason: String) -> Self {
        Self { passed: true, reason }
    }

    fn fail(reason: String) -> Self {
        Self { passed: false, reason }
    }
}

/// Mean volume over the trailing `period` bars, 0 when the series is shorter.
pub fn average_volume(series: &PriceSeries, period: usize) -> f64 {
    let bars = series.bars();
    if period == 0 || bars.len() < period {
        return 0.0;
    }
    let sum: u64 = bars[bars.len() - period..].iter().map(|b| b.volume).sum();
    sum as f64 / period as f64
}

/// SMA of closes over the trailing `period` bars, 0 when the series is shorter.
pub fn closing_sma(series: &PriceSeries, period: usize) -> f64 {
    let closes: Vec<f64> = series.bars().iter().map(|b| b.close).collect();
    sma_at(&closes, period, closes.len().saturating_sub(1)).unwrap_or(0.0)
}

/// Price and average-volume floor. A short series zeroes the average volume,
/// which fails the volume check with an insufficiency reason.
pub fn liquidity_check(series: &PriceSeries, config: &ScreenerConfig) -> ScreenerResult {
    let current_price = series.last().close;

    if current_price < config.min_price {
        return ScreenerResult::fail(format!(
            "Price ${:.2} < ${:.2}",
            current_price, config.min_price
        ));
    }

    let avg_volume = average_volume(series, config.sma_period);
    if avg_volume < config.min_volume {
        return ScreenerResult::fail(format!(
            "{}-day avg volume {:.0} < {:.0}",
            config.sma_period, avg_volume, config.min_volume
        ));
    }

    ScreenerResult::pass(format!(
        "Passed liquidity: ${:.2}, vol {:.0}",
        current_price, avg_volume
    ))
}

/// Close above the trailing SMA. A short series zeroes the SMA, which reads
/// as insufficient data rather than a trend verdict.
pub fn trend_check(series: &PriceSeries, config: &ScreenerConfig) -> ScreenerResult {
    let current_price = series.last().close;
    let sma = closing_sma(series, config.sma_period);

    if sma == 0.0 {
        return ScreenerResult::fail(format!(
            "Insufficient data for {}-day SMA",
            config.sma_period
        ));
    }

    if current_price <= sma {
        return ScreenerResult::fail(format!(
            "Price ${:.2} <= {}-SMA ${:.2}",
            current_price, config.sma_period, sma
        ));
    }

    ScreenerResult::pass(format!(
        "Price ${:.2} > {}-SMA ${:.2}",
        current_price, config.sma_period, sma
    ))
}

/// Liquidity then trend, short-circuiting on the first failure.
pub fn run_screener(series: &PriceSeries, config: &ScreenerConfig) -> ScreenerResult {
    let liquidity = liquidity_check(series, config);
    if !liquidity.passed {
        tracing::debug!(reason = %liquidity.reason, "screener rejected on liquidity");
        return ScreenerResult::fail(format!("SCREENER FAIL - Liquidity: {}", liquidity.reason));
    }

    let trend = trend_check(series, config);
    if !trend.passed {
        tracing::debug!(reason = %trend.reason, "screener rejected on trend");
        return ScreenerResult::fail(format!("SCREENER FAIL - Trend: {}", trend.reason));
    }

    ScreenerResult::pass(format!(
        "SCREENER PASS: {}, {}",
        liquidity.reason, trend.reason
    ))
}
