use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strategy_core::{Bar, PriceSeries};

/// Consolidation-range detection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Trailing window searched for the peak.
    pub lookback: usize,
    pub min_days: usize,
    pub max_days: usize,
    pub max_retracement_pct: f64,
    /// Intrabar wick allowance above the range high.
    pub upper_buffer: f64,
    /// Intrabar wick allowance below the range low.
    pub lower_buffer: f64,
    pub min_close_in_range_pct: f64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            lookback: 63,
            min_days: 4,
            max_days: 40,
            max_retracement_pct: 25.0,
            upper_buffer: 0.01,
            lower_buffer: 0.01,
            min_close_in_range_pct: 70.0,
        }
    }
}

/// Why consolidation detection stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConsolidationFailure {
    InsufficientData,
    /// The 63-day peak is the most recent bar; nothing has based after it.
    NoConsolidation,
    RetracementTooDeep,
    TooShort,
    TooLong,
    /// First bar whose wick escaped the buffered range.
    RangeViolation { date: NaiveDate },
    WeakCloseDiscipline,
}

/// Consolidation descriptor. Fields are filled in step order, so on failure
/// everything computed before the failing step is still populated for
/// diagnostics; `failure_reason` is `None` only on a full pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidationInfo {
    pub passed: bool,
    pub peak_price: f64,
    pub peak_index: Option<usize>,
    pub retracement_low_price: f64,
    pub retracement_low_index: Option<usize>,
    pub retracement_pct: f64,
    pub consolidation_high: f64,
    pub consolidation_high_index: Option<usize>,
    pub consolidation_low: f64,
    pub days_in_consolidation: usize,
    pub days_since_peak: usize,
    pub range_width_pct: f64,
    pub upper_bound: f64,
    pub lower_bound: f64,
    pub close_in_range_pct: f64,
    pub current_position_in_range_pct: f64,
    pub breakout_level: f64,
    pub stop_loss_level: f64,
    pub failure_reason: Option<ConsolidationFailure>,
    pub message: String,
}

impl ConsolidationInfo {
    fn fail(mut self, reason: ConsolidationFailure, message: String) -> Self {
        self.failure_reason = Some(reason);
        self.message = message;
        self
    }
}

/// Earliest index of the maximum high in `bars[range]`; stable left-to-right
/// scan so ties resolve to the first occurrence.
fn max_high(bars: &[Bar], start: usize, end: usize) -> (usize, f64) {
    let mut best_idx = start;
    let mut best = bars[start].high;
    for (i, bar) in bars[start..end].iter().enumerate().skip(1) {
        if bar.high > best {
            best = bar.high;
            best_idx = start + i;
        }
    }
    (best_idx, best)
}

/// Earliest index of the minimum low in `bars[start..end]`.
fn min_low(bars: &[Bar], start: usize, end: usize) -> (usize, f64) {
    let mut best_idx = start;
    let mut best = bars[start].low;
    for (i, bar) in bars[start..end].iter().enumerate().skip(1) {
        if bar.low < best {
            best = bar.low;
            best_idx = start + i;
        }
    }
    (best_idx, best)
}

/// Detect a post-retracement basing range.
///
/// The peak, retracement low, and day count use the full series. The range
/// itself (high, buffered-bound integrity, close discipline) is measured over
/// the basing segment that EXCLUDES the most recent bar: that bar is the
/// candidate breakout bar, and folding it into the range would move the
/// breakout level to whatever it just printed.
pub fn evaluate_consolidation(
    series: &PriceSeries,
    config: &ConsolidationConfig,
) -> ConsolidationInfo {
    let mut info = ConsolidationInfo::default();
    let bars = series.bars();
    let last = series.last_index();

    if bars.len() < config.lookback {
        return info.fail(
            ConsolidationFailure::InsufficientData,
            format!("Need {}+ days, got {}", config.lookback, bars.len()),
        );
    }

    // Peak within the trailing lookback window
    let window_start = bars.len() - config.lookback;
    let (peak_index, peak_price) = max_high(bars, window_start, bars.len());
    info.peak_price = peak_price;
    info.peak_index = Some(peak_index);
    info.days_since_peak = last - peak_index;

    if peak_index == last {
        return info.fail(
            ConsolidationFailure::NoConsolidation,
            "Peak is most recent day - no consolidation".to_string(),
        );
    }

    // Retracement low strictly after the peak
    let (low_index, low_price) = min_low(bars, peak_index + 1, bars.len());
    info.retracement_low_price = low_price;
    info.retracement_low_index = Some(low_index);

    let retracement_pct = (peak_price - low_price) / peak_price * 100.0;
    info.retracement_pct = retracement_pct;
    if retracement_pct >= config.max_retracement_pct {
        return info.fail(
            ConsolidationFailure::RetracementTooDeep,
            format!(
                "Retracement {:.1}% >= {}%",
                retracement_pct, config.max_retracement_pct
            ),
        );
    }

    // The low day itself counts as day 0
    let days = last - low_index;
    info.days_in_consolidation = days;
    if days < config.min_days {
        return info.fail(
            ConsolidationFailure::TooShort,
            format!("Only {} days consolidation", days),
        );
    }
    if days > config.max_days {
        return info.fail(
            ConsolidationFailure::TooLong,
            format!("{} days > {} max", days, config.max_days),
        );
    }

    // Basing segment: low day through the bar before the candidate breakout
    // bar. Empty only when a caller-supplied min_days of 0 lets days == 0
    // through.
    let segment = &bars[low_index..last];
    if segment.is_empty() {
        return info.fail(
            ConsolidationFailure::TooShort,
            "No completed bars in basing range".to_string(),
        );
    }
    let (high_index, high_price) = max_high(bars, low_index, last);
    info.consolidation_high = high_price;
    info.consolidation_high_index = Some(high_index);
    info.consolidation_low = low_price;

    let upper_bound = high_price * (1.0 + config.upper_buffer);
    let lower_bound = low_price * (1.0 - config.lower_buffer);
    info.upper_bound = upper_bound;
    info.lower_bound = lower_bound;

    for bar in segment {
        if bar.high > upper_bound {
            return info.fail(
                ConsolidationFailure::RangeViolation { date: bar.date },
                format!(
                    "Range violation: {}: High ${:.2} > ${:.2}",
                    bar.date, bar.high, upper_bound
                ),
            );
        }
        if bar.low < lower_bound {
            return info.fail(
                ConsolidationFailure::RangeViolation { date: bar.date },
                format!(
                    "Range violation: {}: Low ${:.2} < ${:.2}",
                    bar.date, bar.low, lower_bound
                ),
            );
        }
    }

    // Closes must respect the unbuffered range
    let closes_in_range = segment
        .iter()
        .filter(|b| b.close >= low_price && b.close <= high_price)
        .count();
    let close_pct = closes_in_range as f64 / segment.len() as f64 * 100.0;
    info.close_in_range_pct = close_pct;
    if close_pct < config.min_close_in_range_pct {
        return info.fail(
            ConsolidationFailure::WeakCloseDiscipline,
            format!("Only {:.1}% closes within range", close_pct),
        );
    }

    let range_width_pct = (high_price - low_price) / high_price * 100.0;
    info.range_width_pct = range_width_pct;

    let current_close = bars[last].close;
    info.current_position_in_range_pct = if high_price > low_price {
        (current_close - low_price) / (high_price - low_price) * 100.0
    } else {
        50.0
    };

    info.breakout_level = high_price;
    info.stop_loss_level = low_price;
    info.passed = true;
    info.message = format!(
        "Consolidation PASS: {} days, range ${:.2}-${:.2} ({:.1}%), retrace {:.1}%",
        days, low_price, high_price, range_width_pct, retracement_pct
    );
    info
}
