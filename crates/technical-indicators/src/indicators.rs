use strategy_core::Bar;

/// Simple Moving Average
///
/// The first output value aligns with input index `period - 1`.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// SMA value at a specific input index, `None` where the window is not yet full.
pub fn sma_at(data: &[f64], period: usize, index: usize) -> Option<f64> {
    if period == 0 || index >= data.len() || index + 1 < period {
        return None;
    }
    let sum: f64 = data[index + 1 - period..=index].iter().sum();
    Some(sum / period as f64)
}

/// True range per bar. Bar 0 has no previous close, so output index `j`
/// corresponds to bar index `j + 1`.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    if bars.len() < 2 {
        return vec![];
    }

    let mut ranges = Vec::with_capacity(bars.len() - 1);
    for i in 1..bars.len() {
        let high_low = bars[i].high - bars[i].low;
        let high_close = (bars[i].high - bars[i - 1].close).abs();
        let low_close = (bars[i].low - bars[i - 1].close).abs();
        ranges.push(high_low.max(high_close).max(low_close));
    }
    ranges
}

/// Average True Range: simple rolling mean of the trailing `period` true
/// ranges. Undefined until `period` true-range values exist, so the first
/// output aligns with bar index `period`.
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    let ranges = true_range(bars);
    if period == 0 || ranges.len() < period {
        return vec![];
    }
    sma(&ranges, period)
}

/// ATR at a specific bar index, `None` until enough true ranges exist.
pub fn atr_at(bars: &[Bar], period: usize, index: usize) -> Option<f64> {
    if period == 0 || index >= bars.len() || index < period {
        return None;
    }
    let ranges = true_range(bars);
    // true_range index j = bar index j + 1
    sma_at(&ranges, period, index - 1)
}
