use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strategy_core::PriceSeries;

use crate::consolidation::ConsolidationInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Fraction above the breakout level the intrabar high must clear.
    pub breakout_buffer: f64,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            breakout_buffer: 0.02,
        }
    }
}

/// Confirmed entry. The intrabar high confirms the breakout; the reported
/// fill price is the close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDetails {
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub entry_date_index: usize,
    pub breakout_level: f64,
    pub stop_loss_level: f64,
    pub risk_per_share: f64,
    pub risk_pct: f64,
}

/// Entry-trigger outcome. An entry price exists only inside `Triggered`, so
/// a no-breakout path cannot reference one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EntryEvaluation {
    Triggered(EntryDetails),
    NotTriggered {
        current_price: f64,
        breakout_level: f64,
        stop_loss_level: f64,
        distance_to_breakout_pct: f64,
    },
    InvalidLevels,
}

impl EntryEvaluation {
    pub fn triggered(&self) -> bool {
        matches!(self, EntryEvaluation::Triggered(_))
    }

    pub fn message(&self) -> String {
        match self {
            EntryEvaluation::Triggered(details) => format!(
                "BUY: Broke ${:.2} at ${:.2}",
                details.breakout_level, details.entry_price
            ),
            EntryEvaluation::NotTriggered {
                breakout_level,
                distance_to_breakout_pct,
                ..
            } => format!(
                "HOLD: Need +{:.1}% to break ${:.2}",
                distance_to_breakout_pct, breakout_level
            ),
            EntryEvaluation::InvalidLevels => "Invalid consolidation levels".to_string(),
        }
    }
}

/// Fire a BUY when the last bar's high clears the breakout level plus buffer.
pub fn evaluate_entry(
    series: &PriceSeries,
    consolidation: &ConsolidationInfo,
    config: &EntryConfig,
) -> EntryEvaluation {
    let breakout_level = consolidation.breakout_level;
    let stop_loss_level = consolidation.stop_loss_level;

    if breakout_level <= 0.0 || stop_loss_level <= 0.0 {
        return EntryEvaluation::InvalidLevels;
    }

    let bar = series.last();
    let current_high = bar.high;
    let current_close = bar.close;

    if current_high > breakout_level * (1.0 + config.breakout_buffer) {
        let risk_per_share = current_close - stop_loss_level;
        return EntryEvaluation::Triggered(EntryDetails {
            entry_price: current_close,
            entry_date: bar.date,
            entry_date_index: series.last_index(),
            breakout_level,
            stop_loss_level,
            risk_per_share,
            risk_pct: risk_per_share / current_close * 100.0,
        });
    }

    EntryEvaluation::NotTriggered {
        current_price: current_close,
        breakout_level,
        stop_loss_level,
        distance_to_breakout_pct: (breakout_level - current_close) / breakout_level * 100.0,
    }
}
