use chrono::NaiveDate;
use screener::{run_screener, ScreenerConfig, ScreenerResult};
use serde::{Deserialize, Serialize};
use strategy_core::PriceSeries;

use crate::consolidation::{evaluate_consolidation, ConsolidationConfig, ConsolidationInfo};
use crate::entry::{evaluate_entry, EntryConfig, EntryEvaluation};
use crate::riser::{evaluate_riser, RiserConfig, RiserInfo};

/// Terminal state of one pipeline evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    ScreenerFail,
    RiserFail,
    ConsolidationFail,
    Hold,
    Buy,
}

/// What the caller should do with the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Monitor,
    Ignore,
}

impl Signal {
    pub fn action(&self) -> Action {
        match self {
            Signal::Buy => Action::Buy,
            Signal::Hold => Action::Monitor,
            Signal::ScreenerFail | Signal::RiserFail | Signal::ConsolidationFail => Action::Ignore,
        }
    }

    pub fn is_buy(&self) -> bool {
        *self == Signal::Buy
    }
}

/// Full evaluation record: the terminal signal plus every stage's payload and
/// the ordered message trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReport {
    pub symbol: String,
    pub analysis_date: NaiveDate,
    pub current_price: f64,
    pub data_days: usize,
    pub signal: Signal,
    pub screener: ScreenerResult,
    pub riser: Option<RiserInfo>,
    pub consolidation: Option<ConsolidationInfo>,
    pub entry: Option<EntryEvaluation>,
    pub messages: Vec<String>,
}

/// Sequential screener -> riser -> consolidation -> entry state machine.
/// Each stage is a pure function of the series plus upstream outputs; the
/// pipeline is terminal on the first failing stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalPipeline {
    pub screener: ScreenerConfig,
    pub riser: RiserConfig,
    pub consolidation: ConsolidationConfig,
    pub entry: EntryConfig,
}

impl SignalPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&self, symbol: &str, series: &PriceSeries) -> SignalReport {
        let mut report = SignalReport {
            symbol: symbol.to_string(),
            analysis_date: series.last().date,
            current_price: series.last().close,
            data_days: series.len(),
            signal: Signal::ScreenerFail,
            screener: run_screener(series, &self.screener),
            riser: None,
            consolidation: None,
            entry: None,
            messages: Vec::new(),
        };

        report.messages.push(report.screener.reason.clone());
        if !report.screener.passed {
            tracing::debug!(symbol, reason = %report.screener.reason, "screener failed");
            return report;
        }

        let riser = evaluate_riser(series, &self.riser);
        report.messages.push(format!("RISER: {}", riser.message));
        let riser_passed = riser.passed;
        report.riser = Some(riser);
        if !riser_passed {
            tracing::debug!(symbol, "riser failed");
            report.signal = Signal::RiserFail;
            return report;
        }

        let consolidation = evaluate_consolidation(series, &self.consolidation);
        report
            .messages
            .push(format!("CONSOLIDATION: {}", consolidation.message));
        if !consolidation.passed {
            tracing::debug!(symbol, "consolidation failed");
            report.consolidation = Some(consolidation);
            report.signal = Signal::ConsolidationFail;
            return report;
        }

        let entry = evaluate_entry(series, &consolidation, &self.entry);
        report.consolidation = Some(consolidation);
        report.messages.push(format!("ENTRY: {}", entry.message()));
        report.signal = if entry.triggered() {
            Signal::Buy
        } else {
            Signal::Hold
        };
        report.entry = Some(entry);

        tracing::info!(symbol, signal = ?report.signal, "pipeline complete");
        report
    }
}
