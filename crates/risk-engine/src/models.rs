use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How the initial stop was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopLossType {
    /// Stop at the entry bar's low.
    LowOfDay,
    /// Low-of-day was wider than one ATR; stop tightened to entry - ATR.
    AtrAdjusted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopLossDetails {
    pub stop_loss_price: f64,
    pub stop_loss_type: StopLossType,
    pub low_of_day: f64,
    pub atr_value: f64,
    /// Entry price minus stop price.
    pub stop_distance: f64,
    pub stop_distance_pct: f64,
    /// Stop distance expressed in ATRs.
    pub atr_multiple: f64,
    pub adjusted: bool,
    pub adjustment_reason: Option<String>,
}

/// Fixed-fractional sizing output. `shares` may be zero when the risk budget
/// cannot cover a single share at this stop distance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSizing {
    pub shares: u64,
    pub entry_price: f64,
    pub stop_loss_price: f64,
    pub risk_per_share: f64,
    pub position_value: f64,
    pub position_pct_of_equity: f64,
    /// Dollars actually at risk: shares * risk_per_share.
    pub risk_amount: f64,
    pub risk_pct: f64,
    /// Share of the per-trade risk budget consumed.
    pub risk_utilization_pct: f64,
}

/// First close below the trailing SMA after entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitSignal {
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub sma: f64,
    /// Trading days held, entry day inclusive.
    pub days_held: usize,
    /// Per-share profit or loss at the exit close.
    pub profit_loss: f64,
    pub profit_loss_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingStopStatus {
    pub current_price: f64,
    pub current_sma: f64,
    pub price_below_sma: bool,
    pub distance_to_sma: f64,
    pub distance_pct: f64,
    pub should_exit_now: bool,
    /// Set when the exit rule has already fired; scanning stops at the first
    /// crossing even if price later recovers.
    pub exit_signal: Option<ExitSignal>,
    pub days_since_entry: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRewardTargets {
    pub risk_per_share: f64,
    /// Measured-move target: range high plus range height.
    pub target_1: f64,
    pub reward_1: f64,
    pub rr_ratio_1: f64,
    /// Prior-peak target.
    pub target_2: f64,
    pub reward_2: f64,
    pub rr_ratio_2: f64,
    pub range_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    InvalidEntry,
    StopLossError,
    PositionError,
    /// Sizing succeeded but the risk budget rounds down to zero shares.
    PositionTooSmall,
    Ready,
}

/// Complete trade workup. Stop and sizing failures are terminal; trailing
/// stop and risk/reward problems degrade to warnings with the fields left
/// unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradePlan {
    pub symbol: String,
    pub status: TradeStatus,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub stop_loss: Option<StopLossDetails>,
    pub position: Option<PositionSizing>,
    pub trailing_stop: Option<TrailingStopStatus>,
    pub risk_reward: Option<RiskRewardTargets>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl TradePlan {
    pub fn is_ready(&self) -> bool {
        self.status == TradeStatus::Ready
    }
}
