use anyhow::bail;
use serde::{Deserialize, Serialize};
use signaller::{ConsolidationInfo, EntryDetails};
use strategy_core::{PriceSeries, StrategyError};
use technical_indicators::{atr_at, sma};

use crate::models::{
    ExitSignal, PositionSizing, RiskRewardTargets, StopLossDetails, StopLossType, TradePlan,
    TradeStatus, TrailingStopStatus,
};

/// Risk parameters. Defaults: $100k equity, 2% risk per trade, 14-bar ATR,
/// 10-bar trailing SMA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub account_equity: f64,
    pub max_risk_percent: f64,
    pub atr_period: usize,
    pub trailing_sma_period: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            account_equity: 100_000.0,
            max_risk_percent: 2.0,
            atr_period: 14,
            trailing_sma_period: 10,
        }
    }
}

/// Stop placement, position sizing, trailing exit, and target calculation
/// for a confirmed breakout entry.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: RiskConfig,
    /// Dollar risk budget per trade: equity * max_risk_percent.
    max_risk_amount: f64,
}

impl RiskEngine {
    pub fn new(config: RiskConfig) -> anyhow::Result<Self> {
        if !config.account_equity.is_finite() || config.account_equity <= 0.0 {
            bail!("account equity must be positive, got {}", config.account_equity);
        }
        if !(0.0..=100.0).contains(&config.max_risk_percent) || config.max_risk_percent == 0.0 {
            bail!(
                "max risk percent must be in (0, 100], got {}",
                config.max_risk_percent
            );
        }
        if config.atr_period == 0 {
            bail!("ATR period must be at least 1");
        }
        if config.trailing_sma_period < 2 {
            bail!(
                "trailing SMA period must be at least 2, got {}",
                config.trailing_sma_period
            );
        }

        let max_risk_amount = config.account_equity * config.max_risk_percent / 100.0;
        Ok(Self {
            config,
            max_risk_amount,
        })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn max_risk_amount(&self) -> f64 {
        self.max_risk_amount
    }

    /// Initial stop: the entry bar's low, tightened to entry - 1 ATR when the
    /// low sits more than one ATR away.
    pub fn calculate_stop_loss(
        &self,
        series: &PriceSeries,
        entry_price: f64,
        entry_date: chrono::NaiveDate,
    ) -> Result<StopLossDetails, StrategyError> {
        let index = series
            .index_of(entry_date)
            .ok_or(StrategyError::DateNotFound(entry_date))?;
        let low_of_day = series.bars()[index].low;

        // ATR at the entry bar, falling back to the most recent defined ATR
        let atr_value = atr_at(series.bars(), self.config.atr_period, index)
            .or_else(|| atr_at(series.bars(), self.config.atr_period, series.last_index()))
            .ok_or_else(|| {
                StrategyError::InsufficientData(format!(
                    "no {}-bar ATR available anywhere in series",
                    self.config.atr_period
                ))
            })?;

        let raw_distance = entry_price - low_of_day;
        let (stop_loss_price, stop_loss_type, adjustment_reason) = if raw_distance > atr_value {
            (
                entry_price - atr_value,
                StopLossType::AtrAdjusted,
                Some(format!(
                    "Low-of-day stop ${:.2} away > ATR ${:.2}; tightened to 1 ATR",
                    raw_distance, atr_value
                )),
            )
        } else {
            (low_of_day, StopLossType::LowOfDay, None)
        };

        if stop_loss_price <= 0.0 || stop_loss_price >= entry_price {
            return Err(StrategyError::InvalidStop(format!(
                "stop ${:.2} against entry ${:.2}",
                stop_loss_price, entry_price
            )));
        }

        let stop_distance = entry_price - stop_loss_price;
        Ok(StopLossDetails {
            stop_loss_price,
            stop_loss_type,
            low_of_day,
            atr_value,
            stop_distance,
            stop_distance_pct: stop_distance / entry_price * 100.0,
            atr_multiple: stop_distance / atr_value,
            adjusted: stop_loss_type == StopLossType::AtrAdjusted,
            adjustment_reason,
        })
    }

    /// Fixed-fractional sizing: shares = floor(risk budget / risk per share).
    /// Zero shares is a valid result; callers decide whether to skip.
    pub fn calculate_position_size(
        &self,
        entry_price: f64,
        stop_loss_price: f64,
    ) -> Result<PositionSizing, StrategyError> {
        if entry_price <= stop_loss_price {
            return Err(StrategyError::InvalidRisk(format!(
                "entry ${:.2} <= stop ${:.2}",
                entry_price, stop_loss_price
            )));
        }

        let risk_per_share = entry_price - stop_loss_price;
        let shares = (self.max_risk_amount / risk_per_share).floor() as u64;
        let position_value = shares as f64 * entry_price;
        let risk_amount = shares as f64 * risk_per_share;

        Ok(PositionSizing {
            shares,
            entry_price,
            stop_loss_price,
            risk_per_share,
            position_value,
            position_pct_of_equity: position_value / self.config.account_equity * 100.0,
            risk_amount,
            risk_pct: risk_amount / self.config.account_equity * 100.0,
            risk_utilization_pct: risk_amount / self.max_risk_amount * 100.0,
        })
    }

    /// Trailing exit: the first post-entry close below the trailing SMA fires
    /// an exit signal; later recoveries do not rescind it. The SMA is seeded
    /// from the entry bar forward, so the first `period - 1` bars after entry
    /// cannot trigger.
    pub fn calculate_trailing_stop(
        &self,
        series: &PriceSeries,
        entry_date: chrono::NaiveDate,
        entry_price: f64,
    ) -> Result<TrailingStopStatus, StrategyError> {
        let entry_index = series
            .index_of(entry_date)
            .ok_or(StrategyError::DateNotFound(entry_date))?;
        let segment = &series.bars()[entry_index..];
        let period = self.config.trailing_sma_period;

        if segment.len() < period {
            return Err(StrategyError::InsufficientData(format!(
                "need {} bars from entry for trailing SMA, got {}",
                period,
                segment.len()
            )));
        }

        let closes: Vec<f64> = segment.iter().map(|b| b.close).collect();
        let sma_values = sma(&closes, period);

        let mut exit_signal = None;
        for (k, sma_value) in sma_values.iter().enumerate() {
            let j = k + period - 1;
            if closes[j] < *sma_value {
                let profit_loss = closes[j] - entry_price;
                exit_signal = Some(ExitSignal {
                    exit_date: segment[j].date,
                    exit_price: closes[j],
                    sma: *sma_value,
                    days_held: j + 1,
                    profit_loss,
                    profit_loss_pct: profit_loss / entry_price * 100.0,
                });
                break;
            }
        }

        let current_price = closes[closes.len() - 1];
        let current_sma = sma_values[sma_values.len() - 1];
        let price_below_sma = current_price < current_sma;
        let distance_to_sma = current_price - current_sma;

        Ok(TrailingStopStatus {
            current_price,
            current_sma,
            price_below_sma,
            distance_to_sma,
            distance_pct: distance_to_sma / current_price * 100.0,
            should_exit_now: price_below_sma,
            exit_signal,
            days_since_entry: segment.len() - 1,
        })
    }

    /// Measured-move and prior-peak targets against the planned risk.
    pub fn calculate_risk_reward(
        &self,
        entry_price: f64,
        stop_loss_price: f64,
        range_high: f64,
        range_low: f64,
        peak_price: f64,
    ) -> Result<RiskRewardTargets, StrategyError> {
        if range_high <= range_low {
            return Err(StrategyError::InvalidRange(format!(
                "range high ${:.2} <= low ${:.2}",
                range_high, range_low
            )));
        }
        let risk_per_share = entry_price - stop_loss_price;
        if risk_per_share <= 0.0 {
            return Err(StrategyError::InvalidRisk(format!(
                "entry ${:.2} <= stop ${:.2}",
                entry_price, stop_loss_price
            )));
        }

        let range_height = range_high - range_low;
        let target_1 = range_high + range_height;
        let reward_1 = target_1 - entry_price;
        let target_2 = peak_price;
        // Only a peak above the range offers a second target; the clamp
        // covers a peak between the range high and the entry fill
        let reward_2 = if peak_price > range_high {
            (target_2 - entry_price).max(0.0)
        } else {
            0.0
        };

        Ok(RiskRewardTargets {
            risk_per_share,
            target_1,
            reward_1,
            rr_ratio_1: reward_1 / risk_per_share,
            target_2,
            reward_2,
            rr_ratio_2: reward_2 / risk_per_share,
            range_height,
        })
    }

    /// Full trade workup for a confirmed entry. Stop and sizing failures are
    /// terminal; trailing-stop and target failures downgrade to warnings.
    pub fn execute_trade(
        &self,
        symbol: &str,
        series: &PriceSeries,
        consolidation: &ConsolidationInfo,
        entry: &EntryDetails,
    ) -> TradePlan {
        let mut plan = TradePlan {
            symbol: symbol.to_string(),
            status: TradeStatus::InvalidEntry,
            entry_price: entry.entry_price,
            entry_date: entry.entry_date,
            stop_loss: None,
            position: None,
            trailing_stop: None,
            risk_reward: None,
            warnings: Vec::new(),
            errors: Vec::new(),
        };

        if !entry.entry_price.is_finite() || entry.entry_price <= 0.0 {
            plan.errors
                .push(format!("invalid entry price {}", entry.entry_price));
            return plan;
        }

        let stop_loss =
            match self.calculate_stop_loss(series, entry.entry_price, entry.entry_date) {
                Ok(details) => details,
                Err(err) => {
                    plan.status = TradeStatus::StopLossError;
                    plan.errors.push(format!("stop loss: {}", err));
                    return plan;
                }
            };

        let position =
            match self.calculate_position_size(entry.entry_price, stop_loss.stop_loss_price) {
                Ok(sizing) => sizing,
                Err(err) => {
                    plan.status = TradeStatus::PositionError;
                    plan.stop_loss = Some(stop_loss);
                    plan.errors.push(format!("position size: {}", err));
                    return plan;
                }
            };

        match self.calculate_trailing_stop(series, entry.entry_date, entry.entry_price) {
            Ok(status) => plan.trailing_stop = Some(status),
            Err(err) => plan.warnings.push(format!("trailing stop: {}", err)),
        }

        match self.calculate_risk_reward(
            entry.entry_price,
            stop_loss.stop_loss_price,
            consolidation.consolidation_high,
            consolidation.consolidation_low,
            consolidation.peak_price,
        ) {
            Ok(targets) => plan.risk_reward = Some(targets),
            Err(err) => plan.warnings.push(format!("risk/reward: {}", err)),
        }

        plan.status = if position.shares > 0 {
            TradeStatus::Ready
        } else {
            plan.warnings
                .push("risk budget too small for a single share".to_string());
            TradeStatus::PositionTooSmall
        };
        plan.stop_loss = Some(stop_loss);
        plan.position = Some(position);

        tracing::info!(symbol, status = ?plan.status, "trade plan built");
        plan
    }
}
