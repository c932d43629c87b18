#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use signaller::{EntryEvaluation, Signal, SignalPipeline};
    use strategy_core::{Bar, PriceSeries, StrategyError};

    use crate::engine::{RiskConfig, RiskEngine};
    use crate::models::{StopLossType, TradeStatus};

    fn date(i: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
    }

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date: date(i),
            open,
            high,
            low,
            close,
            volume: 1_000_000,
        }
    }

    fn bar_at(i: usize, close: f64) -> Bar {
        bar(i, close - 0.2, close + 0.5, close - 0.5, close)
    }

    fn engine() -> RiskEngine {
        RiskEngine::new(RiskConfig::default()).unwrap()
    }

    /// Flat 99-101 band for `count` bars, then one caller-supplied entry bar.
    fn flat_then(count: usize, entry_bar: Bar) -> PriceSeries {
        let mut bars: Vec<Bar> = (0..count).map(|i| bar(i, 99.0, 100.0, 98.0, 99.0)).collect();
        bars.push(entry_bar);
        PriceSeries::new(bars).unwrap()
    }

    /// Same shape as the signal-pipeline breakout fixture: ramp, 63-day rise,
    /// peak 134, base 124-127.5, confirmed breakout bar at index 199.
    fn breakout_series() -> PriceSeries {
        let mut bars = Vec::with_capacity(200);
        for i in 0..=126 {
            bars.push(bar_at(i, 50.0 + i as f64 * (40.0 / 126.0)));
        }
        for i in 127..=184 {
            bars.push(bar_at(i, 90.0 + (i - 127) as f64 * (40.0 / 57.0)));
        }
        bars.push(bar(185, 130.0, 134.0, 129.0, 130.0));
        bars.push(bar(186, 128.0, 129.0, 126.0, 127.0));
        bars.push(bar(187, 126.0, 126.5, 124.0, 125.0));
        for i in 188..=198 {
            let close = if i % 2 == 0 { 125.0 } else { 126.5 };
            bars.push(bar(i, close - 0.5, close + 1.0, close - 1.0, close));
        }
        bars.push(bar(199, 129.0, 131.0, 128.5, 130.0));
        PriceSeries::new(bars).unwrap()
    }

    // ===== Engine construction =====

    #[test]
    fn rejects_non_positive_equity() {
        let config = RiskConfig {
            account_equity: 0.0,
            ..Default::default()
        };
        assert!(RiskEngine::new(config).is_err());
    }

    #[test]
    fn rejects_out_of_range_risk_percent() {
        for pct in [0.0, -1.0, 150.0] {
            let config = RiskConfig {
                max_risk_percent: pct,
                ..Default::default()
            };
            assert!(RiskEngine::new(config).is_err(), "pct {} must be rejected", pct);
        }
    }

    #[test]
    fn derives_risk_budget_from_equity() {
        let engine = engine();
        assert_relative_eq!(engine.max_risk_amount(), 2_000.0, epsilon = 1e-9);
    }

    // ===== Stop loss =====

    #[test]
    fn stop_uses_low_of_day_when_inside_atr() {
        // Flat band gives ATR ~2; the 1.0 low-of-day distance stays as-is
        let series = flat_then(30, bar(30, 99.5, 100.5, 99.0, 100.0));
        let stop = engine()
            .calculate_stop_loss(&series, 100.0, date(30))
            .unwrap();

        assert_eq!(stop.stop_loss_type, StopLossType::LowOfDay);
        assert!(!stop.adjusted);
        assert!(stop.adjustment_reason.is_none());
        assert_relative_eq!(stop.stop_loss_price, 99.0, epsilon = 1e-9);
        assert_relative_eq!(stop.stop_distance, 1.0, epsilon = 1e-9);
        assert!(stop.atr_multiple < 1.0);
    }

    #[test]
    fn stop_tightens_to_one_atr_when_low_is_wide() {
        // Low-of-day 97 sits 3.0 below a 100 entry; ATR is (13*2 + 3)/14
        let series = flat_then(30, bar(30, 99.0, 100.0, 97.0, 100.0));
        let stop = engine()
            .calculate_stop_loss(&series, 100.0, date(30))
            .unwrap();

        let expected_atr = 29.0 / 14.0;
        assert_eq!(stop.stop_loss_type, StopLossType::AtrAdjusted);
        assert!(stop.adjusted);
        assert!(stop.adjustment_reason.is_some());
        assert_relative_eq!(stop.atr_value, expected_atr, epsilon = 1e-9);
        assert_relative_eq!(stop.stop_loss_price, 100.0 - expected_atr, epsilon = 1e-9);
        assert_relative_eq!(stop.atr_multiple, 1.0, epsilon = 1e-9);
        assert_relative_eq!(stop.low_of_day, 97.0, epsilon = 1e-9);
    }

    #[test]
    fn stop_at_entry_is_rejected_not_divided() {
        // Doji at the low: the natural stop equals the entry price
        let series = flat_then(30, bar(30, 100.0, 100.0, 100.0, 100.0));
        let result = engine().calculate_stop_loss(&series, 100.0, date(30));
        assert!(matches!(result, Err(StrategyError::InvalidStop(_))));
    }

    #[test]
    fn stop_requires_atr_history() {
        let series = flat_then(5, bar(5, 99.5, 100.5, 99.0, 100.0));
        let result = engine().calculate_stop_loss(&series, 100.0, date(5));
        assert!(matches!(result, Err(StrategyError::InsufficientData(_))));
    }

    #[test]
    fn stop_falls_back_to_latest_atr_for_early_entry() {
        // Entry bar predates a full ATR window, but the series end has one
        let series =
            PriceSeries::new((0..40).map(|i| bar(i, 99.0, 100.0, 98.0, 99.0)).collect()).unwrap();
        let stop = engine()
            .calculate_stop_loss(&series, 100.0, date(5))
            .unwrap();

        // Every bar has TR = 2, so the latest ATR is exactly 2
        assert_relative_eq!(stop.atr_value, 2.0, epsilon = 1e-9);
        assert_eq!(stop.stop_loss_type, StopLossType::LowOfDay);
        assert_relative_eq!(stop.stop_loss_price, 98.0, epsilon = 1e-9);
    }

    #[test]
    fn stop_requires_known_entry_date() {
        let series = flat_then(30, bar(30, 99.5, 100.5, 99.0, 100.0));
        let result = engine().calculate_stop_loss(&series, 100.0, date(400));
        assert!(matches!(result, Err(StrategyError::DateNotFound(_))));
    }

    // ===== Position sizing =====

    #[test]
    fn sizing_floors_shares_and_caps_risk() {
        let sizing = engine().calculate_position_size(100.0, 97.0).unwrap();

        assert_eq!(sizing.shares, 666);
        assert_relative_eq!(sizing.risk_per_share, 3.0, epsilon = 1e-9);
        assert_relative_eq!(sizing.risk_amount, 1_998.0, epsilon = 1e-9);
        assert!(sizing.risk_amount <= 2_000.0);
        assert_relative_eq!(sizing.risk_pct, 1.998, epsilon = 1e-9);
        assert_relative_eq!(sizing.risk_utilization_pct, 99.9, epsilon = 1e-9);
        assert_relative_eq!(sizing.position_value, 66_600.0, epsilon = 1e-9);
    }

    #[test]
    fn sizing_rejects_entry_at_or_below_stop() {
        let engine = engine();
        assert!(matches!(
            engine.calculate_position_size(100.0, 100.0),
            Err(StrategyError::InvalidRisk(_))
        ));
        assert!(matches!(
            engine.calculate_position_size(95.0, 100.0),
            Err(StrategyError::InvalidRisk(_))
        ));
    }

    #[test]
    fn sizing_returns_zero_shares_for_tiny_budget() {
        let config = RiskConfig {
            account_equity: 1_000.0,
            max_risk_percent: 1.0,
            ..Default::default()
        };
        let engine = RiskEngine::new(config).unwrap();

        // $10 budget against a $20 stop distance
        let sizing = engine.calculate_position_size(100.0, 80.0).unwrap();
        assert_eq!(sizing.shares, 0);
        assert_relative_eq!(sizing.risk_amount, 0.0, epsilon = 1e-9);
    }

    // ===== Trailing stop =====

    fn trailing_series(closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, c)| bar(i, c - 0.2, c + 1.0, c - 1.0, *c))
            .collect();
        PriceSeries::new(bars).unwrap()
    }

    #[test]
    fn trailing_fires_on_first_close_below_sma() {
        // Ten flat closes seed the SMA, then a steady decline
        let mut closes = vec![100.0; 10];
        for k in 1..=10 {
            closes.push(100.0 - k as f64);
        }
        let series = trailing_series(&closes);

        let status = engine()
            .calculate_trailing_stop(&series, date(0), 100.0)
            .unwrap();
        let exit = status.exit_signal.unwrap();

        // First crossing: close 99 vs SMA 99.9 at index 10
        assert_eq!(exit.exit_date, date(10));
        assert_relative_eq!(exit.exit_price, 99.0, epsilon = 1e-9);
        assert_relative_eq!(exit.sma, 99.9, epsilon = 1e-9);
        assert_eq!(exit.days_held, 11);
        assert_relative_eq!(exit.profit_loss, -1.0, epsilon = 1e-9);
        assert_relative_eq!(exit.profit_loss_pct, -1.0, epsilon = 1e-9);

        assert!(status.should_exit_now);
        assert!(status.price_below_sma);
        assert_eq!(status.days_since_entry, closes.len() - 1);

        // Live gap: close 90 vs SMA 94.5, expressed against the price
        assert_relative_eq!(status.distance_to_sma, -4.5, epsilon = 1e-9);
        assert_relative_eq!(status.distance_pct, -5.0, epsilon = 1e-9);
    }

    #[test]
    fn trailing_exit_survives_recovery() {
        // One dip below the SMA, then a rally: the exit stands, but the live
        // reading no longer calls for an exit
        let mut closes = vec![100.0; 10];
        closes.push(99.0);
        closes.extend(std::iter::repeat(105.0).take(9));
        let series = trailing_series(&closes);

        let status = engine()
            .calculate_trailing_stop(&series, date(0), 100.0)
            .unwrap();

        let exit = status.exit_signal.unwrap();
        assert_eq!(exit.exit_date, date(10));
        assert!(!status.should_exit_now);
        assert!(!status.price_below_sma);
        assert_relative_eq!(status.current_price, 105.0, epsilon = 1e-9);
    }

    #[test]
    fn trailing_holds_above_sma() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = trailing_series(&closes);

        let status = engine()
            .calculate_trailing_stop(&series, date(0), 100.0)
            .unwrap();
        assert!(status.exit_signal.is_none());
        assert!(!status.should_exit_now);
        assert!(status.distance_to_sma > 0.0);
    }

    #[test]
    fn trailing_requires_post_entry_history() {
        let closes = vec![100.0; 20];
        let series = trailing_series(&closes);

        // Entry five bars from the end leaves too little for a 10-bar SMA
        let result = engine().calculate_trailing_stop(&series, date(15), 100.0);
        assert!(matches!(result, Err(StrategyError::InsufficientData(_))));
    }

    // ===== Risk/reward targets =====

    #[test]
    fn targets_use_measured_move_and_prior_peak() {
        let targets = engine()
            .calculate_risk_reward(103.0, 100.0, 102.0, 98.0, 110.0)
            .unwrap();

        assert_relative_eq!(targets.range_height, 4.0, epsilon = 1e-9);
        assert_relative_eq!(targets.target_1, 106.0, epsilon = 1e-9);
        assert_relative_eq!(targets.reward_1, 3.0, epsilon = 1e-9);
        assert_relative_eq!(targets.rr_ratio_1, 1.0, epsilon = 1e-9);
        assert_relative_eq!(targets.target_2, 110.0, epsilon = 1e-9);
        assert_relative_eq!(targets.reward_2, 7.0, epsilon = 1e-9);
        assert_relative_eq!(targets.rr_ratio_2, 7.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn peak_below_entry_offers_no_second_target() {
        let targets = engine()
            .calculate_risk_reward(103.0, 100.0, 102.0, 98.0, 101.0)
            .unwrap();
        assert_relative_eq!(targets.reward_2, 0.0, epsilon = 1e-9);
        assert_relative_eq!(targets.rr_ratio_2, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn peak_at_range_high_offers_no_second_target() {
        // The peak must clear the range high, not merely the entry
        let targets = engine()
            .calculate_risk_reward(100.0, 97.0, 102.0, 98.0, 102.0)
            .unwrap();
        assert_relative_eq!(targets.target_2, 102.0, epsilon = 1e-9);
        assert_relative_eq!(targets.reward_2, 0.0, epsilon = 1e-9);
        assert_relative_eq!(targets.rr_ratio_2, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn targets_reject_degenerate_inputs() {
        let engine = engine();
        assert!(matches!(
            engine.calculate_risk_reward(103.0, 100.0, 98.0, 102.0, 110.0),
            Err(StrategyError::InvalidRange(_))
        ));
        assert!(matches!(
            engine.calculate_risk_reward(100.0, 100.0, 102.0, 98.0, 110.0),
            Err(StrategyError::InvalidRisk(_))
        ));
    }

    // ===== Full trade workup =====

    fn confirmed_entry(series: &PriceSeries) -> (signaller::ConsolidationInfo, signaller::EntryDetails) {
        let report = SignalPipeline::new().evaluate("NVDA", series);
        assert_eq!(report.signal, Signal::Buy);
        let consolidation = report.consolidation.unwrap();
        match report.entry.unwrap() {
            EntryEvaluation::Triggered(details) => (consolidation, details),
            other => panic!("expected Triggered, got {:?}", other),
        }
    }

    #[test]
    fn execute_trade_builds_ready_plan() {
        let series = breakout_series();
        let (consolidation, entry) = confirmed_entry(&series);

        let plan = engine().execute_trade("NVDA", &series, &consolidation, &entry);

        assert_eq!(plan.status, TradeStatus::Ready);
        assert!(plan.is_ready());
        assert!(plan.errors.is_empty());

        // Low-of-day 128.5 sits 1.5 under the 130 entry, inside one ATR
        let stop = plan.stop_loss.as_ref().unwrap();
        assert_eq!(stop.stop_loss_type, StopLossType::LowOfDay);
        assert_relative_eq!(stop.stop_loss_price, 128.5, epsilon = 1e-9);
        assert_relative_eq!(stop.atr_value, 40.5 / 14.0, epsilon = 1e-9);

        let position = plan.position.as_ref().unwrap();
        assert_eq!(position.shares, 1_333);
        assert!(position.risk_amount <= 2_000.0);

        // Only the breakout bar exists past entry: trailing degrades to a warning
        assert!(plan.trailing_stop.is_none());
        assert!(plan.warnings.iter().any(|w| w.contains("trailing stop")));

        let targets = plan.risk_reward.as_ref().unwrap();
        assert_relative_eq!(targets.target_1, 131.0, epsilon = 1e-9);
        assert_relative_eq!(targets.target_2, 134.0, epsilon = 1e-9);
        assert_relative_eq!(targets.range_height, 3.5, epsilon = 1e-9);
    }

    #[test]
    fn execute_trade_flags_stop_errors_as_terminal() {
        // Doji at the low: stop placement collapses onto the entry price
        let series = flat_then(30, bar(30, 100.0, 100.0, 100.0, 100.0));
        let entry = signaller::EntryDetails {
            entry_price: 100.0,
            entry_date: date(30),
            entry_date_index: 30,
            breakout_level: 99.0,
            stop_loss_level: 98.0,
            risk_per_share: 2.0,
            risk_pct: 2.0,
        };

        let plan = engine().execute_trade(
            "XYZ",
            &series,
            &signaller::ConsolidationInfo::default(),
            &entry,
        );

        assert_eq!(plan.status, TradeStatus::StopLossError);
        assert!(plan.position.is_none());
        assert!(plan.errors.iter().any(|e| e.contains("stop loss")));
    }

    #[test]
    fn execute_trade_reports_position_too_small() {
        let series = breakout_series();
        let (consolidation, entry) = confirmed_entry(&series);

        let config = RiskConfig {
            account_equity: 50.0,
            max_risk_percent: 2.0,
            ..Default::default()
        };
        let engine = RiskEngine::new(config).unwrap();
        let plan = engine.execute_trade("NVDA", &series, &consolidation, &entry);

        // $1 budget against a $1.50 stop distance
        assert_eq!(plan.status, TradeStatus::PositionTooSmall);
        assert_eq!(plan.position.as_ref().unwrap().shares, 0);
        assert!(plan.errors.is_empty());
        assert!(plan.warnings.iter().any(|w| w.contains("single share")));
    }

    #[test]
    fn trade_plan_serializes_to_json() {
        let series = breakout_series();
        let (consolidation, entry) = confirmed_entry(&series);
        let plan = engine().execute_trade("NVDA", &series, &consolidation, &entry);

        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["status"], "Ready");
        assert_eq!(value["symbol"], "NVDA");
        assert!(value["position"]["shares"].as_u64().unwrap() > 0);
    }
}
