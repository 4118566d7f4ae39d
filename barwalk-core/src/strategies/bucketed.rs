//! Bucketed capital allocation (long only).
//!
//! Capital is committed in two buckets sized from the cash available when
//! the account was last flat (`start_cash`):
//! - trend bucket (`bucket_trend_pct`): `sma_20 > sma_60 > sma_120` and `macd_line > 0`
//! - oversold bucket (`bucket_rsi_pct`): `rsi_14 <= rsi_buy_th`
//!
//! Each bucket locks its notional the first time its condition holds after
//! flattening. The target weight is `allocated_notional / equity`, capped.
//!
//! Exits, checked in order:
//! 1. trailing stop at `high_since_entry - trail_k * atr_14` (never lowered)
//! 2. daily loss cap on equity: full exit plus a 24h cooldown
//! 3. one partial take per position when the MACD histogram turns down and
//!    the position is up at least `min_partial_pnl_pct`
//! 4. full exit when `rsi_14 >= rsi_sell_th`
//!
//! Guards: one state-changing action per bar, `min_hold_bars` between target
//! changes, a rebalance deadzone, and after every full exit a re-entry block
//! of `reentry_block_n` bars. Three or more losing exits in a row start a
//! cooldown of `cooldown_min` minutes per loss beyond the second.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::History;
use crate::error::StrategyError;
use crate::strategy::{finite_feature, Context, Decision, Strategy, StrategyParams};

/// Tunables, read from [`StrategyParams`] with these defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketParams {
    pub rsi_buy_th: f64,
    pub rsi_sell_th: f64,
    pub bucket_trend_pct: f64,
    pub bucket_rsi_pct: f64,
    pub weight_cap: f64,
    pub trail_k: f64,
    pub partial_take_ratio: f64,
    pub min_partial_pnl_pct: f64,
    /// Non-positive disables the cap.
    pub daily_loss_cap_pct: f64,
    pub cooldown_min: i64,
    pub reentry_block_n: usize,
    pub rebalance_deadzone: f64,
    pub min_hold_bars: usize,
}

impl Default for BucketParams {
    fn default() -> Self {
        Self {
            rsi_buy_th: 20.0,
            rsi_sell_th: 65.0,
            bucket_trend_pct: 0.60,
            bucket_rsi_pct: 0.40,
            weight_cap: 1.0,
            trail_k: 2.5,
            partial_take_ratio: 0.5,
            min_partial_pnl_pct: 0.01,
            daily_loss_cap_pct: 0.03,
            cooldown_min: 60,
            reentry_block_n: 10,
            rebalance_deadzone: 0.02,
            min_hold_bars: 2,
        }
    }
}

impl BucketParams {
    pub fn from_params(params: &StrategyParams) -> Self {
        let d = Self::default();
        Self {
            rsi_buy_th: params.f64_or("rsi_buy_th", d.rsi_buy_th),
            rsi_sell_th: params.f64_or("rsi_sell_th", d.rsi_sell_th),
            bucket_trend_pct: params.f64_or("bucket_trend_pct", d.bucket_trend_pct),
            bucket_rsi_pct: params.f64_or("bucket_rsi_pct", d.bucket_rsi_pct),
            weight_cap: params.f64_or("weight_cap", d.weight_cap),
            trail_k: params.f64_or("trail_k", d.trail_k),
            partial_take_ratio: params.f64_or("partial_take_ratio", d.partial_take_ratio),
            min_partial_pnl_pct: params.f64_or("min_partial_pnl_pct", d.min_partial_pnl_pct),
            daily_loss_cap_pct: params.f64_or("daily_loss_cap_pct", d.daily_loss_cap_pct),
            cooldown_min: params.usize_or("cooldown_min", d.cooldown_min as usize) as i64,
            reentry_block_n: params.usize_or("reentry_block_n", d.reentry_block_n),
            rebalance_deadzone: params.f64_or("rebalance_deadzone", d.rebalance_deadzone),
            min_hold_bars: params.usize_or("min_hold_bars", d.min_hold_bars),
        }
    }

    fn clamp_weight(&self, w: f64) -> f64 {
        w.clamp(0.0, self.weight_cap.max(0.0))
    }
}

/// Cross-bar memory of the allocation state machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketState {
    /// Cash snapshot taken when the account was last flat.
    pub start_cash: Option<f64>,
    pub in_position: bool,
    pub alloc_trend: bool,
    pub alloc_rsi: bool,
    pub allocated_notional: f64,
    pub partial_taken: bool,
    pub entry_price: Option<f64>,
    pub high_since_entry: Option<f64>,
    pub trail_price: Option<f64>,
    pub day: Option<NaiveDate>,
    pub day_start_equity: f64,
    pub cooldown_until: Option<DateTime<Utc>>,
    /// Last bar index (inclusive) on which re-entry is blocked.
    pub reentry_block_until: Option<usize>,
    pub loss_streak: u32,
    pub acted_at: Option<usize>,
    pub last_target_at: Option<usize>,
}

impl BucketState {
    fn reset_allocation(&mut self, cash: f64) {
        self.start_cash = Some(cash);
        self.alloc_trend = false;
        self.alloc_rsi = false;
        self.allocated_notional = 0.0;
        self.partial_taken = false;
        self.entry_price = None;
        self.high_since_entry = None;
        self.trail_price = None;
    }

    fn on_full_exit(&mut self, i: usize, now: DateTime<Utc>, p: &BucketParams, exit: ExitKind) {
        let loss = matches!(exit, ExitKind::Loss | ExitKind::DayStop);
        if loss {
            self.loss_streak += 1;
            if self.loss_streak >= 3 {
                let escalation = i64::from(self.loss_streak - 2);
                self.cooldown_until = Some(now + Duration::minutes(p.cooldown_min * escalation));
            }
        } else {
            self.loss_streak = 0;
        }
        if exit == ExitKind::DayStop {
            self.cooldown_until = Some(now + Duration::hours(24));
        }

        self.reentry_block_until = Some(i + p.reentry_block_n);
        self.entry_price = None;
        self.high_since_entry = None;
        self.trail_price = None;
        self.partial_taken = false;
        self.acted_at = Some(i);
        self.alloc_trend = false;
        self.alloc_rsi = false;
        self.allocated_notional = 0.0;
        self.in_position = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitKind {
    Win,
    Loss,
    DayStop,
}

impl ExitKind {
    fn from_loss(loss: bool) -> Self {
        if loss {
            ExitKind::Loss
        } else {
            ExitKind::Win
        }
    }
}

/// Feature values the state machine needs at the decision bar.
struct Inputs {
    price: f64,
    high: f64,
    rsi: f64,
    macd_line: f64,
    macd_hist: f64,
    prev_hist: f64,
    trend_aligned: bool,
    atr: f64,
}

impl Inputs {
    fn read(history: &History<'_>) -> Option<Self> {
        let bar = history.last();
        if ![bar.open, bar.high, bar.low, bar.close]
            .iter()
            .all(|v| v.is_finite())
        {
            return None;
        }
        let sma20 = finite_feature(history, "sma_20")?;
        let sma60 = finite_feature(history, "sma_60")?;
        let sma120 = finite_feature(history, "sma_120")?;
        finite_feature(history, "macd_signal")?;
        let macd_hist = finite_feature(history, "macd_hist")?;
        let prev_hist = history
            .feature_ago("macd_hist", 1)
            .filter(|v| v.is_finite())
            .unwrap_or(macd_hist);
        Some(Self {
            price: bar.close,
            high: bar.high,
            rsi: finite_feature(history, "rsi_14")?,
            macd_line: finite_feature(history, "macd_line")?,
            macd_hist,
            prev_hist,
            trend_aligned: sma20 > sma60 && sma60 > sma120,
            atr: finite_feature(history, "atr_14")?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BucketedAllocation;

impl Strategy for BucketedAllocation {
    type State = BucketState;

    fn name(&self) -> &str {
        "bucketed_allocation"
    }

    fn decide(
        &self,
        history: &History<'_>,
        ctx: &Context,
        state: &mut BucketState,
        params: &StrategyParams,
    ) -> Result<Decision, StrategyError> {
        let p = BucketParams::from_params(params);
        let Some(x) = Inputs::read(history) else {
            return Ok(Decision::hold());
        };

        let i = history.index();
        let now = ctx.now;
        let equity = ctx.equity;
        let qty = ctx.position_qty;
        let current_weight = if equity > 0.0 {
            qty * x.price / equity
        } else {
            0.0
        };

        // ── Flat: snapshot start cash ──
        if current_weight <= 0.0 && qty <= 0.0 {
            if !state.in_position {
                state.reset_allocation(ctx.cash);
            }
            state.in_position = false;
        } else {
            state.in_position = true;
        }
        let start_cash = state.start_cash.unwrap_or(ctx.cash);

        // ── Day boundary, cooldown, re-entry block ──
        let today = now.date_naive();
        if state.day != Some(today) {
            state.day = Some(today);
            state.day_start_equity = equity;
        }
        let day_start = state.day_start_equity;
        let day_pnl_pct = if day_start > 0.0 {
            (equity - day_start) / day_start
        } else {
            0.0
        };

        if state.cooldown_until.is_some_and(|until| now < until) {
            return Ok(Decision::hold());
        }
        if state.reentry_block_until.is_some_and(|until| i <= until) {
            return Ok(Decision::hold());
        }

        // ── Buckets: each locks its notional once per flat cycle ──
        if !state.alloc_trend && x.trend_aligned && x.macd_line > 0.0 {
            state.allocated_notional += p.bucket_trend_pct * start_cash;
            state.alloc_trend = true;
        }
        if !state.alloc_rsi && x.rsi <= p.rsi_buy_th {
            state.allocated_notional += p.bucket_rsi_pct * start_cash;
            state.alloc_rsi = true;
        }
        let bucket_weight = if equity > 0.0 {
            p.clamp_weight(state.allocated_notional / equity)
        } else {
            0.0
        };

        // ── Exits ──
        if qty > 0.0 {
            let high_since = state.high_since_entry.map_or(x.high, |h| h.max(x.high));
            state.high_since_entry = Some(high_since);
            let candidate = high_since - p.trail_k * x.atr;
            let trail = state.trail_price.map_or(candidate, |t| t.max(candidate));
            state.trail_price = Some(trail);

            if x.price < trail {
                let loss = state.entry_price.is_some_and(|e| x.price < e);
                state.on_full_exit(i, now, &p, ExitKind::from_loss(loss));
                return Ok(Decision::sell());
            }
        }

        if p.daily_loss_cap_pct > 0.0 && day_pnl_pct <= -p.daily_loss_cap_pct && qty > 0.0 {
            state.on_full_exit(i, now, &p, ExitKind::DayStop);
            return Ok(Decision::sell());
        }

        if qty > 0.0 && !state.partial_taken {
            let pos_pnl_pct = ctx
                .position_avg_price
                .filter(|a| *a > 0.0)
                .map_or(0.0, |a| (x.price - a) / a);
            if x.macd_hist < x.prev_hist && pos_pnl_pct >= p.min_partial_pnl_pct {
                state.allocated_notional *= 1.0 - p.partial_take_ratio;
                state.partial_taken = true;
                state.acted_at = Some(i);
                let reduced = if equity > 0.0 {
                    p.clamp_weight(state.allocated_notional / equity)
                } else {
                    0.0
                };
                return Ok(Decision::buy(reduced));
            }
        }

        if qty > 0.0 && x.rsi >= p.rsi_sell_th {
            let loss = ctx.position_avg_price.is_some_and(|a| x.price < a);
            state.on_full_exit(i, now, &p, ExitKind::from_loss(loss));
            return Ok(Decision::sell());
        }

        // ── Entry / resize ──
        if state.acted_at == Some(i) {
            return Ok(Decision::hold());
        }
        if (bucket_weight - current_weight).abs() < p.rebalance_deadzone {
            return Ok(Decision::hold());
        }
        if state
            .last_target_at
            .is_some_and(|last| i.saturating_sub(last) < p.min_hold_bars)
        {
            return Ok(Decision::hold());
        }

        if bucket_weight > current_weight && qty <= 0.0 {
            state.entry_price = Some(x.price);
            state.high_since_entry = Some(x.high);
            state.trail_price = None;
        }
        state.acted_at = Some(i);
        state.last_target_at = Some(i);
        // resizing in either direction is expressed as an absolute target
        Ok(Decision::buy(bucket_weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_util::{flat_ctx, flat_series, long_ctx};
    use crate::strategy::Signal;

    fn features(rsi: f64, aligned: bool, hist: f64) -> Vec<(&'static str, f64)> {
        let (s20, s60, s120) = if aligned {
            (103.0, 102.0, 101.0)
        } else {
            (101.0, 102.0, 103.0)
        };
        vec![
            ("sma_20", s20),
            ("sma_60", s60),
            ("sma_120", s120),
            ("macd_line", 0.5),
            ("macd_signal", 0.4),
            ("macd_hist", hist),
            ("atr_14", 1.0),
            ("rsi_14", rsi),
        ]
    }

    fn decide(
        series: &crate::domain::BarSeries,
        i: usize,
        ctx: &Context,
        state: &mut BucketState,
    ) -> Decision {
        BucketedAllocation
            .decide(&series.history(i), ctx, state, &StrategyParams::new())
            .unwrap()
    }

    #[test]
    fn holds_while_features_warm_up() {
        let mut f = features(50.0, true, 0.1);
        f[7].1 = f64::NAN;
        let series = flat_series(5, 100.0, &f);
        let mut state = BucketState::default();
        let ctx = flat_ctx(series.history(4).now(), 10_000.0, 100.0);
        assert!(decide(&series, 4, &ctx, &mut state).is_hold());
        assert_eq!(state, BucketState::default());
    }

    #[test]
    fn trend_bucket_allocates_sixty_percent_of_start_cash() {
        let series = flat_series(5, 100.0, &features(50.0, true, 0.1));
        let mut state = BucketState::default();
        let ctx = flat_ctx(series.history(4).now(), 10_000.0, 100.0);
        let d = decide(&series, 4, &ctx, &mut state);
        assert_eq!(d.signal, Signal::Buy);
        assert!((d.weight.unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(state.start_cash, Some(10_000.0));
        assert!(state.alloc_trend && !state.alloc_rsi);
        assert_eq!(state.entry_price, Some(100.0));
    }

    #[test]
    fn both_buckets_cap_at_full_weight() {
        let series = flat_series(5, 100.0, &features(15.0, true, 0.1));
        let mut state = BucketState::default();
        let ctx = flat_ctx(series.history(4).now(), 10_000.0, 100.0);
        let d = decide(&series, 4, &ctx, &mut state);
        assert!((d.weight.unwrap() - 1.0).abs() < 1e-12);
        assert!((state.allocated_notional - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn min_hold_bars_spaces_target_changes() {
        let series = flat_series(6, 100.0, &features(50.0, true, 0.1));
        let mut state = BucketState::default();
        let now = series.history(3).now();
        decide(&series, 3, &flat_ctx(now, 10_000.0, 100.0), &mut state);
        // next bar, still flat (e.g. the fill was too small): blocked by min_hold_bars
        let now = series.history(4).now();
        assert!(decide(&series, 4, &flat_ctx(now, 10_000.0, 100.0), &mut state).is_hold());
        let now = series.history(5).now();
        assert_eq!(
            decide(&series, 5, &flat_ctx(now, 10_000.0, 100.0), &mut state).signal,
            Signal::Buy
        );
    }

    #[test]
    fn trailing_stop_exits_and_blocks_reentry() {
        let series = flat_series(20, 100.0, &features(50.0, true, 0.1));
        let mut state = BucketState {
            in_position: true,
            start_cash: Some(10_000.0),
            alloc_trend: true,
            allocated_notional: 6_000.0,
            entry_price: Some(110.0),
            high_since_entry: Some(110.0),
            ..BucketState::default()
        };
        // trail = 110 - 2.5 * 1 = 107.5 > close 100
        let ctx = long_ctx(series.history(5).now(), 4_000.0, 60.0, 110.0, 100.0);
        let d = decide(&series, 5, &ctx, &mut state);
        assert_eq!(d, Decision::sell());
        assert_eq!(state.reentry_block_until, Some(15));
        assert_eq!(state.loss_streak, 1);
        assert_eq!(state.allocated_notional, 0.0);

        // flat again but inside the block window
        let ctx = flat_ctx(series.history(6).now(), 10_000.0, 100.0);
        assert!(decide(&series, 6, &ctx, &mut state).is_hold());
        let ctx = flat_ctx(series.history(16).now(), 10_000.0, 100.0);
        assert_eq!(decide(&series, 16, &ctx, &mut state).signal, Signal::Buy);
    }

    #[test]
    fn trail_never_moves_down() {
        let series = flat_series(5, 100.0, &features(50.0, true, 0.1));
        let mut state = BucketState {
            in_position: true,
            high_since_entry: Some(99.0),
            trail_price: Some(99.5),
            entry_price: Some(99.0),
            ..BucketState::default()
        };
        // candidate = max(99, 101) - 2.5 = 98.5 < 99.5 kept; close 100 stays above
        let ctx = long_ctx(series.history(4).now(), 0.0, 10.0, 99.0, 100.0);
        decide(&series, 4, &ctx, &mut state);
        assert_eq!(state.trail_price, Some(99.5));
        assert_eq!(state.high_since_entry, Some(101.0));
    }

    #[test]
    fn third_consecutive_loss_starts_cooldown() {
        let p = BucketParams::default();
        let mut state = BucketState::default();
        let now = series_time();
        state.on_full_exit(1, now, &p, ExitKind::Loss);
        state.on_full_exit(2, now, &p, ExitKind::Loss);
        assert_eq!(state.cooldown_until, None);
        state.on_full_exit(3, now, &p, ExitKind::Loss);
        assert_eq!(state.cooldown_until, Some(now + Duration::minutes(60)));
        state.on_full_exit(4, now, &p, ExitKind::Loss);
        assert_eq!(state.cooldown_until, Some(now + Duration::minutes(120)));
        state.on_full_exit(5, now, &p, ExitKind::Win);
        assert_eq!(state.loss_streak, 0);
    }

    #[test]
    fn daily_loss_cap_forces_exit_and_day_cooldown() {
        let series = flat_series(5, 100.0, &features(50.0, true, 0.1));
        let mut state = BucketState {
            in_position: true,
            day: Some(series.history(4).now().date_naive()),
            day_start_equity: 11_000.0,
            entry_price: Some(95.0),
            high_since_entry: Some(95.0),
            partial_taken: true,
            ..BucketState::default()
        };
        // equity 10_000 vs 11_000 at day start: -9%
        let now = series.history(4).now();
        let ctx = long_ctx(now, 5_000.0, 50.0, 95.0, 100.0);
        assert_eq!(decide(&series, 4, &ctx, &mut state), Decision::sell());
        assert_eq!(state.cooldown_until, Some(now + Duration::hours(24)));
    }

    #[test]
    fn daily_loss_cap_can_be_disabled() {
        let series = flat_series(5, 100.0, &features(50.0, true, 0.1));
        let mut state = BucketState {
            in_position: true,
            day: Some(series.history(4).now().date_naive()),
            day_start_equity: 11_000.0,
            entry_price: Some(95.0),
            high_since_entry: Some(95.0),
            partial_taken: true,
            ..BucketState::default()
        };
        let params = StrategyParams::new().with("daily_loss_cap_pct", 0.0);
        let ctx = long_ctx(series.history(4).now(), 5_000.0, 50.0, 95.0, 100.0);
        let d = BucketedAllocation
            .decide(&series.history(4), &ctx, &mut state, &params)
            .unwrap();
        assert_ne!(d, Decision::sell());
    }

    #[test]
    fn partial_take_halves_allocation_once() {
        // histogram falling: 0.3 then 0.1
        let mut series = flat_series(5, 100.0, &features(50.0, true, 0.0));
        series
            .insert_feature("macd_hist", vec![0.3, 0.3, 0.3, 0.3, 0.1])
            .unwrap();
        let mut state = BucketState {
            in_position: true,
            start_cash: Some(10_000.0),
            alloc_trend: true,
            allocated_notional: 6_000.0,
            entry_price: Some(95.0),
            high_since_entry: Some(95.0),
            ..BucketState::default()
        };
        // avg 95 -> +5.3%; equity 4000 + 60*100 = 10_000
        let ctx = long_ctx(series.history(4).now(), 4_000.0, 60.0, 95.0, 100.0);
        let d = decide(&series, 4, &ctx, &mut state);
        assert_eq!(d.signal, Signal::Buy);
        assert!((d.weight.unwrap() - 0.3).abs() < 1e-12);
        assert!(state.partial_taken);
        assert_eq!(state.acted_at, Some(4));
    }

    #[test]
    fn overbought_rsi_exits() {
        let series = flat_series(5, 100.0, &features(70.0, true, 0.1));
        let mut state = BucketState {
            in_position: true,
            entry_price: Some(95.0),
            high_since_entry: Some(95.0),
            partial_taken: true,
            ..BucketState::default()
        };
        let ctx = long_ctx(series.history(4).now(), 4_000.0, 60.0, 95.0, 100.0);
        assert_eq!(decide(&series, 4, &ctx, &mut state), Decision::sell());
        assert_eq!(state.loss_streak, 0);
    }

    #[test]
    fn deadzone_suppresses_small_rebalances() {
        let series = flat_series(5, 100.0, &features(50.0, true, 0.1));
        let mut state = BucketState {
            in_position: true,
            start_cash: Some(10_000.0),
            alloc_trend: true,
            allocated_notional: 6_000.0,
            entry_price: Some(100.0),
            high_since_entry: Some(100.0),
            partial_taken: true,
            ..BucketState::default()
        };
        // weight 59/100 = 0.59 vs target 0.60
        let ctx = long_ctx(series.history(4).now(), 4_100.0, 59.0, 100.0, 100.0);
        assert!(decide(&series, 4, &ctx, &mut state).is_hold());
    }

    fn series_time() -> DateTime<Utc> {
        crate::data::default_start()
    }
}
