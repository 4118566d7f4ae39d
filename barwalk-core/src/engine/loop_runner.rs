//! The walk-forward bar loop.

use tracing::{debug, trace};

use super::config::EngineConfig;
use super::portfolio::{Execution, Portfolio};
use super::result::{RunResult, RunSummary};
use crate::domain::equity::equity_values;
use crate::domain::{Bar, BarSeries, EquityPoint, FillRecord, QTY_EPSILON};
use crate::error::{DataError, EngineError};
use crate::metrics::Metrics;
use crate::strategy::{Context, Strategy, StrategyParams};

/// Relative share of the held quantity below which a rebalance is skipped.
const REL_QTY_TOLERANCE: f64 = 1e-9;

/// Run one simulation.
///
/// The strategy sees bars `0..=i` when deciding at bar `i`; its order fills
/// at the open of bar `i + 1`. One fresh `S::State` lives for the whole run.
///
/// # Errors
/// - [`EngineError::Config`] if the config is invalid
/// - [`EngineError::Data`] if the series has no bars
/// - [`EngineError::Strategy`] if the strategy fails; the run stops there
/// - [`EngineError::Invariant`] if the accountant's bookkeeping breaks
pub fn run<S: Strategy>(
    bars: &BarSeries,
    strategy: &S,
    params: &StrategyParams,
    config: &EngineConfig,
) -> Result<RunResult, EngineError> {
    config.validate()?;
    let rows = bars.bars();
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        return Err(DataError::Empty.into());
    };

    let mut state = S::State::default();
    let mut book = Portfolio::new(config.initial_cash);
    let mut equity_series = Vec::with_capacity(rows.len());
    let mut orders: Vec<FillRecord> = Vec::new();

    equity_series.push(EquityPoint::new(first.timestamp, book.equity(first.close)));

    for (i, pair) in rows.windows(2).enumerate() {
        let (bar, next) = (&pair[0], &pair[1]);

        // ─── Decide at close[i] ───
        let history = bars.history(i);
        let ctx = context_at(bar, &book);
        let decision = strategy
            .decide(&history, &ctx, &mut state, params)
            .map_err(|source| EngineError::Strategy {
                at: bar.timestamp,
                source,
            })?;

        // ─── Fill at open[i + 1] ───
        let price = next.open;
        let equity_pre = book.equity(price);
        let weight_pre = book.weight(price);
        let target_weight = decision.target_weight(weight_pre, config.weight_cap);
        let held = book.position().quantity();
        // A bare hold, or a target equal to the current weight, never trades.
        let delta = if decision.is_hold() || target_weight == weight_pre {
            0.0
        } else if equity_pre > 0.0 {
            target_weight * equity_pre / price - held
        } else {
            -held
        };
        trace!(at = %bar.timestamp, signal = %decision.signal, target_weight, delta, "decision");

        if delta.abs() > qty_tolerance(held) {
            let execution = if delta > 0.0 {
                book.buy(next.timestamp, delta, price, &config.cost)?
            } else {
                book.sell(next.timestamp, -delta, price, &config.cost)?
            };
            if let Some(exec) = execution {
                orders.push(record(next, &exec, &book, price, weight_pre, target_weight));
            }
        }

        // ─── Mark at close[i + 1] ───
        equity_series.push(EquityPoint::new(next.timestamp, book.equity(next.close)));
    }

    if config.liquidate_on_end && !book.position().is_flat() {
        let weight_pre = book.weight(last.close);
        let qty = book.position().quantity();
        if let Some(exec) = book.sell(last.timestamp, qty, last.close, &config.cost)? {
            orders.push(record(last, &exec, &book, last.close, weight_pre, 0.0));
        }
        if let Some(point) = equity_series.last_mut() {
            point.equity = book.equity(last.close);
        }
    }

    let metrics = Metrics::compute(
        &equity_values(&equity_series),
        config.resolution.periods_per_year(),
    );
    let final_equity = equity_series
        .last()
        .map_or(config.initial_cash, |p| p.equity);

    let summary = RunSummary {
        symbol: bars.symbol().to_string(),
        strategy: strategy.name().to_string(),
        resolution: config.resolution,
        pnl: metrics.pnl,
        sharpe: metrics.sharpe,
        mdd: metrics.mdd,
        fill_count: book.fill_count(),
        round_trip_count: book.round_trip_count(),
        fee_bps: config.cost.fee_bps,
        slippage_bps: config.cost.slippage_bps,
        start: first.timestamp,
        end: last.timestamp,
        initial_cash: config.initial_cash,
        final_equity,
        bar_count: rows.len(),
        fees_paid: book.fees_paid(),
        params: params.clone(),
    };

    Ok(RunResult {
        equity_series,
        orders,
        summary,
    })
}

/// Quantity changes at or below this are rounding noise from re-deriving the
/// target quantity out of equity and weight.
fn qty_tolerance(held: f64) -> f64 {
    QTY_EPSILON.max(held.abs() * REL_QTY_TOLERANCE)
}

fn context_at(bar: &Bar, book: &Portfolio) -> Context {
    Context {
        now: bar.timestamp,
        position_qty: book.position().quantity(),
        position_avg_price: book.position().avg_entry_price(),
        cash: book.cash(),
        equity: book.equity(bar.close),
        last_price: bar.close,
        last_fill_ts: book.last_fill_ts(),
        last_fill_price: book.last_fill_price(),
    }
}

/// Build the ledger entry for a fill, with equity and weight marked at `mark`.
fn record(
    bar: &Bar,
    exec: &Execution,
    book: &Portfolio,
    mark: f64,
    weight_pre: f64,
    target_weight: f64,
) -> FillRecord {
    let fill = FillRecord {
        timestamp: bar.timestamp,
        side: exec.side,
        quantity: exec.quantity,
        price: exec.price,
        notional: exec.notional,
        fee: exec.fee,
        cash: book.cash(),
        equity: book.equity(mark),
        weight_pre,
        weight_post: book.weight(mark),
        target_weight,
    };
    debug!(
        at = %fill.timestamp,
        side = %fill.side,
        qty = fill.quantity,
        px = fill.price,
        notional = fill.notional,
        cash = fill.cash,
        equity = fill.equity,
        weight = fill.weight_post,
        "fill"
    );
    fill
}
