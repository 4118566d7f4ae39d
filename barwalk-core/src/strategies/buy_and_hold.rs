use crate::domain::History;
use crate::error::StrategyError;
use crate::strategy::{Context, Decision, Strategy, StrategyParams};

/// Buy on the first decision bar, then hold until the end.
///
/// `weight` (default 1.0) sets the initial allocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHold;

impl Strategy for BuyAndHold {
    /// Whether the entry has been issued.
    type State = bool;

    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn decide(
        &self,
        _history: &History<'_>,
        _ctx: &Context,
        entered: &mut bool,
        params: &StrategyParams,
    ) -> Result<Decision, StrategyError> {
        if *entered {
            return Ok(Decision::hold());
        }
        *entered = true;
        Ok(Decision::buy(params.f64_or("weight", 1.0)))
    }
}
