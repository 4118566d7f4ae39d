//! Decision protocol: the contract between the engine and a strategy.
//!
//! A strategy is called once per decision bar, in timestamp order, with:
//! - a [`History`] view that ends at the decision bar (nothing later is reachable)
//! - a [`Context`] snapshot of the account marked at that bar's close
//! - exclusive mutable access to its own run-scoped state
//! - the run's [`StrategyParams`]
//!
//! The state type is chosen by the strategy. The engine creates one value per
//! run with `Default`, threads the same `&mut` through every call and never
//! looks inside it.

pub mod context;
pub mod decision;
pub mod params;
pub mod registry;

pub use context::Context;
pub use decision::{Decision, Signal, UnknownSignal};
pub use params::StrategyParams;
pub use registry::StrategyKind;

use std::marker::PhantomData;

use crate::domain::History;
use crate::error::StrategyError;

/// A pluggable decision function.
pub trait Strategy: Send + Sync {
    /// Cross-bar memory owned by the strategy for one run.
    type State: Default;

    fn name(&self) -> &str;

    fn decide(
        &self,
        history: &History<'_>,
        ctx: &Context,
        state: &mut Self::State,
        params: &StrategyParams,
    ) -> Result<Decision, StrategyError>;
}

/// Adapts a closure into a [`Strategy`].
///
/// The closure may return anything convertible into a [`Decision`], including
/// a raw `serde_json::Value`, which is normalized (malformed shapes become
/// hold).
pub struct FnStrategy<F, S = (), R = Decision> {
    name: String,
    func: F,
    _marker: PhantomData<fn() -> (S, R)>,
}

impl<F, S, R> FnStrategy<F, S, R>
where
    F: Fn(&History<'_>, &Context, &mut S, &StrategyParams) -> Result<R, StrategyError>
        + Send
        + Sync,
    S: Default,
    R: Into<Decision>,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _marker: PhantomData,
        }
    }
}

impl<F, S, R> Strategy for FnStrategy<F, S, R>
where
    F: Fn(&History<'_>, &Context, &mut S, &StrategyParams) -> Result<R, StrategyError>
        + Send
        + Sync,
    S: Default,
    R: Into<Decision>,
{
    type State = S;

    fn name(&self) -> &str {
        &self.name
    }

    fn decide(
        &self,
        history: &History<'_>,
        ctx: &Context,
        state: &mut S,
        params: &StrategyParams,
    ) -> Result<Decision, StrategyError> {
        (self.func)(history, ctx, state, params).map(Into::into)
    }
}

/// Read a feature at the decision bar, treating missing columns and warmup
/// values alike.
pub(crate) fn finite_feature(history: &History<'_>, name: &str) -> Option<f64> {
    history.feature(name).filter(|v| v.is_finite())
}
