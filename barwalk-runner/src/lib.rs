//! Barwalk Runner: run orchestration around the simulation core.
//!
//! This crate builds on `barwalk-core` to provide:
//! - Run configuration from TOML with a content-hash run id
//! - Bar loading from CSV or the seeded synthetic generator
//! - Single-run orchestration with the one-line summary
//! - Artifact sink (equity/orders CSV, summary JSON, params TOML, JSONL index)
//! - Ranking of the run index into `summary.csv`
//! - Parallel batch runs over a parameter grid

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod runner;
pub mod sink;
pub mod summarize;

pub use batch::{run_batch, BatchItem, ParamGrid};
pub use config::{DataSource, RunConfig, RunConfigError, RunId};
pub use data_loader::{load_series, parse_timestamp, LoadError};
pub use runner::{prepare_series, run_from_config, run_on_series, RunError, RunOutcome};
pub use sink::{ArtifactSink, FsSink, NullSink, SummaryRecord};
pub use summarize::{summarize, SortKey, SummarizeReport, UnknownSortKey, DEFAULT_TOP};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn run_config_is_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
    }

    #[test]
    fn run_outcome_is_send_sync() {
        assert_send::<RunOutcome>();
        assert_sync::<RunOutcome>();
    }

    #[test]
    fn run_error_is_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }

    #[test]
    fn sinks_are_send_sync() {
        assert_send::<FsSink>();
        assert_sync::<FsSink>();
        assert_send::<NullSink>();
        assert_sync::<NullSink>();
    }

    #[test]
    fn summary_record_is_send_sync() {
        assert_send::<SummaryRecord>();
        assert_sync::<SummaryRecord>();
    }

    #[test]
    fn param_grid_is_send_sync() {
        assert_send::<ParamGrid>();
        assert_sync::<ParamGrid>();
    }
}
