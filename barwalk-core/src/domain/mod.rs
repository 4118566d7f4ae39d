//! Domain types for the walk-forward simulator.

pub mod bar;
pub mod equity;
pub mod features;
pub mod fill;
pub mod position;

pub use bar::{Bar, BarSeries, History};
pub use equity::EquityPoint;
pub use features::FeatureSet;
pub use fill::{FillRecord, Side};
pub use position::Position;

/// Quantities at or below this magnitude are treated as zero.
pub const QTY_EPSILON: f64 = 1e-12;
