//! Metrics input port traits.

use crate::domain::error::PulseError;
use crate::domain::price::PricePoint;
use crate::domain::raw_metrics::RawMetrics;

/// Supplies the flat reading snapshot for one evaluation cycle.
pub trait MetricsPort {
    fn load_snapshot(&self) -> Result<RawMetrics, PulseError>;
}

/// Supplies dated close series for technical derivation.
pub trait PriceSeriesPort {
    fn load_closes(&self) -> Result<Vec<PricePoint>, PulseError>;
}
