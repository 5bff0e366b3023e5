//! Stats module - descriptive statistics per region

mod calculator;

pub use calculator::{MetricStats, RegionStats, StatsCalculator};
