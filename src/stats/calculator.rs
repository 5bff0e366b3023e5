//! Statistics Calculator Module
//! Descriptive statistics of one metric by region.

use rayon::prelude::*;
use std::collections::HashMap;

/// Summary of one region's observations.
#[derive(Debug, Clone)]
pub struct RegionStats {
    pub region: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p05: f64,
}

impl RegionStats {
    fn empty(region: &str) -> Self {
        Self {
            region: region.to_string(),
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            variance: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            p95: f64::NAN,
            p05: f64::NAN,
        }
    }
}

/// Statistics for one metric across all regions.
#[derive(Debug, Clone)]
pub struct MetricStats {
    pub metric: String,
    pub region_stats: HashMap<String, RegionStats>,
}

impl MetricStats {
    /// Regions in alphabetical order.
    pub fn ordered_regions(&self) -> Vec<String> {
        let mut regions: Vec<String> = self.region_stats.keys().cloned().collect();
        regions.sort();
        regions
    }
}

pub struct StatsCalculator;

impl StatsCalculator {
    pub fn compute_descriptive_stats(region: &str, values: &[f64]) -> RegionStats {
        let n = values.len();
        if n == 0 {
            return RegionStats::empty(region);
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = sorted.iter().sum::<f64>() / n as f64;
        let mid = n / 2;
        let median = if n % 2 == 0 {
            0.5 * (sorted[mid - 1] + sorted[mid])
        } else {
            sorted[mid]
        };
        // Sample variance; a single observation has none.
        let variance = match n {
            1 => 0.0,
            _ => sorted.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1) as f64,
        };

        RegionStats {
            region: region.to_string(),
            count: n,
            mean,
            median,
            std: variance.sqrt(),
            variance,
            min: sorted[0],
            max: sorted[n - 1],
            p95: Self::percentile(&sorted, 0.95),
            p05: Self::percentile(&sorted, 0.05),
        }
    }

    /// Linearly interpolated quantile `q` in [0, 1] of non-empty sorted data.
    fn percentile(sorted: &[f64], q: f64) -> f64 {
        let position = q * (sorted.len() - 1) as f64;
        let below = position.floor() as usize;
        let above = position.ceil() as usize;
        let weight = position - below as f64;
        sorted[below] + weight * (sorted[above] - sorted[below])
    }

    /// Statistics for every region of one metric, computed in parallel.
    pub fn compute_metric_stats(
        metric: &str,
        values_by_region: &HashMap<String, Vec<f64>>,
    ) -> MetricStats {
        let region_stats = values_by_region
            .par_iter()
            .map(|(region, values)| {
                (
                    region.clone(),
                    Self::compute_descriptive_stats(region, values),
                )
            })
            .collect();

        MetricStats {
            metric: metric.to_string(),
            region_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptive_stats_match_hand_computation() {
        let stats = StatsCalculator::compute_descriptive_stats("North", &[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stats.region, "North");
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert_eq!((stats.min, stats.max), (1.0, 4.0));
        assert!((stats.variance - 5.0 / 3.0).abs() < 1e-12);
        assert!((stats.p95 - 3.85).abs() < 1e-12);
        assert!((stats.p05 - 1.15).abs() < 1e-12);
    }

    #[test]
    fn empty_input_is_nan_not_panic() {
        let stats = StatsCalculator::compute_descriptive_stats("North", &[]);
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn single_observation_has_finite_summary() {
        let stats = StatsCalculator::compute_descriptive_stats("Bornholm", &[7.5]);
        for v in [stats.mean, stats.median, stats.std, stats.variance, stats.p05, stats.p95] {
            assert!(v.is_finite());
        }
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.p95, 7.5);
    }

    #[test]
    fn every_region_is_summarized_in_order() {
        let mut values = HashMap::new();
        values.insert("South".to_string(), vec![10.0, 11.0, 12.0]);
        values.insert("North".to_string(), vec![1.0]);
        values.insert("Capital".to_string(), vec![1.5, 2.5, 3.5]);

        let stats = StatsCalculator::compute_metric_stats("per_employee", &values);
        assert_eq!(stats.ordered_regions(), vec!["Capital", "North", "South"]);
        assert_eq!(stats.region_stats["South"].mean, 11.0);
        assert_eq!(stats.region_stats["North"].count, 1);
    }
}
