//! Data Processor Module
//! Row-wise derived series: deflated expense, expense per employee and
//! year-over-year real growth.

use crate::data::merge::RegionYearRecord;
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Base year {0} is not present in the CPI table")]
    MissingBaseYear(i32),
    #[error("CPI at base year {year} must be positive, got {value}")]
    InvalidBaseCpi { year: i32, value: f64 },
}

/// Merged record plus derived metrics; missing values are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub record: RegionYearRecord,
    pub real_expense: Option<f64>,
    pub expense_per_employee: Option<f64>,
    pub real_growth: Option<f64>,
}

/// Deflator: base-year CPI over current-year CPI.
pub fn deflator(base_cpi: f64, current_cpi: f64) -> Option<f64> {
    if current_cpi > 0.0 && current_cpi.is_finite() && base_cpi.is_finite() {
        Some(base_cpi / current_cpi)
    } else {
        None
    }
}

pub fn real_value(nominal: f64, base_cpi: f64, current_cpi: Option<f64>) -> Option<f64> {
    current_cpi
        .and_then(|cpi| deflator(base_cpi, cpi))
        .map(|d| nominal * d)
        .filter(|v| v.is_finite())
}

/// Undefined for zero or missing headcount.
pub fn per_employee(value: Option<f64>, employees: Option<f64>) -> Option<f64> {
    match (value, employees) {
        (Some(v), Some(n)) if n != 0.0 && n.is_finite() => Some(v / n).filter(|r| r.is_finite()),
        _ => None,
    }
}

pub fn growth_rate(previous: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (previous, current) {
        (Some(p), Some(c)) if p != 0.0 => Some((c - p) / p),
        _ => None,
    }
}

/// Computes derived series from merged records.
pub struct DataProcessor;

impl DataProcessor {
    /// Base-year CPI from the annual CPI table.
    pub fn base_cpi(cpi_by_year: &HashMap<i32, f64>, base_year: i32) -> Result<f64, ProcessorError> {
        let value = *cpi_by_year
            .get(&base_year)
            .ok_or(ProcessorError::MissingBaseYear(base_year))?;
        if value <= 0.0 || !value.is_finite() {
            return Err(ProcessorError::InvalidBaseCpi {
                year: base_year,
                value,
            });
        }
        Ok(value)
    }

    /// Derive all metrics. Input need not be sorted.
    pub fn derive(records: &[RegionYearRecord], base_cpi: f64) -> Vec<DerivedRecord> {
        let mut derived: Vec<DerivedRecord> = records
            .iter()
            .map(|record| {
                let real_expense = real_value(record.nominal_expense, base_cpi, record.cpi);
                DerivedRecord {
                    record: record.clone(),
                    real_expense,
                    expense_per_employee: per_employee(real_expense, record.employees),
                    real_growth: None,
                }
            })
            .collect();

        derived.sort_by(|a, b| {
            a.record
                .region
                .cmp(&b.record.region)
                .then(a.record.year.cmp(&b.record.year))
        });

        let real_by_key: HashMap<(String, i32), Option<f64>> = derived
            .iter()
            .map(|d| ((d.record.region.clone(), d.record.year), d.real_expense))
            .collect();

        for d in &mut derived {
            let previous = real_by_key
                .get(&(d.record.region.clone(), d.record.year - 1))
                .copied()
                .flatten();
            d.real_growth = growth_rate(previous, d.real_expense);
        }

        let missing = derived
            .iter()
            .filter(|d| d.expense_per_employee.is_none())
            .count();
        info!(
            rows = derived.len(),
            missing_per_employee = missing,
            "derived regional metrics"
        );
        derived
    }

    /// Unique regions in sorted order.
    pub fn regions(derived: &[DerivedRecord]) -> Vec<String> {
        let mut regions: Vec<String> = derived.iter().map(|d| d.record.region.clone()).collect();
        regions.sort();
        regions.dedup();
        regions
    }

    /// (year, value) points of one series for one region.
    pub fn series_for_region<F>(derived: &[DerivedRecord], region: &str, value: F) -> Vec<[f64; 2]>
    where
        F: Fn(&DerivedRecord) -> Option<f64>,
    {
        derived
            .iter()
            .filter(|d| d.record.region == region)
            .filter_map(|d| value(d).map(|v| [d.record.year as f64, v]))
            .collect()
    }

    /// Non-missing expense-per-employee values grouped by region.
    pub fn per_employee_by_region(derived: &[DerivedRecord]) -> HashMap<String, Vec<f64>> {
        let mut grouped: HashMap<String, Vec<f64>> = HashMap::new();
        for d in derived {
            if let Some(v) = d.expense_per_employee {
                grouped.entry(d.record.region.clone()).or_default().push(v);
            }
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(region: &str, year: i32, nominal: f64, cpi: f64, employees: f64) -> RegionYearRecord {
        RegionYearRecord {
            region: region.to_string(),
            year,
            nominal_expense: nominal,
            cpi: Some(cpi),
            employees: Some(employees),
        }
    }

    #[test]
    fn deflates_to_base_year_prices() {
        let real = real_value(1100.0, 100.0, Some(110.0)).unwrap();
        assert!((real - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn real_equals_nominal_at_base_prices() {
        for nominal in [0.0, 1.0, 1234.5, 9.9e9] {
            assert_eq!(real_value(nominal, 104.2, Some(104.2)), Some(nominal));
        }
    }

    #[test]
    fn zero_employees_is_missing_not_infinite() {
        assert_eq!(per_employee(Some(1000.0), Some(0.0)), None);
        assert_eq!(per_employee(Some(1000.0), None), None);
        assert_eq!(per_employee(None, Some(10.0)), None);
        assert_eq!(per_employee(Some(1000.0), Some(8.0)), Some(125.0));
    }

    #[test]
    fn missing_or_nonpositive_cpi_gives_missing_real_value() {
        assert_eq!(real_value(100.0, 100.0, None), None);
        assert_eq!(real_value(100.0, 100.0, Some(0.0)), None);
        assert_eq!(real_value(100.0, 100.0, Some(-5.0)), None);
    }

    #[test]
    fn base_cpi_must_exist() {
        let mut cpi = HashMap::new();
        cpi.insert(2015, 100.0);
        assert_eq!(DataProcessor::base_cpi(&cpi, 2015).unwrap(), 100.0);
        assert!(matches!(
            DataProcessor::base_cpi(&cpi, 2010),
            Err(ProcessorError::MissingBaseYear(2010))
        ));
    }

    #[test]
    fn derive_computes_growth_within_region_only() {
        let records = vec![
            record("South", 2016, 1100.0, 110.0, 10.0),
            record("North", 2015, 1000.0, 100.0, 10.0),
            record("North", 2016, 1320.0, 110.0, 0.0),
            record("North", 2018, 1000.0, 100.0, 5.0),
        ];

        let derived = DataProcessor::derive(&records, 100.0);
        assert_eq!(derived.len(), 4);

        let north_2016 = &derived[1];
        assert_eq!(north_2016.record.year, 2016);
        assert!((north_2016.real_expense.unwrap() - 1200.0).abs() < 1e-9);
        assert_eq!(north_2016.expense_per_employee, None);
        let growth = north_2016.real_growth.unwrap();
        assert!((growth - 0.2).abs() < 1e-12);

        // 2017 is absent, so 2018 has no growth.
        assert_eq!(derived[2].record.year, 2018);
        assert_eq!(derived[2].real_growth, None);
        assert_eq!(derived[2].expense_per_employee, Some(200.0));

        // First year of a region has no predecessor.
        assert_eq!(derived[3].record.region, "South");
        assert_eq!(derived[3].real_growth, None);
    }

    #[test]
    fn series_and_grouping_skip_missing_values() {
        let records = vec![
            record("North", 2015, 1000.0, 100.0, 10.0),
            record("North", 2016, 1100.0, 110.0, 0.0),
        ];
        let derived = DataProcessor::derive(&records, 100.0);

        let series = DataProcessor::series_for_region(&derived, "North", |d| d.expense_per_employee);
        assert_eq!(series, vec![[2015.0, 100.0]]);

        let grouped = DataProcessor::per_employee_by_region(&derived);
        assert_eq!(grouped["North"], vec![100.0]);
        assert_eq!(DataProcessor::regions(&derived), vec!["North".to_string()]);
    }
}
