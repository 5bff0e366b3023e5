//! Merge Module
//! Joins accounts, CPI and employment into one record per (region, year).

use crate::data::loader::{CPI, EMPLOYEES, NOMINAL_EXPENSE, REGION, YEAR};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error(
        "Merged table is empty: accounts cover {accounts}, CPI covers {cpi}, employment covers {employment}"
    )]
    EmptyMerge {
        accounts: String,
        cpi: String,
        employment: String,
    },
    #[error("Duplicate key after merge: {region} {year}")]
    DuplicateKey { region: String, year: i32 },
}

/// How keys missing from CPI or employment are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Keep only keys present in every source.
    #[default]
    Inner,
    /// Keep every accounts row; absent CPI/employment stays missing.
    Left,
}

impl JoinPolicy {
    fn join_type(self) -> JoinType {
        match self {
            JoinPolicy::Inner => JoinType::Inner,
            JoinPolicy::Left => JoinType::Left,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            JoinPolicy::Inner => "inner",
            JoinPolicy::Left => "left",
        }
    }
}

/// One merged (region, year) observation.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionYearRecord {
    pub region: String,
    pub year: i32,
    pub nominal_expense: f64,
    pub cpi: Option<f64>,
    pub employees: Option<f64>,
}

/// Joins the normalized source frames.
pub struct DataMerger;

impl DataMerger {
    /// Join the three canonical frames and return the records sorted by
    /// (region, year).
    pub fn merge(
        accounts: &DataFrame,
        cpi: &DataFrame,
        employment: &DataFrame,
        policy: JoinPolicy,
    ) -> Result<Vec<RegionYearRecord>, MergeError> {
        let joined = accounts
            .clone()
            .lazy()
            .join(
                cpi.clone().lazy(),
                [col(YEAR)],
                [col(YEAR)],
                JoinArgs::new(policy.join_type()),
            )
            .join(
                employment.clone().lazy(),
                [col(REGION), col(YEAR)],
                [col(REGION), col(YEAR)],
                JoinArgs::new(policy.join_type()),
            )
            .sort([REGION, YEAR], SortMultipleOptions::default())
            .collect()?;

        let records = Self::extract_records(&joined)?;

        if records.is_empty() {
            return Err(MergeError::EmptyMerge {
                accounts: year_span(accounts),
                cpi: year_span(cpi),
                employment: year_span(employment),
            });
        }

        Self::check_unique(&records)?;

        info!(
            policy = policy.label(),
            rows = records.len(),
            "merged regional accounts, cpi and employment"
        );
        Ok(records)
    }

    /// Every (region, year) must appear once.
    pub fn check_unique(records: &[RegionYearRecord]) -> Result<(), MergeError> {
        let mut seen: HashSet<(&str, i32)> = HashSet::with_capacity(records.len());
        for record in records {
            if !seen.insert((record.region.as_str(), record.year)) {
                return Err(MergeError::DuplicateKey {
                    region: record.region.clone(),
                    year: record.year,
                });
            }
        }
        Ok(())
    }

    fn extract_records(df: &DataFrame) -> Result<Vec<RegionYearRecord>, MergeError> {
        let regions = df.column(REGION)?.str()?;
        let years = df.column(YEAR)?.cast(&DataType::Int32)?;
        let years = years.i32()?;
        let expenses = df.column(NOMINAL_EXPENSE)?.f64()?;
        let cpis = df.column(CPI)?.f64()?;
        let employees = df.column(EMPLOYEES)?.f64()?;

        let records = (0..df.height())
            .filter_map(|i| {
                Some(RegionYearRecord {
                    region: regions.get(i)?.to_string(),
                    year: years.get(i)?,
                    nominal_expense: expenses.get(i)?,
                    cpi: cpis.get(i),
                    employees: employees.get(i),
                })
            })
            .collect();

        Ok(records)
    }
}

fn year_span(df: &DataFrame) -> String {
    let years = df
        .column(YEAR)
        .ok()
        .and_then(|c| c.cast(&DataType::Int32).ok())
        .and_then(|c| c.i32().ok().map(|ca| (ca.min(), ca.max())));
    match years {
        Some((Some(min), Some(max))) => format!("{min}-{max}"),
        _ => "no years".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> DataFrame {
        DataFrame::new(vec![
            Column::new(REGION.into(), ["North", "North", "South", "South"]),
            Column::new(YEAR.into(), [2015i32, 2016, 2015, 2016]),
            Column::new(NOMINAL_EXPENSE.into(), [1000.0, 1100.0, 500.0, 520.0]),
        ])
        .unwrap()
    }

    fn cpi() -> DataFrame {
        DataFrame::new(vec![
            Column::new(YEAR.into(), [2015i32, 2016]),
            Column::new(CPI.into(), [100.0, 110.0]),
        ])
        .unwrap()
    }

    fn employment() -> DataFrame {
        DataFrame::new(vec![
            Column::new(REGION.into(), ["North", "North", "South"]),
            Column::new(YEAR.into(), [2015i32, 2016, 2015]),
            Column::new(EMPLOYEES.into(), [10.0, 11.0, 0.0]),
        ])
        .unwrap()
    }

    #[test]
    fn inner_join_excludes_unmatched_keys() {
        let records =
            DataMerger::merge(&accounts(), &cpi(), &employment(), JoinPolicy::Inner).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records
            .iter()
            .all(|r| r.cpi.is_some() && r.employees.is_some()));
        assert!(!records.iter().any(|r| r.region == "South" && r.year == 2016));
    }

    #[test]
    fn left_join_keeps_accounts_rows_with_missing_fields() {
        let records =
            DataMerger::merge(&accounts(), &cpi(), &employment(), JoinPolicy::Left).unwrap();
        assert_eq!(records.len(), 4);
        let south_2016 = records
            .iter()
            .find(|r| r.region == "South" && r.year == 2016)
            .unwrap();
        assert_eq!(south_2016.cpi, Some(110.0));
        assert_eq!(south_2016.employees, None);
    }

    #[test]
    fn merged_keys_are_unique_and_sorted() {
        let records =
            DataMerger::merge(&accounts(), &cpi(), &employment(), JoinPolicy::Left).unwrap();
        DataMerger::check_unique(&records).unwrap();
        let keys: Vec<(String, i32)> = records.iter().map(|r| (r.region.clone(), r.year)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn disjoint_years_fail_loudly() {
        let late_cpi = DataFrame::new(vec![
            Column::new(YEAR.into(), [2020i32, 2021]),
            Column::new(CPI.into(), [120.0, 125.0]),
        ])
        .unwrap();

        let err =
            DataMerger::merge(&accounts(), &late_cpi, &employment(), JoinPolicy::Inner).unwrap_err();
        match err {
            MergeError::EmptyMerge { accounts, cpi, .. } => {
                assert_eq!(accounts, "2015-2016");
                assert_eq!(cpi, "2020-2021");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let record = RegionYearRecord {
            region: "North".to_string(),
            year: 2015,
            nominal_expense: 1.0,
            cpi: Some(100.0),
            employees: Some(1.0),
        };
        let err = DataMerger::check_unique(&[record.clone(), record]).unwrap_err();
        assert!(matches!(err, MergeError::DuplicateKey { year: 2015, .. }));
    }
}
