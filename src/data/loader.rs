//! CSV Data Loader Module
//! Loads the spreadsheet exports with Polars and maps them onto canonical
//! (region, year, value) frames.

use crate::config::SourceColumns;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

pub const REGION: &str = "region";
pub const YEAR: &str = "year";
pub const NOMINAL_EXPENSE: &str = "nominal_expense";
pub const CPI: &str = "cpi";
pub const EMPLOYEES: &str = "employees";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Input file not found: {0}")]
    MissingFile(String),
    #[error("Column '{column}' not found in {source_name} (available: {available})")]
    MissingColumn {
        source_name: String,
        column: String,
        available: String,
    },
    #[error("{0} source has no usable rows")]
    NoData(String),
}

/// Extract the calendar year from a StatBank-style time key
/// (`2015`, `2015M03`, `2015K2`, `2015Q2`, `2015.0`).
pub fn normalize_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim().trim_matches('"');
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    let rest = &trimmed[digits.len()..];
    let valid_suffix = rest.is_empty()
        || rest.starts_with('M')
        || rest.starts_with('K')
        || rest.starts_with('Q')
        || rest.starts_with('H')
        || rest.chars().all(|c| c == '.' || c == '0');
    if !valid_suffix {
        return None;
    }
    digits.parse().ok()
}

/// Handles CSV file loading and column normalization.
pub struct DataLoader {
    separator: u8,
    region_aliases: HashMap<String, String>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(b',', HashMap::new())
    }
}

impl DataLoader {
    pub fn new(separator: u8, region_aliases: HashMap<String, String>) -> Self {
        Self {
            separator,
            region_aliases,
        }
    }

    /// Load a CSV file using Polars.
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::MissingFile(path.display().to_string()));
        }

        let df = LazyCsvReader::new(path)
            .with_separator(self.separator)
            .with_infer_schema_length(Some(10000))
            .finish()?
            .collect()?;

        info!(path = %path.display(), rows = df.height(), "loaded csv");
        Ok(df)
    }

    /// Regional accounts: one row per (region, year), expenses summed.
    pub fn load_accounts(
        &self,
        path: &Path,
        columns: &SourceColumns,
    ) -> Result<DataFrame, LoaderError> {
        let raw = self.load_csv(path)?;
        let df = self.normalize_keyed(&raw, "accounts", columns, NOMINAL_EXPENSE)?;
        Ok(df
            .lazy()
            .group_by([col(REGION), col(YEAR)])
            .agg([col(NOMINAL_EXPENSE).sum()])
            .sort([REGION, YEAR], SortMultipleOptions::default())
            .collect()?)
    }

    /// CPI: one row per year, sub-annual observations averaged.
    pub fn load_cpi(&self, path: &Path, columns: &SourceColumns) -> Result<DataFrame, LoaderError> {
        let raw = self.load_csv(path)?;
        Self::normalize_cpi(&raw, columns)
    }

    /// Employment export: one row per (region, year), sub-annual counts averaged.
    pub fn load_employment(
        &self,
        path: &Path,
        columns: &SourceColumns,
    ) -> Result<DataFrame, LoaderError> {
        let raw = self.load_csv(path)?;
        self.normalize_employment(&raw, columns)
    }

    pub fn normalize_cpi(raw: &DataFrame, columns: &SourceColumns) -> Result<DataFrame, LoaderError> {
        let year_series = required_column(raw, "cpi", &columns.time)?;
        let value_series = required_column(raw, "cpi", &columns.value)?;
        let value_f64 = value_series.cast(&DataType::Float64)?;
        let value_ca = value_f64.f64()?;

        let mut years: Vec<i32> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        let mut dropped = 0usize;

        for i in 0..raw.height() {
            let year = year_series
                .get(i)
                .ok()
                .filter(|v| !v.is_null())
                .and_then(|v| normalize_year(&v.to_string()));
            match (year, value_ca.get(i)) {
                (Some(y), Some(v)) if v.is_finite() => {
                    years.push(y);
                    values.push(v);
                }
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(source = "cpi", dropped, "dropped rows with missing year or value");
        }
        if years.is_empty() {
            return Err(LoaderError::NoData("cpi".to_string()));
        }

        let df = DataFrame::new(vec![
            Column::new(YEAR.into(), years),
            Column::new(CPI.into(), values),
        ])?;

        Ok(df
            .lazy()
            .group_by([col(YEAR)])
            .agg([col(CPI).mean()])
            .sort([YEAR], SortMultipleOptions::default())
            .collect()?)
    }

    pub fn normalize_employment(
        &self,
        raw: &DataFrame,
        columns: &SourceColumns,
    ) -> Result<DataFrame, LoaderError> {
        let df = self.normalize_keyed(raw, "employment", columns, EMPLOYEES)?;
        Ok(df
            .lazy()
            .group_by([col(REGION), col(YEAR)])
            .agg([col(EMPLOYEES).mean()])
            .sort([REGION, YEAR], SortMultipleOptions::default())
            .collect()?)
    }

    /// Map a region label through the alias table.
    pub fn canonical_region(&self, raw: &str) -> String {
        let trimmed = raw.trim().trim_matches('"').trim();
        self.region_aliases
            .get(trimmed)
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }

    /// Build a (region, year, value_name) frame, dropping rows with a
    /// missing key or value.
    fn normalize_keyed(
        &self,
        raw: &DataFrame,
        source_name: &str,
        columns: &SourceColumns,
        value_name: &str,
    ) -> Result<DataFrame, LoaderError> {
        let region_col = columns.region.as_deref().ok_or_else(|| LoaderError::MissingColumn {
            source_name: source_name.to_string(),
            column: REGION.to_string(),
            available: column_list(raw),
        })?;
        let region_series = required_column(raw, source_name, region_col)?;
        let year_series = required_column(raw, source_name, &columns.time)?;
        let value_series = required_column(raw, source_name, &columns.value)?;
        let value_f64 = value_series.cast(&DataType::Float64)?;
        let value_ca = value_f64.f64()?;

        let mut regions: Vec<String> = Vec::new();
        let mut years: Vec<i32> = Vec::new();
        let mut values: Vec<f64> = Vec::new();
        let mut dropped = 0usize;

        for i in 0..raw.height() {
            let region = region_series
                .get(i)
                .ok()
                .filter(|v| !v.is_null())
                .map(|v| self.canonical_region(&v.to_string()))
                .filter(|r| !r.is_empty());
            let year = year_series
                .get(i)
                .ok()
                .filter(|v| !v.is_null())
                .and_then(|v| normalize_year(&v.to_string()));

            match (region, year, value_ca.get(i)) {
                (Some(r), Some(y), Some(v)) if v.is_finite() => {
                    regions.push(r);
                    years.push(y);
                    values.push(v);
                }
                _ => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(source = source_name, dropped, "dropped rows with missing key or value");
        }
        if regions.is_empty() {
            return Err(LoaderError::NoData(source_name.to_string()));
        }

        Ok(DataFrame::new(vec![
            Column::new(REGION.into(), regions),
            Column::new(YEAR.into(), years),
            Column::new(value_name.into(), values),
        ])?)
    }
}

fn column_list(df: &DataFrame) -> String {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn required_column<'a>(
    df: &'a DataFrame,
    source_name: &str,
    name: &str,
) -> Result<&'a Column, LoaderError> {
    df.column(name).map_err(|_| LoaderError::MissingColumn {
        source_name: source_name.to_string(),
        column: name.to_string(),
        available: column_list(df),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    fn accounts_columns() -> SourceColumns {
        SourceColumns {
            region: Some("region".to_string()),
            time: "year".to_string(),
            value: "expense".to_string(),
        }
    }

    #[test]
    fn normalizes_statbank_time_keys() {
        assert_eq!(normalize_year("2015"), Some(2015));
        assert_eq!(normalize_year("2015M03"), Some(2015));
        assert_eq!(normalize_year("2019K4"), Some(2019));
        assert_eq!(normalize_year("2021Q1"), Some(2021));
        assert_eq!(normalize_year("\"2008\""), Some(2008));
        assert_eq!(normalize_year("2010.0"), Some(2010));
        assert_eq!(normalize_year("15"), None);
        assert_eq!(normalize_year("total"), None);
        assert_eq!(normalize_year("2015-2016"), None);
    }

    #[test]
    fn accounts_are_summed_per_region_year() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "accounts.csv",
            "region,year,expense\n\
             Region Hovedstaden,2015,100\n\
             Region Hovedstaden,2015,50\n\
             Region Sjælland,2015,80\n\
             Region Sjælland,2016,\n",
        );

        let df = DataLoader::default()
            .load_accounts(&path, &accounts_columns())
            .unwrap();

        assert_eq!(df.height(), 2);
        let expenses: Vec<f64> = df
            .column(NOMINAL_EXPENSE)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(expenses, vec![150.0, 80.0]);
    }

    #[test]
    fn cpi_is_averaged_per_year() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "cpi.csv",
            "TID;INDHOLD\n2015M01;99\n2015M02;101\n2016M01;104\n",
        );
        let loader = DataLoader::new(b';', HashMap::new());
        let columns = SourceColumns {
            region: None,
            time: "TID".to_string(),
            value: "INDHOLD".to_string(),
        };

        let df = loader.load_cpi(&path, &columns).unwrap();
        assert_eq!(df.height(), 2);
        let cpi: Vec<f64> = df.column(CPI).unwrap().f64().unwrap().into_iter().flatten().collect();
        assert_eq!(cpi, vec![100.0, 104.0]);
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "accounts.csv", "area,year,expense\nA,2015,1\n");
        let err = DataLoader::default()
            .load_accounts(&path, &accounts_columns())
            .unwrap_err();
        match err {
            LoaderError::MissingColumn { column, available, .. } => {
                assert_eq!(column, "region");
                assert!(available.contains("area"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_reported() {
        let err = DataLoader::default()
            .load_csv(Path::new("/definitely/not/here.csv"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::MissingFile(_)));
    }

    #[test]
    fn aliases_map_region_labels() {
        let mut aliases = HashMap::new();
        aliases.insert("Capital Region".to_string(), "Region Hovedstaden".to_string());
        let loader = DataLoader::new(b',', aliases);
        assert_eq!(loader.canonical_region(" Capital Region "), "Region Hovedstaden");
        assert_eq!(loader.canonical_region("\"Region Nordjylland\""), "Region Nordjylland");
    }
}
