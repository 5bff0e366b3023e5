//! Application Configuration
//! Optional `econ_lab.json` in the working directory; every section falls
//! back to defaults so a partial file is fine.

use crate::data::JoinPolicy;
use crate::model::{HouseholdParams, MalthusParams, SolverSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "econ_lab.json";

const DEFAULT_STATBANK_URL: &str = "https://api.statbank.dk/v1";
const DEFAULT_EMPLOYMENT_TABLE: &str = "RAS301";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BASE_YEAR: i32 = 2015;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub regional: RegionalConfig,
    pub statbank: StatBankConfig,
    pub malthus: MalthusParams,
    pub solver: SolverSettings,
    pub household: HouseholdParams,
}

impl AppConfig {
    /// Load `econ_lab.json` from `dir`, or defaults when it does not exist.
    pub fn load_or_default(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Column names of a source CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceColumns {
    pub region: Option<String>,
    pub time: String,
    pub value: String,
}

/// Where employment figures come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentSource {
    StatBank,
    File,
}

/// Inputs and policies of the regional expense analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionalConfig {
    pub accounts_path: Option<PathBuf>,
    pub cpi_path: Option<PathBuf>,
    pub employment_path: Option<PathBuf>,
    pub employment_source: EmploymentSource,
    pub accounts_columns: SourceColumns,
    pub cpi_columns: SourceColumns,
    pub employment_columns: SourceColumns,
    pub separator: char,
    pub join_policy: JoinPolicy,
    pub base_year: i32,
    /// Maps alternative region labels onto the label used in the accounts table.
    pub region_aliases: HashMap<String, String>,
}

impl Default for RegionalConfig {
    fn default() -> Self {
        Self {
            accounts_path: None,
            cpi_path: None,
            employment_path: None,
            employment_source: EmploymentSource::StatBank,
            accounts_columns: SourceColumns {
                region: Some("region".to_string()),
                time: "year".to_string(),
                value: "expense".to_string(),
            },
            cpi_columns: SourceColumns {
                region: None,
                time: "year".to_string(),
                value: "cpi".to_string(),
            },
            employment_columns: SourceColumns {
                region: Some("OMRÅDE".to_string()),
                time: "TID".to_string(),
                value: "INDHOLD".to_string(),
            },
            separator: ',',
            join_policy: JoinPolicy::Inner,
            base_year: DEFAULT_BASE_YEAR,
            region_aliases: HashMap::new(),
        }
    }
}

/// One variable selection of a StatBank table query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariableSelection {
    pub code: String,
    pub values: Vec<String>,
}

/// StatBank API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatBankConfig {
    pub base_url: String,
    pub table: String,
    pub lang: String,
    pub timeout_secs: u64,
    /// Variable code holding the region dimension.
    pub region_variable: String,
    /// Variable code holding the time dimension.
    pub time_variable: String,
    pub variables: Vec<VariableSelection>,
}

impl Default for StatBankConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STATBANK_URL.to_string(),
            table: DEFAULT_EMPLOYMENT_TABLE.to_string(),
            lang: "en".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            region_variable: "OMRÅDE".to_string(),
            time_variable: "Tid".to_string(),
            variables: vec![
                VariableSelection {
                    code: "OMRÅDE".to_string(),
                    values: vec!["*".to_string()],
                },
                VariableSelection {
                    code: "Tid".to_string(),
                    values: vec!["*".to_string()],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.regional.join_policy, JoinPolicy::Inner);
        assert_eq!(config.regional.base_year, DEFAULT_BASE_YEAR);
        assert_eq!(config.solver.max_periods, 10_000);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "regional": { "join_policy": "left", "base_year": 2020 },
                 "solver": { "tolerance": 1e-6 } }"#,
        )
        .unwrap();

        let config = AppConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.regional.join_policy, JoinPolicy::Left);
        assert_eq!(config.regional.base_year, 2020);
        assert_eq!(config.regional.separator, ',');
        assert_eq!(config.solver.tolerance, 1e-6);
        assert_eq!(config.solver.max_periods, 10_000);
        assert_eq!(config.statbank.table, DEFAULT_EMPLOYMENT_TABLE);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();
        let err = AppConfig::load_or_default(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
