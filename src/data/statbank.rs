//! StatBank Client Module
//! Fetches a table from the Statistics Denmark data API as CSV and hands it
//! to the loader as a (region, year, employees) frame.

use crate::config::{SourceColumns, StatBankConfig, VariableSelection};
use crate::data::loader::{DataLoader, LoaderError};
use polars::prelude::*;
use reqwest::blocking::Client;
use serde::Serialize;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

const DATA_PATH: &str = "/data";
const REPLY_FORMAT: &str = "CSV";
const REPLY_SEPARATOR: u8 = b';';
const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Error, Debug)]
pub enum StatBankError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
    #[error("StatBank request for table {table} at {url} failed: {message}")]
    Transport {
        table: String,
        url: String,
        message: String,
    },
    #[error("StatBank returned HTTP {status} for table {table}: {body}")]
    Status {
        table: String,
        status: u16,
        body: String,
    },
    #[error("StatBank reply for table {table} is not a usable CSV: {message}")]
    Reply { table: String, message: String },
    #[error("Variable '{0}' is not part of the StatBank query")]
    UnknownVariable(String),
    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// Body of a `POST /data` request.
#[derive(Debug, Serialize)]
struct DataRequest<'a> {
    table: &'a str,
    format: &'a str,
    lang: &'a str,
    variables: &'a [VariableSelection],
}

/// Blocking StatBank client.
pub struct StatBankClient {
    http: Client,
    config: StatBankConfig,
}

impl StatBankClient {
    pub fn new(config: StatBankConfig) -> Result<Self, StatBankError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| StatBankError::ClientBuild(err.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn data_url(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), DATA_PATH)
    }

    /// Fetch the configured table and normalize it to employment per (region, year).
    pub fn fetch_employment(&self, loader: &DataLoader) -> Result<DataFrame, StatBankError> {
        let body = self.fetch_csv()?;
        let raw = parse_reply(&self.config.table, &body)?;
        let columns = reply_columns(&self.config, &raw)?;
        Ok(loader.normalize_employment(&raw, &columns)?)
    }

    fn fetch_csv(&self) -> Result<String, StatBankError> {
        let url = self.data_url();
        let table = self.config.table.clone();
        let payload = DataRequest {
            table: &self.config.table,
            format: REPLY_FORMAT,
            lang: &self.config.lang,
            variables: &self.config.variables,
        };

        info!(%url, %table, "requesting statbank table");
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .map_err(|err| StatBankError::Transport {
                table: table.clone(),
                url: url.clone(),
                message: err.to_string(),
            })?;

        let status = response.status();
        let body = response.text().map_err(|err| StatBankError::Transport {
            table: table.clone(),
            url: url.clone(),
            message: err.to_string(),
        })?;

        if !status.is_success() {
            return Err(StatBankError::Status {
                table,
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        info!(%table, bytes = body.len(), "statbank reply received");
        Ok(body)
    }
}

/// Parse the semicolon-separated reply body.
pub fn parse_reply(table: &str, body: &str) -> Result<DataFrame, StatBankError> {
    let text = body.trim_start_matches(BYTE_ORDER_MARK);
    if text.trim().is_empty() {
        return Err(StatBankError::Reply {
            table: table.to_string(),
            message: "empty body".to_string(),
        });
    }

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10000))
        .with_parse_options(CsvParseOptions::default().with_separator(REPLY_SEPARATOR))
        .into_reader_with_file_handle(Cursor::new(text.as_bytes().to_vec()))
        .finish()
        .map_err(|err| StatBankError::Reply {
            table: table.to_string(),
            message: err.to_string(),
        })
}

/// The reply lists the requested variables in request order followed by the
/// value column; header text depends on the reply language, so columns are
/// resolved by position.
pub fn reply_columns(
    config: &StatBankConfig,
    raw: &DataFrame,
) -> Result<SourceColumns, StatBankError> {
    let names: Vec<String> = raw
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    if names.len() != config.variables.len() + 1 {
        return Err(StatBankError::Reply {
            table: config.table.clone(),
            message: format!(
                "expected {} columns, got {} ({})",
                config.variables.len() + 1,
                names.len(),
                names.join(", ")
            ),
        });
    }

    let position = |code: &str| {
        config
            .variables
            .iter()
            .position(|v| v.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| StatBankError::UnknownVariable(code.to_string()))
    };
    let region_idx = position(&config.region_variable)?;
    let time_idx = position(&config.time_variable)?;

    Ok(SourceColumns {
        region: Some(names[region_idx].clone()),
        time: names[time_idx].clone(),
        value: names[names.len() - 1].clone(),
    })
}
