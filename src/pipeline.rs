//! Analysis Pipelines
//! Regional: load -> merge -> derive -> statistics, each stage failing with context.
//! Household: solve -> regress, optionally after estimating parameters.

use crate::config::{EmploymentSource, RegionalConfig, StatBankConfig};
use crate::data::loader::{CPI, YEAR};
use crate::data::{
    DataLoader, DataMerger, DataProcessor, DerivedRecord, JoinPolicy, StatBankClient,
};
use crate::model::household::{Choice, Estimate, Regression, WageSolution};
use crate::model::optimize::NelderMeadSettings;
use crate::model::{EstimationTarget, HouseholdParams};
use crate::stats::{MetricStats, StatsCalculator};
use anyhow::{anyhow, Context, Result};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::info;

pub const PER_EMPLOYEE_METRIC: &str = "Real expense per employee";

/// Everything the regional view displays.
#[derive(Debug, Clone)]
pub struct RegionalAnalysis {
    pub derived: Vec<DerivedRecord>,
    pub stats: MetricStats,
    pub base_year: i32,
    pub base_cpi: f64,
    pub join_policy: JoinPolicy,
}

impl RegionalAnalysis {
    pub fn regions(&self) -> Vec<String> {
        DataProcessor::regions(&self.derived)
    }
}

/// Load all sources named in the config and run the analysis.
pub fn run_regional<P>(
    config: &RegionalConfig,
    statbank: &StatBankConfig,
    progress: P,
) -> Result<RegionalAnalysis>
where
    P: Fn(f32, &str),
{
    let separator = u8::try_from(config.separator)
        .map_err(|_| anyhow!("CSV separator '{}' is not a single byte", config.separator))?;
    let loader = DataLoader::new(separator, config.region_aliases.clone());

    progress(10.0, "Loading regional accounts...");
    let accounts_path = config
        .accounts_path
        .as_deref()
        .context("no regional accounts file selected")?;
    let accounts = loader
        .load_accounts(accounts_path, &config.accounts_columns)
        .with_context(|| format!("loading regional accounts from {}", accounts_path.display()))?;

    progress(25.0, "Loading CPI...");
    let cpi_path = config.cpi_path.as_deref().context("no CPI file selected")?;
    let cpi = loader
        .load_cpi(cpi_path, &config.cpi_columns)
        .with_context(|| format!("loading CPI from {}", cpi_path.display()))?;

    progress(40.0, "Loading employment...");
    let employment = match config.employment_source {
        EmploymentSource::File => {
            let path = config
                .employment_path
                .as_deref()
                .context("employment source is 'file' but no employment file is selected")?;
            loader
                .load_employment(path, &config.employment_columns)
                .with_context(|| format!("loading employment from {}", path.display()))?
        }
        EmploymentSource::StatBank => StatBankClient::new(statbank.clone())
            .and_then(|client| client.fetch_employment(&loader))
            .with_context(|| format!("fetching employment table {} from StatBank", statbank.table))?,
    };

    progress(60.0, "Merging and deriving metrics...");
    analyze_frames(&accounts, &cpi, &employment, config)
}

/// Merge already-normalized frames and compute derived series and statistics.
pub fn analyze_frames(
    accounts: &DataFrame,
    cpi: &DataFrame,
    employment: &DataFrame,
    config: &RegionalConfig,
) -> Result<RegionalAnalysis> {
    let records = DataMerger::merge(accounts, cpi, employment, config.join_policy)
        .context("merging accounts, CPI and employment")?;

    let cpi_by_year = cpi_by_year(cpi).context("reading annual CPI")?;
    let base_cpi = DataProcessor::base_cpi(&cpi_by_year, config.base_year)
        .context("resolving the CPI base year")?;

    let derived = DataProcessor::derive(&records, base_cpi);
    let by_region = DataProcessor::per_employee_by_region(&derived);
    let stats = StatsCalculator::compute_metric_stats(PER_EMPLOYEE_METRIC, &by_region);

    info!(
        rows = derived.len(),
        regions = by_region.len(),
        base_year = config.base_year,
        "regional analysis complete"
    );

    Ok(RegionalAnalysis {
        derived,
        stats,
        base_year: config.base_year,
        base_cpi,
        join_policy: config.join_policy,
    })
}

fn cpi_by_year(cpi: &DataFrame) -> PolarsResult<HashMap<i32, f64>> {
    let years = cpi.column(YEAR)?.cast(&DataType::Int32)?;
    let values = cpi.column(CPI)?.f64()?;
    Ok(years
        .i32()?
        .into_iter()
        .zip(values.into_iter())
        .filter_map(|(y, v)| Some((y?, v?)))
        .collect())
}

/// Household solutions at the configured (or fitted) parameters.
#[derive(Debug, Clone)]
pub struct HouseholdAnalysis {
    pub params: HouseholdParams,
    /// Grid solution at the single configured female wage.
    pub discrete: Choice,
    pub solution: WageSolution,
    pub regression: Regression,
    pub estimate: Option<Estimate>,
}

/// Solve the household model, first fitting parameters when `target` is given.
pub fn run_household(
    params: &HouseholdParams,
    target: Option<EstimationTarget>,
    settings: &NelderMeadSettings,
) -> Result<HouseholdAnalysis> {
    let estimate = target
        .map(|t| params.estimate(t, settings))
        .transpose()
        .context("estimating home production parameters")?;

    let params = match &estimate {
        Some(e) => HouseholdParams {
            alpha: e.alpha,
            sigma: e.sigma,
            ..params.clone()
        },
        None => params.clone(),
    };

    let discrete = params
        .solve_discrete()
        .context("solving the household model on the hour grid")?;
    let solution = params
        .solve_wage_grid()
        .context("solving the household model across female wages")?;
    let regression = params
        .run_regression(&solution)
        .context("regressing home hours on wages")?;

    Ok(HouseholdAnalysis {
        params,
        discrete,
        solution,
        regression,
        estimate,
    })
}
