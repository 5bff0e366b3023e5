//! Econ Lab - Regional Expense Analysis & Growth Models
//!
//! Merges Danish regional accounts, CPI and employment into real expense
//! series, and explores a Malthusian model and a household specialization model.

mod charts;
mod config;
mod data;
mod gui;
mod model;
mod pipeline;
mod stats;

use config::AppConfig;
use eframe::egui;
use gui::EconLabApp;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_target(false)
        .init();

    let config = match std::env::current_dir()
        .map_err(|e| e.to_string())
        .and_then(|dir| AppConfig::load_or_default(&dir).map_err(|e| e.to_string()))
    {
        Ok(config) => config,
        Err(e) => {
            warn!("{e}; falling back to default settings");
            AppConfig::default()
        }
    };
    info!(
        employment_source = ?config.regional.employment_source,
        base_year = config.regional.base_year,
        "configuration loaded"
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 850.0])
            .with_min_inner_size([1100.0, 700.0])
            .with_title("Econ Lab"),
        ..Default::default()
    };

    eframe::run_native(
        "Econ Lab",
        options,
        Box::new(|cc| Ok(Box::new(EconLabApp::new(cc, config)))),
    )
}
