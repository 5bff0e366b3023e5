//! Econ Lab Main Application
//! Main window with control panel and result viewer.

use crate::config::AppConfig;
use crate::gui::control_panel::InputFile;
use crate::gui::{ControlPanel, ControlPanelAction, ResultViewer};
use crate::model::malthus;
use crate::model::optimize::NelderMeadSettings;
use crate::pipeline::{self, HouseholdAnalysis, RegionalAnalysis};
use egui::SidePanel;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use tracing::{error, info};

/// Result from a background job.
enum JobResult {
    Progress(f32, String),
    Regional(Box<RegionalAnalysis>),
    Household(Box<HouseholdAnalysis>),
    Error(String),
}

/// Main application window.
pub struct EconLabApp {
    control_panel: ControlPanel,
    result_viewer: ResultViewer,
    job_rx: Option<Receiver<JobResult>>,
}

impl EconLabApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        Self {
            control_panel: ControlPanel::new(config),
            result_viewer: ResultViewer::new(),
            job_rx: None,
        }
    }

    fn handle_browse(&mut self, file: InputFile) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            info!(path = %path.display(), ?file, "input selected");
            self.control_panel.set_path(file, path);
        }
    }

    /// Start a job on a background thread; only one runs at a time.
    fn spawn_job<F>(&mut self, status: &str, job: F)
    where
        F: FnOnce(&Sender<JobResult>) -> JobResult + Send + 'static,
    {
        if self.job_rx.is_some() {
            return;
        }
        let (tx, rx) = channel();
        self.job_rx = Some(rx);
        self.control_panel.busy = true;
        self.control_panel.set_progress(5.0, status);

        thread::spawn(move || {
            let result = job(&tx);
            let _ = tx.send(result);
        });
    }

    fn start_regional(&mut self) {
        let regional = self.control_panel.config.regional.clone();
        let statbank = self.control_panel.config.statbank.clone();

        self.spawn_job("Starting regional analysis...", move |tx| {
            let progress = |p: f32, status: &str| {
                let _ = tx.send(JobResult::Progress(p, status.to_string()));
            };
            match pipeline::run_regional(&regional, &statbank, progress) {
                Ok(analysis) => JobResult::Regional(Box::new(analysis)),
                Err(e) => {
                    error!("regional analysis failed: {e:#}");
                    JobResult::Error(format!("{e:#}"))
                }
            }
        });
    }

    fn start_household(&mut self) {
        let params = self.control_panel.config.household.clone();
        let target = self.control_panel.household_target();
        let status = if target.is_some() {
            "Estimating household parameters..."
        } else {
            "Solving household model..."
        };

        self.spawn_job(status, move |_| {
            match pipeline::run_household(&params, target, &NelderMeadSettings::default()) {
                Ok(analysis) => JobResult::Household(Box::new(analysis)),
                Err(e) => {
                    error!("household model failed: {e:#}");
                    JobResult::Error(format!("{e:#}"))
                }
            }
        });
    }

    /// The recurrence is cheap enough to run on the UI thread.
    fn simulate_malthus(&mut self) {
        let config = &self.control_panel.config;
        match malthus::simulate(&config.malthus, &config.solver) {
            Ok(simulation) => {
                let status = if simulation.converged {
                    format!("Complete! Converged in {} periods", simulation.periods())
                } else {
                    format!("Complete! Period cap of {} reached", config.solver.max_periods)
                };
                self.result_viewer.set_malthus(simulation);
                self.control_panel.set_progress(100.0, &status);
            }
            Err(e) => {
                error!("malthus simulation failed: {e}");
                self.control_panel.set_progress(0.0, &format!("Error: {e}"));
            }
        }
    }

    /// Drain messages from the running job.
    fn check_job_results(&mut self) {
        let Some(rx) = self.job_rx.take() else {
            return;
        };
        let mut finished = false;

        while let Ok(result) = rx.try_recv() {
            match result {
                JobResult::Progress(progress, status) => {
                    self.control_panel.set_progress(progress, &status);
                }
                JobResult::Regional(analysis) => {
                    let status = format!(
                        "Complete! {} rows across {} regions",
                        analysis.derived.len(),
                        analysis.regions().len()
                    );
                    self.result_viewer.set_regional(*analysis);
                    self.control_panel.set_progress(100.0, &status);
                    finished = true;
                }
                JobResult::Household(analysis) => {
                    self.result_viewer.set_household(*analysis);
                    self.control_panel
                        .set_progress(100.0, "Complete! Household model solved");
                    finished = true;
                }
                JobResult::Error(error) => {
                    self.control_panel
                        .set_progress(0.0, &format!("Error: {}", error));
                    finished = true;
                }
            }
        }

        if finished {
            self.control_panel.busy = false;
        } else {
            self.job_rx = Some(rx);
        }
    }
}

impl eframe::App for EconLabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_job_results();

        if self.job_rx.is_some() {
            ctx.request_repaint();
        }

        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(360.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    match self.control_panel.show(ui) {
                        ControlPanelAction::Browse(file) => self.handle_browse(file),
                        ControlPanelAction::RunRegional => self.start_regional(),
                        ControlPanelAction::Simulate => self.simulate_malthus(),
                        ControlPanelAction::SolveHousehold => self.start_household(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.result_viewer.show(ui);
        });
    }
}
