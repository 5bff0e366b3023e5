//! Control Panel Widget
//! Left side panel with data sources, model parameters and run controls.

use crate::config::{AppConfig, EmploymentSource};
use crate::data::JoinPolicy;
use crate::model::malthus::TechnologyShock;
use crate::model::EstimationTarget;
use egui::{Color32, DragValue, RichText, Slider};
use std::path::PathBuf;

/// Which input file a browse button targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFile {
    Accounts,
    Cpi,
    Employment,
}

impl InputFile {
    fn label(self) -> &'static str {
        match self {
            InputFile::Accounts => "Accounts",
            InputFile::Cpi => "CPI",
            InputFile::Employment => "Employment",
        }
    }
}

/// Left side control panel. Edits a working copy of the configuration.
pub struct ControlPanel {
    pub config: AppConfig,
    pub estimate_household: bool,
    pub estimation_target: EstimationTarget,
    pub separate_female_disutility: bool,
    pub progress: f32,
    pub status: String,
    pub busy: bool,
}

impl ControlPanel {
    pub fn new(config: AppConfig) -> Self {
        let separate_female_disutility = config.household.eta.is_some();
        Self {
            config,
            estimate_household: false,
            estimation_target: EstimationTarget::SigmaOnly,
            separate_female_disutility,
            progress: 0.0,
            status: "Ready".to_string(),
            busy: false,
        }
    }

    pub fn set_path(&mut self, file: InputFile, path: PathBuf) {
        let regional = &mut self.config.regional;
        match file {
            InputFile::Accounts => regional.accounts_path = Some(path),
            InputFile::Cpi => regional.cpi_path = Some(path),
            InputFile::Employment => regional.employment_path = Some(path),
        }
    }

    fn path(&self, file: InputFile) -> Option<&PathBuf> {
        let regional = &self.config.regional;
        match file {
            InputFile::Accounts => regional.accounts_path.as_ref(),
            InputFile::Cpi => regional.cpi_path.as_ref(),
            InputFile::Employment => regional.employment_path.as_ref(),
        }
    }

    /// Whether every input the regional run needs has been selected.
    pub fn regional_ready(&self) -> bool {
        let regional = &self.config.regional;
        regional.accounts_path.is_some()
            && regional.cpi_path.is_some()
            && (regional.employment_source == EmploymentSource::StatBank
                || regional.employment_path.is_some())
    }

    /// Estimation target to run, if estimation is switched on.
    pub fn household_target(&self) -> Option<EstimationTarget> {
        self.estimate_household.then_some(self.estimation_target)
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📈 Econ Lab")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Regional expenses & growth models")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();

        self.show_regional(ui, &mut action);
        ui.separator();
        self.show_malthus(ui, &mut action);
        ui.separator();
        self.show_household(ui, &mut action);
        ui.separator();
        ui.add_space(10.0);

        // ===== Progress Section =====
        ui.label(RichText::new("📊 Progress").size(14.0).strong());
        ui.add_space(5.0);
        ui.add(
            egui::ProgressBar::new(self.progress / 100.0)
                .show_percentage()
                .animate(self.busy),
        );
        ui.add_space(5.0);

        let status_color = if self.status.starts_with("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.starts_with("Complete") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    fn show_regional(&mut self, ui: &mut egui::Ui, action: &mut ControlPanelAction) {
        ui.add_space(5.0);
        ui.label(RichText::new("📁 Regional Data").size(14.0).strong());
        ui.add_space(5.0);

        let mut files = vec![InputFile::Accounts, InputFile::Cpi];
        if self.config.regional.employment_source == EmploymentSource::File {
            files.push(InputFile::Employment);
        }

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                for file in files {
                    ui.horizontal(|ui| {
                        let selected = self.path(file);
                        let name = selected
                            .and_then(|p| p.file_name())
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| "No file selected".to_string());
                        ui.add_sized([80.0, 20.0], egui::Label::new(file.label()));
                        ui.label(RichText::new(name).size(12.0).color(if selected.is_some() {
                            ui.visuals().text_color()
                        } else {
                            Color32::GRAY
                        }));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("📂 Browse").clicked() {
                                *action = ControlPanelAction::Browse(file);
                            }
                        });
                    });
                }
            });

        ui.add_space(8.0);
        let regional = &mut self.config.regional;
        ui.horizontal(|ui| {
            ui.label("Employment:");
            ui.radio_value(
                &mut regional.employment_source,
                EmploymentSource::StatBank,
                "StatBank",
            );
            ui.radio_value(&mut regional.employment_source, EmploymentSource::File, "File");
        });
        ui.horizontal(|ui| {
            ui.label("Join:");
            ui.radio_value(&mut regional.join_policy, JoinPolicy::Inner, "Inner");
            ui.radio_value(&mut regional.join_policy, JoinPolicy::Left, "Left");
        });
        ui.horizontal(|ui| {
            ui.label("CPI base year:");
            ui.add(DragValue::new(&mut regional.base_year).range(1900..=2100));
        });

        ui.add_space(8.0);
        ui.vertical_centered(|ui| {
            let enabled = self.regional_ready() && !self.busy;
            ui.add_enabled_ui(enabled, |ui| {
                let button = egui::Button::new(RichText::new("▶ Run Regional Analysis").size(15.0))
                    .min_size(egui::vec2(200.0, 32.0));
                if ui.add(button).clicked() {
                    *action = ControlPanelAction::RunRegional;
                }
            });
        });
        ui.add_space(8.0);
    }

    fn show_malthus(&mut self, ui: &mut egui::Ui, action: &mut ControlPanelAction) {
        ui.add_space(5.0);
        ui.label(RichText::new("⚙️ Malthus Model").size(14.0).strong());
        ui.add_space(5.0);

        let p = &mut self.config.malthus;
        ui.add(Slider::new(&mut p.alpha, 0.01..=0.99).text("α land share"));
        ui.add(Slider::new(&mut p.beta, 0.0..=0.99).text("β non-child share"));
        ui.add(Slider::new(&mut p.eta, 0.01..=2.0).text("η child cost"));
        ui.add(Slider::new(&mut p.mu, 0.01..=1.0).text("μ mortality"));
        ui.add(Slider::new(&mut p.technology, 0.1..=10.0).text("A technology"));
        ui.add(Slider::new(&mut p.land, 1.0..=1000.0).text("X land"));
        ui.add(
            Slider::new(&mut p.initial_population, 0.01..=1000.0)
                .logarithmic(true)
                .text("L0"),
        );

        let mut shocked = p.shock.is_some();
        ui.checkbox(&mut shocked, "Technology shock");
        if !shocked {
            p.shock = None;
        } else if p.shock.is_none() {
            p.shock = Some(TechnologyShock {
                period: 50,
                factor: 1.5,
            });
        }
        if let Some(shock) = p.shock.as_mut() {
            ui.horizontal(|ui| {
                ui.label("period");
                ui.add(DragValue::new(&mut shock.period).range(0..=5_000));
                ui.label("factor");
                ui.add(DragValue::new(&mut shock.factor).speed(0.01).range(0.01..=10.0));
            });
        }

        ui.add_space(8.0);
        ui.vertical_centered(|ui| {
            let button = egui::Button::new(RichText::new("▶ Simulate").size(15.0))
                .min_size(egui::vec2(200.0, 32.0));
            if ui.add(button).clicked() {
                *action = ControlPanelAction::Simulate;
            }
        });
        ui.add_space(8.0);
    }

    fn show_household(&mut self, ui: &mut egui::Ui, action: &mut ControlPanelAction) {
        ui.add_space(5.0);
        ui.label(RichText::new("🏠 Household Model").size(14.0).strong());
        ui.add_space(5.0);

        let h = &mut self.config.household;
        ui.add(Slider::new(&mut h.alpha, 0.01..=0.99).text("α female productivity"));
        ui.add(Slider::new(&mut h.sigma, 0.0..=2.0).text("σ substitution"));
        ui.add(Slider::new(&mut h.wage_female, 0.5..=1.5).text("wF"));

        ui.checkbox(
            &mut self.separate_female_disutility,
            "Separate female work disutility",
        );
        if self.separate_female_disutility {
            let eta = h.eta.get_or_insert(h.nu);
            ui.horizontal(|ui| {
                ui.label("η");
                ui.add(DragValue::new(eta).speed(0.0001).range(0.0..=1.0));
            });
        } else {
            h.eta = None;
        }

        ui.checkbox(&mut self.estimate_household, "Estimate before solving");
        if self.estimate_household {
            ui.horizontal(|ui| {
                ui.radio_value(
                    &mut self.estimation_target,
                    EstimationTarget::AlphaAndSigma,
                    "α and σ",
                );
                ui.radio_value(&mut self.estimation_target, EstimationTarget::SigmaOnly, "σ only");
            });
        }

        ui.add_space(8.0);
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(!self.busy, |ui| {
                let button = egui::Button::new(RichText::new("▶ Solve Household").size(15.0))
                    .min_size(egui::vec2(200.0, 32.0));
                if ui.add(button).clicked() {
                    *action = ControlPanelAction::SolveHousehold;
                }
            });
        });
        ui.add_space(8.0);
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    Browse(InputFile),
    RunRegional,
    Simulate,
    SolveHousehold,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regional_run_needs_all_inputs() {
        let mut panel = ControlPanel::new(AppConfig::default());
        assert!(!panel.regional_ready());

        panel.set_path(InputFile::Accounts, PathBuf::from("accounts.csv"));
        panel.set_path(InputFile::Cpi, PathBuf::from("cpi.csv"));
        assert!(panel.regional_ready());

        panel.config.regional.employment_source = EmploymentSource::File;
        assert!(!panel.regional_ready());
        panel.set_path(InputFile::Employment, PathBuf::from("employment.csv"));
        assert!(panel.regional_ready());
    }

    #[test]
    fn estimation_target_only_when_enabled() {
        let mut panel = ControlPanel::new(AppConfig::default());
        assert_eq!(panel.household_target(), None);
        panel.estimate_household = true;
        panel.estimation_target = EstimationTarget::AlphaAndSigma;
        assert_eq!(panel.household_target(), Some(EstimationTarget::AlphaAndSigma));
    }
}
