//! Result Viewer Widget
//! Central tabbed area showing regional charts, the Malthus simulation and
//! the household model.

use crate::charts::{ChartPlotter, RegionalSeries};
use crate::model::household::Choice;
use crate::model::malthus::Simulation;
use crate::pipeline::{HouseholdAnalysis, RegionalAnalysis};
use egui::{Color32, RichText, ScrollArea};

const CARD_SPACING: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultTab {
    #[default]
    Regional,
    Malthus,
    Household,
}

#[derive(Default)]
pub struct ResultViewer {
    pub tab: ResultTab,
    pub regional: Option<RegionalAnalysis>,
    pub malthus: Option<Simulation>,
    pub household: Option<HouseholdAnalysis>,
}

impl ResultViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_regional(&mut self, analysis: RegionalAnalysis) {
        self.regional = Some(analysis);
        self.tab = ResultTab::Regional;
    }

    pub fn set_malthus(&mut self, simulation: Simulation) {
        self.malthus = Some(simulation);
        self.tab = ResultTab::Malthus;
    }

    pub fn set_household(&mut self, analysis: HouseholdAnalysis) {
        self.household = Some(analysis);
        self.tab = ResultTab::Household;
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, ResultTab::Regional, "Regional expenses");
            ui.selectable_value(&mut self.tab, ResultTab::Malthus, "Malthus model");
            ui.selectable_value(&mut self.tab, ResultTab::Household, "Household model");
        });
        ui.separator();

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| match self.tab {
                ResultTab::Regional => match &self.regional {
                    Some(analysis) => Self::show_regional(ui, analysis),
                    None => Self::no_data(ui),
                },
                ResultTab::Malthus => match &self.malthus {
                    Some(simulation) => Self::show_malthus(ui, simulation),
                    None => Self::no_data(ui),
                },
                ResultTab::Household => match &self.household {
                    Some(analysis) => Self::show_household(ui, analysis),
                    None => Self::no_data(ui),
                },
            });
    }

    fn no_data(ui: &mut egui::Ui) {
        ui.centered_and_justified(|ui| {
            ui.label(RichText::new("No Data").size(20.0));
        });
    }

    fn card(ui: &mut egui::Ui, title: &str, border: Color32, add_contents: impl FnOnce(&mut egui::Ui)) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(2.0, border))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.label(RichText::new(title).size(18.0).strong().color(border));
                ui.add_space(8.0);
                add_contents(ui);
            });
        ui.add_space(CARD_SPACING);
    }

    fn show_regional(ui: &mut egui::Ui, analysis: &RegionalAnalysis) {
        let stats = &analysis.stats;
        let colors = ChartPlotter::region_colors(&analysis.regions());

        ui.label(
            RichText::new(format!(
                "{} rows · {} join · prices of {} (CPI {:.1})",
                analysis.derived.len(),
                analysis.join_policy.label(),
                analysis.base_year,
                analysis.base_cpi
            ))
            .color(Color32::GRAY),
        );
        ui.add_space(8.0);

        for series in RegionalSeries::ALL {
            Self::card(ui, series.title(), Color32::from_rgb(100, 149, 237), |ui| {
                ChartPlotter::draw_regional_series(ui, &analysis.derived, &colors, series);
            });
        }

        Self::card(ui, &stats.metric, Color32::from_rgb(40, 167, 69), |ui| {
            ChartPlotter::draw_stats_table(ui, stats, &colors);
        });
    }

    fn show_malthus(ui: &mut egui::Ui, simulation: &Simulation) {
        let (status, color) = if simulation.converged {
            (
                format!("Converged after {} periods", simulation.periods()),
                Color32::from_rgb(40, 167, 69),
            )
        } else {
            (
                format!("Stopped at the period cap ({}) without converging", simulation.periods()),
                Color32::from_rgb(220, 53, 69),
            )
        };

        Self::card(ui, "Malthusian steady state", color, |ui| {
            ui.label(RichText::new(status).color(color));
            if let Some(last) = simulation.last() {
                egui::Grid::new("malthus_summary")
                    .striped(true)
                    .spacing([12.0, 4.0])
                    .show(ui, |ui| {
                        ui.label(RichText::new("").strong());
                        ui.label(RichText::new("Simulated").strong());
                        ui.label(RichText::new("Analytic").strong());
                        ui.end_row();
                        ui.label("Population");
                        ui.label(format!("{:.6}", last.population));
                        ui.label(format!("{:.6}", simulation.steady_state.population));
                        ui.end_row();
                        ui.label("Output per capita");
                        ui.label(format!("{:.6}", last.output_per_capita));
                        ui.label(format!("{:.6}", simulation.steady_state.output_per_capita));
                        ui.end_row();
                    });
            }
            ui.add_space(8.0);
            ChartPlotter::draw_malthus(ui, simulation);
        });
    }

    fn show_household(ui: &mut egui::Ui, analysis: &HouseholdAnalysis) {
        let border = Color32::from_rgb(155, 89, 182);

        if let Some(estimate) = &analysis.estimate {
            Self::card(ui, "Estimation", border, |ui| {
                ui.label(format!(
                    "α = {:.4}, σ = {:.4}, objective = {:.3e} after {} iterations",
                    estimate.alpha, estimate.sigma, estimate.objective, estimate.iterations
                ));
                ui.label(format!(
                    "targets β0 = {:.3}, β1 = {:.3}",
                    analysis.params.beta0_target, analysis.params.beta1_target
                ));
            });
        }

        Self::card(
            ui,
            &format!("Optimal hours on the grid (wF = {:.2})", analysis.params.wage_female),
            border,
            |ui| Self::choice_grid(ui, "discrete_choice", &analysis.discrete),
        );

        Self::card(ui, "Home hours vs relative wage", border, |ui| {
            ui.label(format!(
                "β0 = {:.4}, β1 = {:.4}",
                analysis.regression.beta0, analysis.regression.beta1
            ));
            ChartPlotter::draw_household_regression(
                ui,
                &analysis.solution,
                analysis.params.wage_male,
                &analysis.regression,
            );
            egui::Grid::new("wage_solutions")
                .striped(true)
                .spacing([12.0, 4.0])
                .show(ui, |ui| {
                    for header in ["wF", "LM", "HM", "LF", "HF", "HF/HM"] {
                        ui.label(RichText::new(header).strong());
                    }
                    ui.end_row();
                    for (wf, c) in analysis.solution.female_wages.iter().zip(&analysis.solution.choices) {
                        ui.label(format!("{:.2}", wf));
                        for v in [c.lm, c.hm, c.lf, c.hf, c.home_ratio()] {
                            ui.label(format!("{:.3}", v));
                        }
                        ui.end_row();
                    }
                });
        });
    }

    fn choice_grid(ui: &mut egui::Ui, id: &str, choice: &Choice) {
        egui::Grid::new(id).striped(true).spacing([12.0, 4.0]).show(ui, |ui| {
            for header in ["LM", "HM", "LF", "HF"] {
                ui.label(RichText::new(header).strong());
            }
            ui.end_row();
            for v in [choice.lm, choice.hm, choice.lf, choice.hf] {
                ui.label(format!("{:.2}", v));
            }
            ui.end_row();
        });
    }
}
