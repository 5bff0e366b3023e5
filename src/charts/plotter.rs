//! Chart Plotter Module
//! Interactive visualizations of the regional series and the two models using egui_plot.

use crate::data::{DataProcessor, DerivedRecord};
use crate::model::household::{Regression, WageSolution};
use crate::model::malthus::Simulation;
use crate::stats::MetricStats;
use egui::{Color32, RichText};
use egui_plot::{HLine, Legend, Line, Plot, PlotPoints, Points, VLine};

pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(231, 76, 60),  // Red
    Color32::from_rgb(46, 204, 113), // Green
    Color32::from_rgb(155, 89, 182), // Purple
    Color32::from_rgb(243, 156, 18), // Orange
    Color32::from_rgb(26, 188, 156), // Teal
    Color32::from_rgb(233, 30, 99),  // Pink
    Color32::from_rgb(0, 188, 212),  // Cyan
    Color32::from_rgb(255, 87, 34),  // Deep Orange
    Color32::from_rgb(121, 85, 72),  // Brown
    Color32::from_rgb(96, 125, 139), // Blue Grey
];

/// Which derived series a regional line chart shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionalSeries {
    RealExpense,
    ExpensePerEmployee,
    RealGrowth,
}

impl RegionalSeries {
    pub const ALL: [RegionalSeries; 3] = [
        RegionalSeries::RealExpense,
        RegionalSeries::ExpensePerEmployee,
        RegionalSeries::RealGrowth,
    ];

    pub fn title(self) -> &'static str {
        match self {
            RegionalSeries::RealExpense => "Real expense",
            RegionalSeries::ExpensePerEmployee => "Real expense per employee",
            RegionalSeries::RealGrowth => "Real growth",
        }
    }

    pub fn value(self, record: &DerivedRecord) -> Option<f64> {
        match self {
            RegionalSeries::RealExpense => record.real_expense,
            RegionalSeries::ExpensePerEmployee => record.expense_per_employee,
            RegionalSeries::RealGrowth => record.real_growth,
        }
    }
}

/// Creates the application's charts.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Color for the region at `index` in display order.
    pub fn region_color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    pub fn region_colors(regions: &[String]) -> Vec<(String, Color32)> {
        regions
            .iter()
            .enumerate()
            .map(|(i, region)| (region.clone(), Self::region_color(i)))
            .collect()
    }

    /// One line per region over years.
    pub fn draw_regional_series(
        ui: &mut egui::Ui,
        derived: &[DerivedRecord],
        colors: &[(String, Color32)],
        series: RegionalSeries,
    ) {
        Plot::new(format!("regional_{:?}", series))
            .height(280.0)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label("Year")
            .y_axis_label(series.title())
            .x_axis_formatter(|mark, _range| {
                if mark.value.fract().abs() < 1e-9 {
                    format!("{:.0}", mark.value)
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                for (region, color) in colors {
                    let points = DataProcessor::series_for_region(derived, region, |d| series.value(d));
                    if points.is_empty() {
                        continue;
                    }
                    plot_ui.line(
                        Line::new(PlotPoints::from_iter(points.iter().copied()))
                            .color(*color)
                            .width(1.5)
                            .name(region),
                    );
                    plot_ui.points(
                        Points::new(PlotPoints::from_iter(points.iter().copied()))
                            .radius(3.0)
                            .color(*color),
                    );
                }
            });
    }

    /// Population and output per capita over periods, with steady-state guides.
    pub fn draw_malthus(ui: &mut egui::Ui, simulation: &Simulation) {
        let population: Vec<[f64; 2]> = simulation
            .path
            .iter()
            .map(|s| [s.period as f64, s.population])
            .collect();
        let output: Vec<[f64; 2]> = simulation
            .path
            .iter()
            .map(|s| [s.period as f64, s.output_per_capita])
            .collect();

        ui.label(RichText::new("Population").size(14.0).strong());
        Plot::new("malthus_population")
            .height(240.0)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label("Period")
            .y_axis_label("L")
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::from(population))
                        .color(PALETTE[0])
                        .width(1.5)
                        .name("L(t)"),
                );
                plot_ui.hline(
                    HLine::new(simulation.steady_state.population)
                        .color(Color32::GRAY)
                        .name("L*"),
                );
            });

        ui.add_space(8.0);
        ui.label(RichText::new("Output per capita").size(14.0).strong());
        Plot::new("malthus_output")
            .height(240.0)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label("Period")
            .y_axis_label("y")
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::from(output))
                        .color(PALETTE[1])
                        .width(1.5)
                        .name("y(t)"),
                );
                plot_ui.hline(
                    HLine::new(simulation.steady_state.output_per_capita)
                        .color(Color32::GRAY)
                        .name("y*"),
                );
            });
    }

    /// log(HF/HM) against log(wF/wM) with the fitted regression line.
    pub fn draw_household_regression(
        ui: &mut egui::Ui,
        solution: &WageSolution,
        wage_male: f64,
        regression: &Regression,
    ) {
        let observed: Vec<[f64; 2]> = solution
            .female_wages
            .iter()
            .zip(&solution.choices)
            .filter(|(_, c)| c.hf > 0.0 && c.hm > 0.0)
            .map(|(wf, c)| [(wf / wage_male).ln(), c.home_ratio().ln()])
            .collect();

        let (lo, hi) = observed
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p[0]), hi.max(p[0]))
            });
        let fitted: Vec<[f64; 2]> = if lo.is_finite() && hi.is_finite() {
            [lo, hi]
                .iter()
                .map(|&x| [x, regression.beta0 + regression.beta1 * x])
                .collect()
        } else {
            Vec::new()
        };

        Plot::new("household_regression")
            .height(300.0)
            .legend(Legend::default())
            .allow_scroll(false)
            .x_axis_label("log(wF/wM)")
            .y_axis_label("log(HF/HM)")
            .show(ui, |plot_ui| {
                plot_ui.points(
                    Points::new(PlotPoints::from(observed))
                        .radius(4.0)
                        .color(PALETTE[2])
                        .name("Model"),
                );
                plot_ui.line(
                    Line::new(PlotPoints::from(fitted))
                        .color(Color32::BLACK)
                        .width(1.5)
                        .name(format!(
                            "{:.3} + {:.3} x",
                            regression.beta0, regression.beta1
                        )),
                );
                plot_ui.vline(VLine::new(0.0).color(Color32::GRAY));
            });
    }

    /// Per-region statistics table, each region in its chart color.
    pub fn draw_stats_table(ui: &mut egui::Ui, stats: &MetricStats, colors: &[(String, Color32)]) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::Grid::new(ui.make_persistent_id(format!("stats_table_{}", &stats.metric)))
                    .striped(true)
                    .min_col_width(55.0)
                    .spacing([8.0, 4.0])
                    .show(ui, |ui| {
                        for header in ["Region", "N", "Mean", "Median", "Std", "Min", "P05", "P95", "Max"] {
                            ui.label(RichText::new(header).strong().size(11.0));
                        }
                        ui.end_row();

                        let default_text_color = ui.visuals().text_color();
                        for region in stats.ordered_regions() {
                            let Some(rs) = stats.region_stats.get(&region) else {
                                continue;
                            };
                            let color = colors
                                .iter()
                                .find(|(r, _)| r == &region)
                                .map(|(_, c)| *c)
                                .unwrap_or(default_text_color);

                            ui.label(RichText::new(&rs.region).size(11.0).color(color));
                            ui.label(RichText::new(rs.count.to_string()).size(11.0));
                            for v in [rs.mean, rs.median, rs.std, rs.min, rs.p05, rs.p95, rs.max] {
                                ui.label(RichText::new(cell(v)).size(11.0));
                            }
                            ui.end_row();
                        }
                    });
            });
    }
}

/// Three decimals, or a dash for an undefined value.
fn cell(value: f64) -> String {
    if value.is_finite() {
        format!("{:.3}", value)
    } else {
        "-".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_cycle_the_palette_in_order() {
        let regions = vec!["Hovedstaden".to_string(), "Midtjylland".to_string(), "Sjælland".to_string()];
        let colors = ChartPlotter::region_colors(&regions);
        assert_eq!(colors[0], ("Hovedstaden".to_string(), PALETTE[0]));
        assert_eq!(colors[2].1, PALETTE[2]);
        assert_eq!(ChartPlotter::region_color(PALETTE.len() + 2), PALETTE[2]);
    }

    #[test]
    fn undefined_cells_render_dash() {
        assert_eq!(cell(f64::NAN), "-");
        assert_eq!(cell(0.12345), "0.123");
    }
}
