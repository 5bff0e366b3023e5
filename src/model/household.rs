//! Household Specialization Model
//! Two household members split 24 hours between market work (L) and home
//! production (H). Solved on a discrete grid or continuously, then used to
//! regress log(HF/HM) on log(wF/wM) and to estimate the home production
//! parameters that reproduce target regression coefficients.

use crate::model::optimize::{nelder_mead, NelderMeadSettings};
use crate::model::ModelError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const HOURS: f64 = 24.0;
const HOURS_FLOOR: f64 = 1e-7;
const HOURS_SLACK: f64 = 1e-9;
const CONSUMPTION_FLOOR: f64 = 1e-8;
const UNIT_SIGMA_EPS: f64 = 1e-12;
const INITIAL_GUESS: [f64; 4] = [4.0; 4];
const ESTIMATION_BOUNDS: (f64, f64) = (0.01, 0.99);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseholdParams {
    /// Curvature of utility.
    pub rho: f64,
    /// Disutility weight of work (male, and female unless `eta` is set).
    pub nu: f64,
    /// Separate disutility weight of female work.
    pub eta: Option<f64>,
    /// Frisch elasticity of labor supply.
    pub epsilon: f64,
    /// Weight on market consumption.
    pub omega: f64,
    /// Female productivity in home production.
    pub alpha: f64,
    /// Elasticity of substitution in home production.
    pub sigma: f64,
    pub wage_male: f64,
    pub wage_female: f64,
    pub female_wages: Vec<f64>,
    pub beta0_target: f64,
    pub beta1_target: f64,
    pub grid_points: usize,
}

impl Default for HouseholdParams {
    fn default() -> Self {
        Self {
            rho: 2.0,
            nu: 0.001,
            eta: None,
            epsilon: 1.0,
            omega: 0.5,
            alpha: 0.5,
            sigma: 1.0,
            wage_male: 1.0,
            wage_female: 1.0,
            female_wages: vec![0.8, 0.9, 1.0, 1.1, 1.2],
            beta0_target: 0.4,
            beta1_target: -0.1,
            grid_points: 49,
        }
    }
}

/// Hours of market (L) and home (H) work for the male (M) and female (F).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Choice {
    pub lm: f64,
    pub hm: f64,
    pub lf: f64,
    pub hf: f64,
}

impl Choice {
    pub fn from_slice(x: &[f64]) -> Self {
        Self {
            lm: x[0],
            hm: x[1],
            lf: x[2],
            hf: x[3],
        }
    }

    pub fn is_feasible(&self) -> bool {
        let in_range = |v: f64| (0.0..=HOURS).contains(&v);
        in_range(self.lm)
            && in_range(self.hm)
            && in_range(self.lf)
            && in_range(self.hf)
            && self.lm + self.hm <= HOURS + HOURS_SLACK
            && self.lf + self.hf <= HOURS + HOURS_SLACK
    }

    /// Female over male home hours.
    pub fn home_ratio(&self) -> f64 {
        self.hf / self.hm
    }
}

/// Solution for each female wage.
#[derive(Debug, Clone, PartialEq)]
pub struct WageSolution {
    pub female_wages: Vec<f64>,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub beta0: f64,
    pub beta1: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub alpha: f64,
    pub sigma: f64,
    pub regression: Regression,
    pub objective: f64,
    pub iterations: usize,
}

/// Which parameters the estimation searches over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimationTarget {
    AlphaAndSigma,
    SigmaOnly,
}

impl HouseholdParams {
    /// The variant where female work carries its own disutility weight.
    pub fn extended(eta: f64) -> Self {
        Self {
            eta: Some(eta),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |name: &str, value: f64, rule: &str| ModelError::InvalidParameter {
            name: name.to_string(),
            value,
            rule: rule.to_string(),
        };
        if (self.rho - 1.0).abs() < UNIT_SIGMA_EPS {
            return Err(invalid("rho", self.rho, "rho != 1"));
        }
        if self.epsilon <= 0.0 {
            return Err(invalid("epsilon", self.epsilon, "epsilon > 0"));
        }
        if !(0.0..=1.0).contains(&self.omega) {
            return Err(invalid("omega", self.omega, "0 <= omega <= 1"));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(invalid("alpha", self.alpha, "0 <= alpha <= 1"));
        }
        if self.sigma < 0.0 {
            return Err(invalid("sigma", self.sigma, "sigma >= 0"));
        }
        if self.wage_male <= 0.0 {
            return Err(invalid("wage_male", self.wage_male, "wM > 0"));
        }
        if let Some(w) = self.female_wages.iter().copied().find(|w| *w <= 0.0) {
            return Err(invalid("female_wages", w, "wF > 0"));
        }
        if self.grid_points < 2 {
            return Err(invalid("grid_points", self.grid_points as f64, "at least 2 points"));
        }
        Ok(())
    }

    /// Home production from male and female home hours.
    pub fn home_production(&self, hm: f64, hf: f64) -> f64 {
        if self.sigma == 0.0 {
            hm.min(hf)
        } else if (self.sigma - 1.0).abs() < UNIT_SIGMA_EPS {
            hm.powf(1.0 - self.alpha) * hf.powf(self.alpha)
        } else {
            let hm = hm.max(HOURS_FLOOR);
            let hf = hf.max(HOURS_FLOOR);
            let exponent = (self.sigma - 1.0) / self.sigma;
            let inside = (1.0 - self.alpha) * hm.powf(exponent) + self.alpha * hf.powf(exponent);
            inside.powf(1.0 / exponent)
        }
    }

    /// Utility of a choice at the current female wage.
    pub fn utility(&self, choice: &Choice) -> f64 {
        let c = self.wage_male * choice.lm + self.wage_female * choice.lf;
        let h = self.home_production(choice.hm, choice.hf);

        let q = c.powf(self.omega) * h.powf(1.0 - self.omega);
        let consumption_utility = q.max(CONSUMPTION_FLOOR).powf(1.0 - self.rho) / (1.0 - self.rho);

        let e = 1.0 + 1.0 / self.epsilon;
        let tm = choice.lm + choice.hm;
        let tf = choice.lf + choice.hf;
        let nu_female = self.eta.unwrap_or(self.nu);
        let disutility = self.nu * tm.powf(e) / e + nu_female * tf.powf(e) / e;

        consumption_utility - disutility
    }

    /// Grid search over every feasible combination of evenly spaced hours.
    pub fn solve_discrete(&self) -> Result<Choice, ModelError> {
        self.validate()?;
        let last = self.grid_points - 1;
        let grid: Vec<f64> = (0..self.grid_points)
            .map(|i| (i as f64 * HOURS) / last as f64)
            .collect();

        // Ties resolve to the lowest grid index.
        let best = grid
            .par_iter()
            .enumerate()
            .filter_map(|(i_lm, &lm)| {
                let mut best: Option<(usize, f64, Choice)> = None;
                for (i_hm, &hm) in grid.iter().enumerate() {
                    // Feasibility on indices; float sums can overshoot 24 by an ulp.
                    if i_lm + i_hm > last {
                        break;
                    }
                    for (i_lf, &lf) in grid.iter().enumerate() {
                        for (i_hf, &hf) in grid.iter().enumerate() {
                            if i_lf + i_hf > last {
                                break;
                            }
                            let choice = Choice { lm, hm, lf, hf };
                            let u = self.utility(&choice);
                            let index = ((i_lm * self.grid_points + i_hm) * self.grid_points + i_lf)
                                * self.grid_points
                                + i_hf;
                            if best.map_or(true, |(_, b, _)| u > b) {
                                best = Some((index, u, choice));
                            }
                        }
                    }
                }
                best
            })
            .reduce_with(|a, b| {
                if b.1 > a.1 || (b.1 == a.1 && b.0 < a.0) {
                    b
                } else {
                    a
                }
            });

        best.map(|(_, _, choice)| choice)
            .ok_or(ModelError::NoFeasibleChoice)
    }

    /// Continuous maximization from the initial guess (4, 4, 4, 4).
    pub fn solve_continuous(&self) -> Result<Choice, ModelError> {
        self.validate()?;
        let settings = NelderMeadSettings {
            max_iterations: 5_000,
            f_tolerance: 1e-12,
            x_tolerance: 1e-9,
            initial_step: 0.25,
        };
        let min = nelder_mead(
            |x| {
                let choice = Choice::from_slice(x);
                if choice.is_feasible() {
                    -self.utility(&choice)
                } else {
                    f64::INFINITY
                }
            },
            &INITIAL_GUESS,
            &[(0.0, HOURS); 4],
            &settings,
        );
        if !min.value.is_finite() {
            return Err(ModelError::NoFeasibleChoice);
        }
        Ok(Choice::from_slice(&min.x))
    }

    /// Continuous solution for every female wage.
    pub fn solve_wage_grid(&self) -> Result<WageSolution, ModelError> {
        let choices = self
            .female_wages
            .iter()
            .map(|&wf| {
                let params = HouseholdParams {
                    wage_female: wf,
                    ..self.clone()
                };
                params.solve_continuous()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WageSolution {
            female_wages: self.female_wages.clone(),
            choices,
        })
    }

    /// OLS of log(HF/HM) on a constant and log(wF/wM).
    pub fn run_regression(&self, solution: &WageSolution) -> Result<Regression, ModelError> {
        let mut xs = Vec::with_capacity(solution.choices.len());
        let mut ys = Vec::with_capacity(solution.choices.len());
        for (wf, choice) in solution.female_wages.iter().zip(&solution.choices) {
            if choice.hf <= 0.0 || choice.hm <= 0.0 {
                return Err(ModelError::NonPositiveHomeHours {
                    wage_female: *wf,
                    hm: choice.hm,
                    hf: choice.hf,
                });
            }
            xs.push((wf / self.wage_male).ln());
            ys.push(choice.home_ratio().ln());
        }
        ols(&xs, &ys)
    }

    /// Squared distance of the regression coefficients from their targets.
    pub fn estimation_objective(&self) -> Result<f64, ModelError> {
        let solution = self.solve_wage_grid()?;
        let reg = self.run_regression(&solution)?;
        Ok((self.beta0_target - reg.beta0).powi(2) + (self.beta1_target - reg.beta1).powi(2))
    }

    /// Nelder-Mead search for (alpha, sigma) or sigma alone within [0.01, 0.99].
    pub fn estimate(
        &self,
        target: EstimationTarget,
        settings: &NelderMeadSettings,
    ) -> Result<Estimate, ModelError> {
        self.validate()?;
        let (x0, bounds): (Vec<f64>, Vec<(f64, f64)>) = match target {
            EstimationTarget::AlphaAndSigma => (vec![0.5, 0.1], vec![ESTIMATION_BOUNDS; 2]),
            EstimationTarget::SigmaOnly => (vec![0.1], vec![ESTIMATION_BOUNDS]),
        };

        let with = |x: &[f64]| match target {
            EstimationTarget::AlphaAndSigma => HouseholdParams {
                alpha: x[0],
                sigma: x[1],
                ..self.clone()
            },
            EstimationTarget::SigmaOnly => HouseholdParams {
                sigma: x[0],
                ..self.clone()
            },
        };

        let min = nelder_mead(
            |x| {
                let objective = with(x).estimation_objective().unwrap_or(f64::INFINITY);
                debug!(?x, objective, "estimation step");
                objective
            },
            &x0,
            &bounds,
            settings,
        );

        let fitted = with(&min.x);
        let regression = fitted.run_regression(&fitted.solve_wage_grid()?)?;
        info!(
            alpha = fitted.alpha,
            sigma = fitted.sigma,
            objective = min.value,
            iterations = min.iterations,
            "household estimation finished"
        );

        Ok(Estimate {
            alpha: fitted.alpha,
            sigma: fitted.sigma,
            regression,
            objective: min.value,
            iterations: min.iterations,
        })
    }
}

/// Simple linear regression y = beta0 + beta1 x.
pub fn ols(xs: &[f64], ys: &[f64]) -> Result<Regression, ModelError> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return Err(ModelError::Regression(format!(
            "need at least two paired observations, got {} x and {} y",
            xs.len(),
            ys.len()
        )));
    }
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;
    let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return Err(ModelError::Regression("regressor has no variation".to_string()));
    }
    let sxy: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mean_x) * (y - mean_y))
        .sum();
    let beta1 = sxy / sxx;
    Ok(Regression {
        beta0: mean_y - beta1 * mean_x,
        beta1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_production_branches() {
        let leontief = HouseholdParams {
            sigma: 0.0,
            ..HouseholdParams::default()
        };
        assert_eq!(leontief.home_production(3.0, 5.0), 3.0);

        let cobb_douglas = HouseholdParams::default();
        assert!((cobb_douglas.home_production(4.0, 9.0) - 6.0).abs() < 1e-12);

        // CES with equal inputs returns the common input.
        let ces = HouseholdParams {
            sigma: 0.5,
            ..HouseholdParams::default()
        };
        assert!((ces.home_production(5.0, 5.0) - 5.0).abs() < 1e-9);
        assert!(ces.home_production(0.0, 5.0).is_finite());
    }

    #[test]
    fn extra_female_disutility_lowers_utility() {
        let choice = Choice {
            lm: 4.0,
            hm: 4.0,
            lf: 4.0,
            hf: 4.0,
        };
        let base = HouseholdParams::default();
        let extended = HouseholdParams::extended(0.002);
        assert!(extended.utility(&choice) < base.utility(&choice));
    }

    #[test]
    fn discrete_solution_is_feasible_and_optimal_on_grid() {
        let params = HouseholdParams {
            grid_points: 13,
            ..HouseholdParams::default()
        };
        let best = params.solve_discrete().unwrap();
        assert!(best.is_feasible());

        let u_best = params.utility(&best);
        for probe in [
            Choice { lm: 4.0, hm: 4.0, lf: 4.0, hf: 4.0 },
            Choice { lm: 12.0, hm: 2.0, lf: 2.0, hf: 12.0 },
            Choice { lm: 0.0, hm: 24.0, lf: 24.0, hf: 0.0 },
        ] {
            assert!(u_best >= params.utility(&probe));
        }
    }

    #[test]
    fn grid_keeps_allocations_that_fill_the_day() {
        // 24 / (n - 1) is inexact for these sizes; pairs summing to 24 must stay feasible.
        for grid_points in [14, 16, 18, 27, 31] {
            let params = HouseholdParams {
                grid_points,
                ..HouseholdParams::default()
            };
            let best = params.solve_discrete().unwrap();
            assert!(best.is_feasible(), "grid_points = {grid_points}");

            let last = grid_points - 1;
            let point = |i: usize| (i as f64 * HOURS) / last as f64;
            for i in 0..grid_points {
                let full_day = Choice {
                    lm: point(i),
                    hm: point(last - i),
                    lf: point(last - i),
                    hf: point(i),
                };
                assert!(full_day.is_feasible(), "grid_points = {grid_points}, i = {i}");
                assert!(params.utility(&best) >= params.utility(&full_day));
            }
        }
    }

    #[test]
    fn continuous_beats_or_matches_coarse_grid() {
        let params = HouseholdParams {
            grid_points: 13,
            ..HouseholdParams::default()
        };
        let grid = params.solve_discrete().unwrap();
        let cont = params.solve_continuous().unwrap();
        assert!(cont.is_feasible());
        assert!(params.utility(&cont) >= params.utility(&grid) - 1e-9);
    }

    #[test]
    fn symmetric_household_splits_home_work_evenly() {
        let cont = HouseholdParams::default().solve_continuous().unwrap();
        assert!((cont.home_ratio() - 1.0).abs() < 0.02);
    }

    #[test]
    fn cobb_douglas_regression_slope_is_minus_one() {
        let params = HouseholdParams::default();
        let solution = params.solve_wage_grid().unwrap();
        assert_eq!(solution.choices.len(), 5);

        let reg = params.run_regression(&solution).unwrap();
        assert!(reg.beta0.abs() < 0.05, "beta0 = {}", reg.beta0);
        assert!((reg.beta1 + 1.0).abs() < 0.1, "beta1 = {}", reg.beta1);
    }

    #[test]
    fn ols_recovers_exact_line() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys: Vec<f64> = xs.iter().map(|x| 0.4 - 0.1 * x).collect();
        let reg = ols(&xs, &ys).unwrap();
        assert!((reg.beta0 - 0.4).abs() < 1e-12);
        assert!((reg.beta1 + 0.1).abs() < 1e-12);

        assert!(ols(&[1.0], &[1.0]).is_err());
        assert!(ols(&[1.0, 1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn estimation_does_not_worsen_the_objective() {
        let params = HouseholdParams::extended(0.002);
        let start = HouseholdParams {
            sigma: 0.1,
            ..params.clone()
        }
        .estimation_objective()
        .unwrap();

        let settings = NelderMeadSettings {
            max_iterations: 15,
            ..NelderMeadSettings::default()
        };
        let estimate = params.estimate(EstimationTarget::SigmaOnly, &settings).unwrap();
        assert!(estimate.objective <= start);
        assert!((0.01..=0.99).contains(&estimate.sigma));
        assert_eq!(estimate.alpha, params.alpha);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let params = HouseholdParams {
            grid_points: 1,
            ..HouseholdParams::default()
        };
        assert!(matches!(
            params.solve_discrete(),
            Err(ModelError::InvalidParameter { .. })
        ));
        let params = HouseholdParams {
            rho: 1.0,
            ..HouseholdParams::default()
        };
        assert!(params.validate().is_err());
    }
}
