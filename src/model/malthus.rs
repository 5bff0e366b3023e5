//! Malthusian Model
//! Population and output per capita with a fixed land endowment, iterated
//! to its steady state.
//!
//! Y_t = (A X)^alpha L_t^(1 - alpha),  y_t = (A X / L_t)^alpha
//! L_{t+1} = eta (1 - beta) y_t L_t + (1 - mu) L_t

use crate::model::ModelError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const DEFAULT_TOLERANCE: f64 = 1e-8;
const DEFAULT_MAX_PERIODS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MalthusParams {
    /// Land share in production.
    pub alpha: f64,
    /// Share of income not spent on children.
    pub beta: f64,
    /// Cost of raising a child.
    pub eta: f64,
    /// Mortality rate.
    pub mu: f64,
    /// Technology level.
    pub technology: f64,
    /// Land.
    pub land: f64,
    /// Initial population.
    pub initial_population: f64,
    pub shock: Option<TechnologyShock>,
}

impl Default for MalthusParams {
    fn default() -> Self {
        Self {
            alpha: 0.15,
            beta: 0.4,
            eta: 0.3,
            mu: 0.2,
            technology: 1.0,
            land: 100.0,
            initial_population: 1.0,
            shock: None,
        }
    }
}

/// Technology is multiplied by `factor` from `period` onward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnologyShock {
    pub period: usize,
    pub factor: f64,
}

/// Termination criterion: |L_{t+1} - L_t| < tolerance or `max_periods` reached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub tolerance: f64,
    pub max_periods: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_periods: DEFAULT_MAX_PERIODS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelState {
    pub period: usize,
    pub population: f64,
    pub output_per_capita: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteadyState {
    pub population: f64,
    pub output_per_capita: f64,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub path: Vec<ModelState>,
    pub converged: bool,
    pub steady_state: SteadyState,
}

impl Simulation {
    pub fn last(&self) -> Option<&ModelState> {
        self.path.last()
    }

    pub fn periods(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

impl MalthusParams {
    pub fn validate(&self) -> Result<(), ModelError> {
        let check = |ok: bool, name: &str, value: f64, rule: &str| {
            if ok {
                Ok(())
            } else {
                Err(ModelError::InvalidParameter {
                    name: name.to_string(),
                    value,
                    rule: rule.to_string(),
                })
            }
        };
        check(self.alpha > 0.0 && self.alpha < 1.0, "alpha", self.alpha, "0 < alpha < 1")?;
        check(self.beta >= 0.0 && self.beta < 1.0, "beta", self.beta, "0 <= beta < 1")?;
        check(self.eta > 0.0, "eta", self.eta, "eta > 0")?;
        check(self.mu > 0.0 && self.mu <= 1.0, "mu", self.mu, "0 < mu <= 1")?;
        check(self.technology > 0.0, "technology", self.technology, "A > 0")?;
        check(self.land > 0.0, "land", self.land, "X > 0")?;
        check(
            self.initial_population > 0.0,
            "initial_population",
            self.initial_population,
            "L0 > 0",
        )?;
        if let Some(shock) = self.shock {
            check(shock.factor > 0.0, "shock.factor", shock.factor, "factor > 0")?;
        }
        Ok(())
    }

    /// Technology in effect at `period`.
    pub fn technology_at(&self, period: usize) -> f64 {
        match self.shock {
            Some(shock) if period >= shock.period => self.technology * shock.factor,
            _ => self.technology,
        }
    }

    pub fn output_per_capita(&self, population: f64, technology: f64) -> f64 {
        (technology * self.land / population).powf(self.alpha)
    }

    /// Fertility per person given output per capita.
    pub fn fertility(&self, output_per_capita: f64) -> f64 {
        self.eta * (1.0 - self.beta) * output_per_capita
    }

    /// Population rises iff output per capita exceeds this level.
    pub fn subsistence_output(&self) -> f64 {
        self.mu / (self.eta * (1.0 - self.beta))
    }

    pub fn next_population(&self, population: f64, technology: f64) -> f64 {
        let y = self.output_per_capita(population, technology);
        self.fertility(y) * population + (1.0 - self.mu) * population
    }

    /// Analytic fixed point for a given technology level.
    pub fn steady_state(&self, technology: f64) -> SteadyState {
        let population =
            (self.eta * (1.0 - self.beta) / self.mu).powf(1.0 / self.alpha) * technology * self.land;
        SteadyState {
            population,
            output_per_capita: self.subsistence_output(),
        }
    }

    /// Steady state under the long-run technology level.
    pub fn long_run_steady_state(&self) -> SteadyState {
        self.steady_state(self.technology_at(usize::MAX))
    }
}

/// Iterate the recurrence until the population change falls below the
/// tolerance or the period cap is reached. Iteration does not stop before a
/// pending technology shock has taken effect.
pub fn simulate(params: &MalthusParams, settings: &SolverSettings) -> Result<Simulation, ModelError> {
    params.validate()?;
    if settings.tolerance.is_nan() || settings.tolerance <= 0.0 || settings.max_periods == 0 {
        return Err(ModelError::InvalidSolver {
            tolerance: settings.tolerance,
            max_periods: settings.max_periods,
        });
    }

    let shock_period = params.shock.map(|s| s.period).unwrap_or(0);
    let mut population = params.initial_population;
    let mut path = Vec::with_capacity(settings.max_periods.min(100_000) + 1);
    path.push(ModelState {
        period: 0,
        population,
        output_per_capita: params.output_per_capita(population, params.technology_at(0)),
    });

    let mut converged = false;
    for period in 0..settings.max_periods {
        let next = params.next_population(population, params.technology_at(period));
        if !next.is_finite() || next <= 0.0 {
            return Err(ModelError::Diverged {
                period,
                value: next,
            });
        }

        let change = (next - population).abs();
        population = next;
        path.push(ModelState {
            period: period + 1,
            population,
            output_per_capita: params
                .output_per_capita(population, params.technology_at(period + 1)),
        });

        if change < settings.tolerance && period + 1 > shock_period {
            converged = true;
            break;
        }
    }

    let simulation = Simulation {
        steady_state: params.long_run_steady_state(),
        converged,
        path,
    };

    if converged {
        info!(
            periods = simulation.periods(),
            population = population,
            "malthus recurrence converged"
        );
    } else {
        warn!(
            max_periods = settings.max_periods,
            population = population,
            "malthus recurrence hit the period cap before converging"
        );
    }

    Ok(simulation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn relative_error(a: f64, b: f64) -> f64 {
        (a - b).abs() / b.abs()
    }

    #[test]
    fn converges_to_analytic_steady_state() {
        let params = MalthusParams::default();
        let sim = simulate(&params, &SolverSettings::default()).unwrap();
        assert!(sim.converged);

        let last = sim.last().unwrap();
        let ss = params.steady_state(params.technology);
        assert!(relative_error(last.population, ss.population) < 1e-5);
        assert!(relative_error(last.output_per_capita, ss.output_per_capita) < 1e-5);
    }

    #[test]
    fn steady_state_is_a_fixed_point() {
        let params = MalthusParams::default();
        let ss = params.steady_state(params.technology);
        let next = params.next_population(ss.population, params.technology);
        assert!(relative_error(next, ss.population) < 1e-12);
        assert!(
            relative_error(params.output_per_capita(ss.population, params.technology), ss.output_per_capita)
                < 1e-12
        );
    }

    #[test]
    fn population_grows_above_and_shrinks_below_subsistence() {
        let params = MalthusParams::default();
        let ss = params.steady_state(params.technology);

        let small = ss.population * 0.5;
        assert!(params.output_per_capita(small, params.technology) > params.subsistence_output());
        assert!(params.next_population(small, params.technology) > small);

        let large = ss.population * 2.0;
        assert!(params.output_per_capita(large, params.technology) < params.subsistence_output());
        assert!(params.next_population(large, params.technology) < large);
    }

    #[test]
    fn period_cap_stops_iteration() {
        let settings = SolverSettings {
            tolerance: 1e-12,
            max_periods: 5,
        };
        let sim = simulate(&MalthusParams::default(), &settings).unwrap();
        assert!(!sim.converged);
        assert_eq!(sim.periods(), 5);
        assert_eq!(sim.path.len(), 6);
    }

    #[test]
    fn technology_shock_scales_population_not_income() {
        let params = MalthusParams {
            shock: Some(TechnologyShock {
                period: 50,
                factor: 2.0,
            }),
            ..MalthusParams::default()
        };
        let sim = simulate(&params, &SolverSettings::default()).unwrap();
        assert!(sim.converged);
        assert!(sim.periods() > 50);

        let before = params.steady_state(params.technology);
        let last = sim.last().unwrap();
        assert!(relative_error(last.population, 2.0 * before.population) < 1e-5);
        assert!(relative_error(last.output_per_capita, before.output_per_capita) < 1e-5);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let params = MalthusParams {
            alpha: 1.5,
            ..MalthusParams::default()
        };
        assert!(matches!(
            simulate(&params, &SolverSettings::default()),
            Err(ModelError::InvalidParameter { .. })
        ));

        let params = MalthusParams {
            initial_population: 0.0,
            ..MalthusParams::default()
        };
        assert!(params.validate().is_err());

        let settings = SolverSettings {
            tolerance: 0.0,
            max_periods: 10,
        };
        assert!(matches!(
            simulate(&MalthusParams::default(), &settings),
            Err(ModelError::InvalidSolver { .. })
        ));
    }

    proptest! {
        #[test]
        fn recurrence_is_deterministic(l0 in 0.01f64..1.0e4, alpha in 0.05f64..0.6) {
            let params = MalthusParams { initial_population: l0, alpha, ..MalthusParams::default() };
            let settings = SolverSettings { tolerance: 1e-6, max_periods: 2_000 };
            let a = simulate(&params, &settings).unwrap();
            let b = simulate(&params, &settings).unwrap();
            prop_assert_eq!(a.path, b.path);
            prop_assert_eq!(a.converged, b.converged);
        }

        #[test]
        fn converges_from_any_positive_population(l0 in 1.0e-3f64..1.0e5) {
            let params = MalthusParams { initial_population: l0, ..MalthusParams::default() };
            let sim = simulate(&params, &SolverSettings::default()).unwrap();
            prop_assert!(sim.converged);
            let last = sim.last().unwrap();
            let ss = params.steady_state(params.technology);
            prop_assert!(relative_error(last.population, ss.population) < 1e-5);
        }
    }
}
