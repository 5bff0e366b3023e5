//! Nelder-Mead simplex minimizer with box bounds.
//!
//! Trial points are clamped into the box; other constraints are expressed
//! by the objective returning `f64::INFINITY`.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMeadSettings {
    pub max_iterations: usize,
    /// Stop when the spread of objective values across the simplex is below this.
    pub f_tolerance: f64,
    /// Stop when the simplex diameter is below this.
    pub x_tolerance: f64,
    /// Relative size of the initial simplex steps.
    pub initial_step: f64,
}

impl Default for NelderMeadSettings {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            f_tolerance: 1e-10,
            x_tolerance: 1e-8,
            initial_step: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

fn clamp(x: &mut [f64], bounds: &[(f64, f64)]) {
    for (xi, &(lo, hi)) in x.iter_mut().zip(bounds) {
        *xi = xi.clamp(lo, hi);
    }
}

/// Affine combination `a + t (b - a)` clamped into the box.
fn along(a: &[f64], b: &[f64], t: f64, bounds: &[(f64, f64)]) -> Vec<f64> {
    let mut out: Vec<f64> = a.iter().zip(b).map(|(ai, bi)| ai + t * (bi - ai)).collect();
    clamp(&mut out, bounds);
    out
}

fn evaluate<F: FnMut(&[f64]) -> f64>(f: &mut F, x: &[f64]) -> f64 {
    let v = f(x);
    if v.is_nan() {
        f64::INFINITY
    } else {
        v
    }
}

/// Minimize `f` from `x0` within `bounds` (one `(low, high)` pair per coordinate).
pub fn nelder_mead<F>(
    mut f: F,
    x0: &[f64],
    bounds: &[(f64, f64)],
    settings: &NelderMeadSettings,
) -> Minimum
where
    F: FnMut(&[f64]) -> f64,
{
    let n = x0.len();
    debug_assert_eq!(n, bounds.len());

    let mut start = x0.to_vec();
    clamp(&mut start, bounds);

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.clone());
    for i in 0..n {
        let mut vertex = start.clone();
        let (lo, hi) = bounds[i];
        let step = if vertex[i] != 0.0 {
            settings.initial_step * vertex[i].abs()
        } else {
            settings.initial_step * (hi - lo).max(1e-3)
        };
        // Step inward if the upper bound is in the way.
        vertex[i] = if vertex[i] + step <= hi {
            vertex[i] + step
        } else {
            vertex[i] - step
        };
        clamp(&mut vertex, bounds);
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| evaluate(&mut f, v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < settings.max_iterations {
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let spread = (values[n] - values[0]).abs();
        let diameter = simplex[1..]
            .iter()
            .map(|v| {
                v.iter()
                    .zip(&simplex[0])
                    .map(|(a, b)| (a - b).abs())
                    .fold(0.0, f64::max)
            })
            .fold(0.0, f64::max);
        if (spread.is_finite() && spread <= settings.f_tolerance) || diameter <= settings.x_tolerance
        {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
            .collect();
        let worst = simplex[n].clone();

        let reflected = along(&centroid, &worst, -REFLECTION, bounds);
        let f_reflected = evaluate(&mut f, &reflected);

        if f_reflected < values[0] {
            let expanded = along(&centroid, &worst, -EXPANSION, bounds);
            let f_expanded = evaluate(&mut f, &expanded);
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
            continue;
        }

        let (contracted, f_contracted) = if f_reflected < values[n] {
            let c = along(&centroid, &reflected, CONTRACTION, bounds);
            let fc = evaluate(&mut f, &c);
            (c, fc)
        } else {
            let c = along(&centroid, &worst, CONTRACTION, bounds);
            let fc = evaluate(&mut f, &c);
            (c, fc)
        };

        if f_contracted < values[n].min(f_reflected) {
            simplex[n] = contracted;
            values[n] = f_contracted;
            continue;
        }

        let best = simplex[0].clone();
        for i in 1..=n {
            simplex[i] = along(&best, &simplex[i], SHRINK, bounds);
            values[i] = evaluate(&mut f, &simplex[i]);
        }
    }

    let (best_idx, _) = values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .unwrap_or((0, &values[0]));

    Minimum {
        x: simplex[best_idx].clone(),
        value: values[best_idx],
        iterations,
        converged,
    }
}
