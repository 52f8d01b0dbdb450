//! Derivative-free Nelder-Mead simplex minimizer.
//!
//! The registration cost function provides no gradient, so the driver has
//! to be simplex-based. This one supports an automatic or user-supplied
//! initial simplex, a fractional-tolerance stop rule, and an optional
//! restart heuristic that reruns from the best point with halved edge
//! length to improve the odds of escaping a local optimum.

use serde::{Deserialize, Serialize};

/// Simplex search settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AmoebaParams {
    /// Total evaluation budget across all restarts.
    pub max_iterations: usize,
    /// Stop when the relative spread of simplex values falls below this.
    pub fractional_tolerance: f64,
    /// Per-coordinate offsets building the initial simplex; `None` builds
    /// a small simplex around the start point automatically.
    pub initial_simplex_delta: Option<Vec<f64>>,
    /// Rerun after convergence with halved simplex edges until the budget
    /// runs out or the value stops improving.
    pub restarts: bool,
}

impl Default for AmoebaParams {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            fractional_tolerance: 1e-6,
            initial_simplex_delta: None,
            restarts: false,
        }
    }
}

/// Outcome of a simplex search.
#[derive(Clone, Debug)]
pub struct AmoebaResult {
    pub parameters: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Minimize `f` starting from `x0`.
pub fn minimize<F>(f: F, x0: &[f64], params: &AmoebaParams) -> AmoebaResult
where
    F: Fn(&[f64]) -> f64,
{
    if x0.is_empty() {
        return AmoebaResult {
            parameters: Vec::new(),
            value: f(x0),
            iterations: 1,
            converged: true,
        };
    }

    let mut deltas = match &params.initial_simplex_delta {
        Some(deltas) => {
            let mut d = deltas.clone();
            d.resize(x0.len(), 0.1);
            d
        }
        None => x0
            .iter()
            .map(|&x| if x != 0.0 { 0.05 * x.abs() } else { 0.01 })
            .collect(),
    };

    let mut best = x0.to_vec();
    let mut best_value = f(&best);
    let mut iterations = 1usize;

    let mut run = run_simplex(&f, &best, &deltas, params, &mut iterations);
    let mut converged = run.converged;
    loop {
        let improved = run.value < best_value - params.fractional_tolerance * best_value.abs();
        if run.value < best_value {
            best = run.parameters;
            best_value = run.value;
        }

        if !params.restarts || iterations >= params.max_iterations || (!improved && converged) {
            break;
        }
        for d in &mut deltas {
            *d *= 0.5;
        }
        run = run_simplex(&f, &best, &deltas, params, &mut iterations);
        converged = run.converged;
    }

    AmoebaResult {
        parameters: best,
        value: best_value,
        iterations,
        converged,
    }
}

struct RunOutcome {
    parameters: Vec<f64>,
    value: f64,
    converged: bool,
}

fn run_simplex<F>(
    f: &F,
    x0: &[f64],
    deltas: &[f64],
    params: &AmoebaParams,
    iterations: &mut usize,
) -> RunOutcome
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for i in 0..n {
        let mut corner = x0.to_vec();
        corner[i] += deltas[i];
        simplex.push(corner);
    }
    let mut values: Vec<f64> = simplex.iter().map(|p| f(p)).collect();
    *iterations += simplex.len();

    let mut converged = false;
    while *iterations < params.max_iterations {
        // Order: best first, worst last.
        let mut order: Vec<usize> = (0..simplex.len()).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        let spread = 2.0 * (values[worst] - values[best]).abs()
            / (values[worst].abs() + values[best].abs() + f64::EPSILON);
        if spread < params.fractional_tolerance {
            converged = true;
            break;
        }

        // Centroid of all corners but the worst.
        let mut centroid = vec![0.0; n];
        for (i, corner) in simplex.iter().enumerate() {
            if i == worst {
                continue;
            }
            for (c, x) in centroid.iter_mut().zip(corner.iter()) {
                *c += x;
            }
        }
        for c in &mut centroid {
            *c /= n as f64;
        }

        let reflected = blend(&centroid, &simplex[worst], -1.0);
        let reflected_value = f(&reflected);
        *iterations += 1;

        if reflected_value < values[best] {
            let expanded = blend(&centroid, &simplex[worst], -2.0);
            let expanded_value = f(&expanded);
            *iterations += 1;
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
        } else if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
        } else {
            let contracted = blend(&centroid, &simplex[worst], 0.5);
            let contracted_value = f(&contracted);
            *iterations += 1;
            if contracted_value < values[worst] {
                simplex[worst] = contracted;
                values[worst] = contracted_value;
            } else {
                // Shrink everything toward the best corner.
                let best_corner = simplex[best].clone();
                for (i, corner) in simplex.iter_mut().enumerate() {
                    if i == best {
                        continue;
                    }
                    for (x, b) in corner.iter_mut().zip(best_corner.iter()) {
                        *x = b + 0.5 * (*x - b);
                    }
                    values[i] = f(corner);
                    *iterations += 1;
                }
            }
        }
    }

    let mut best_index = 0;
    for (i, v) in values.iter().enumerate() {
        if *v < values[best_index] {
            best_index = i;
        }
    }
    RunOutcome {
        parameters: simplex.swap_remove(best_index),
        value: values[best_index],
        converged,
    }
}

/// `centroid + t * (point - centroid)`.
fn blend(centroid: &[f64], point: &[f64], t: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(point.iter())
        .map(|(c, p)| c + t * (p - c))
        .collect()
}
