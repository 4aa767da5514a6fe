//! # Constrained Minimizers
//!
//! $$
//! \min_{\mathbf w} f(\mathbf w)\quad \text{s.t.}\quad l\le \mathbf w\le u,\ \mathbf 1^\top\mathbf w=1
//! $$
//!
//! Local minimizers over the bounded, fully invested weight set. The Sharpe
//! optimizer only talks to [`ConstrainedMinimizer`], so backends can be
//! swapped without touching the evaluator.

use std::fmt::Debug;

use anyhow::Result;
use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::solver::neldermead::NelderMead;
use impl_new_derive::ImplNew;

use super::types::Bounds;
use super::types::Termination;

/// Objective evaluated on a candidate weight vector.
pub type Objective<'a> = dyn Fn(&[f64]) -> Result<f64> + Sync + 'a;

/// Result of one local minimization.
#[derive(Clone, Debug)]
pub struct MinimizerOutcome {
  /// Final iterate, feasible up to the projection tolerance.
  pub x: Vec<f64>,
  /// Objective at `x`.
  pub cost: f64,
  pub iterations: u64,
  pub evaluations: u64,
  pub termination: Termination,
}

impl MinimizerOutcome {
  pub fn converged(&self) -> bool {
    self.termination.is_converged()
  }
}

/// Bounded, equality-constrained local minimizer.
pub trait ConstrainedMinimizer: Send + Sync + Debug {
  /// Short backend name used in logs.
  fn name(&self) -> &'static str;

  /// Minimize `objective` from `x0` over the set described by `bounds`.
  ///
  /// `bounds` must already be validated for `x0.len()` assets.
  fn minimize(&self, objective: &Objective<'_>, x0: &[f64], bounds: &Bounds) -> Result<MinimizerOutcome>;
}

/// Projected gradient descent with Armijo backtracking along the projection arc.
///
/// Gradients are central finite differences. Iterates never leave the
/// feasible set, so the reported constraint violation is the projection's
/// numerical error.
#[derive(ImplNew, Clone, Debug)]
pub struct ProjectedGradient {
  pub max_iters: u64,
  /// Stop when `||P(x - grad) - x||_inf` falls below this.
  pub gtol: f64,
  /// Stop when an accepted step improves the objective by less than
  /// `ftol * max(1, |f|)`.
  pub ftol: f64,
  /// Relative finite-difference step.
  pub fd_step: f64,
  /// Sufficient-decrease constant.
  pub armijo: f64,
  pub max_backtracks: usize,
}

impl Default for ProjectedGradient {
  fn default() -> Self {
    Self {
      max_iters: 1000,
      gtol: 1e-8,
      ftol: 1e-12,
      fd_step: 1e-6,
      armijo: 1e-4,
      max_backtracks: 60,
    }
  }
}

impl ProjectedGradient {
  fn gradient(&self, objective: &Objective<'_>, x: &[f64], evaluations: &mut u64) -> Result<Vec<f64>> {
    let mut grad = vec![0.0; x.len()];
    let mut probe = x.to_vec();

    for i in 0..x.len() {
      let h = self.fd_step * x[i].abs().max(1.0);
      probe[i] = x[i] + h;
      let f_plus = objective(&probe)?;
      probe[i] = x[i] - h;
      let f_minus = objective(&probe)?;
      probe[i] = x[i];
      *evaluations += 2;
      grad[i] = (f_plus - f_minus) / (2.0 * h);
    }

    Ok(grad)
  }
}

fn step_along(x: &[f64], direction: &[f64], alpha: f64) -> Vec<f64> {
  x.iter()
    .zip(direction.iter())
    .map(|(xi, di)| xi - alpha * di)
    .collect()
}

fn sup_distance(a: &[f64], b: &[f64]) -> f64 {
  a.iter()
    .zip(b.iter())
    .map(|(x, y)| (x - y).abs())
    .fold(0.0, f64::max)
}

impl ConstrainedMinimizer for ProjectedGradient {
  fn name(&self) -> &'static str {
    "projected-gradient"
  }

  fn minimize(&self, objective: &Objective<'_>, x0: &[f64], bounds: &Bounds) -> Result<MinimizerOutcome> {
    let mut x = bounds.project(x0);
    let mut f = objective(&x)?;
    let mut evaluations = 1;
    let mut alpha = 1.0_f64;
    let mut iterations = 0;
    let mut termination = Termination::MaxIterations;

    if !f.is_finite() {
      anyhow::bail!("objective is not finite at the starting point: {f}");
    }

    while iterations < self.max_iters {
      iterations += 1;
      let grad = self.gradient(objective, &x, &mut evaluations)?;

      let pg_norm = sup_distance(&bounds.project(&step_along(&x, &grad, 1.0)), &x);
      if pg_norm <= self.gtol {
        termination = Termination::Converged;
        break;
      }

      let mut step = (2.0 * alpha).min(1e6);
      let mut accepted = None;
      for _ in 0..self.max_backtracks {
        let candidate = bounds.project(&step_along(&x, &grad, step));
        let f_candidate = objective(&candidate)?;
        evaluations += 1;

        let predicted: f64 = grad
          .iter()
          .zip(candidate.iter().zip(x.iter()))
          .map(|(g, (c, xi))| g * (c - xi))
          .sum();
        if f_candidate.is_finite() && f_candidate <= f + self.armijo * predicted {
          accepted = Some((candidate, f_candidate));
          break;
        }
        step *= 0.5;
      }

      let Some((candidate, f_candidate)) = accepted else {
        termination = Termination::LineSearchFailed;
        break;
      };

      let improvement = f - f_candidate;
      alpha = step;
      x = candidate;
      f = f_candidate;

      tracing::trace!(iterations, cost = f, pg_norm, step, "projected gradient step");

      if improvement <= self.ftol * f.abs().max(1.0) {
        termination = Termination::Converged;
        break;
      }
    }

    Ok(MinimizerOutcome {
      x,
      cost: f,
      iterations,
      evaluations,
      termination,
    })
  }
}

/// Nelder-Mead on an unconstrained parameter mapped through the feasible-set
/// projection, with a quadratic penalty on the projection distance.
#[derive(ImplNew, Clone, Debug)]
pub struct NelderMeadPenalty {
  pub max_iters: u64,
  /// Standard-deviation tolerance of the simplex cost values.
  pub sd_tolerance: f64,
  pub penalty: f64,
  /// Offset of the initial simplex vertices from the starting point.
  pub simplex_step: f64,
}

impl Default for NelderMeadPenalty {
  fn default() -> Self {
    Self {
      max_iters: 5000,
      sd_tolerance: 1e-12,
      penalty: 10.0,
      simplex_step: 0.05,
    }
  }
}

struct PenalizedCost<'a, 'b> {
  objective: &'a Objective<'b>,
  bounds: &'a Bounds,
  penalty: f64,
}

impl CostFunction for PenalizedCost<'_, '_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = self.bounds.project(x);
    let dist2: f64 = x.iter().zip(w.iter()).map(|(a, b)| (a - b).powi(2)).sum();
    Ok((self.objective)(&w)? + self.penalty * dist2)
  }
}

impl ConstrainedMinimizer for NelderMeadPenalty {
  fn name(&self) -> &'static str {
    "nelder-mead-penalty"
  }

  fn minimize(&self, objective: &Objective<'_>, x0: &[f64], bounds: &Bounds) -> Result<MinimizerOutcome> {
    let start = bounds.project(x0);
    let n = start.len();

    let mut simplex = Vec::with_capacity(n + 1);
    simplex.push(start.clone());
    for i in 0..n {
      let mut point = start.clone();
      point[i] += self.simplex_step;
      simplex.push(point);
    }

    let cost = PenalizedCost {
      objective,
      bounds,
      penalty: self.penalty,
    };
    let solver = NelderMead::new(simplex).with_sd_tolerance(self.sd_tolerance)?;
    let res = Executor::new(cost, solver)
      .configure(|state| state.max_iters(self.max_iters))
      .run()?;

    let state = res.state();
    let best = state.get_best_param().cloned().unwrap_or(start);
    let x = bounds.project(&best);
    let evaluations = state.get_func_counts().get("cost_count").copied().unwrap_or(0) + 1;

    let termination = match state.get_termination_reason() {
      Some(TerminationReason::SolverConverged) => Termination::Converged,
      Some(TerminationReason::MaxItersReached) => Termination::MaxIterations,
      Some(other) => Termination::Other(format!("{other:?}")),
      None => Termination::Other("not terminated".into()),
    };

    Ok(MinimizerOutcome {
      cost: objective(&x)?,
      x,
      iterations: state.get_iter(),
      evaluations,
      termination,
    })
  }
}
