//! # Sharpe Optimizer
//!
//! $$
//! \mathbf w^\*=\arg\min_{\mathbf w\in\mathcal W} -S(\mathbf w)
//! $$
//!
//! Maximizes the portfolio Sharpe ratio from [`PortfolioEvaluator`] over the
//! bounded, fully invested weight set. The result is a local optimum
//! reachable from the starting point(s); the Sharpe ratio is not concave in
//! the weights, so no global optimality is claimed.

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use super::evaluator::PortfolioEvaluator;
use super::solver::ConstrainedMinimizer;
use super::solver::MinimizerOutcome;
use super::solver::ProjectedGradient;
use super::types::Bounds;
use super::types::OptimizationReport;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::quant::RiskFreeRate;
use crate::quant::TRADING_DAYS;
use crate::quant::data::ReturnTable;

/// Runtime configuration for [`SharpeOptimizer`].
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
  /// Sampling periods per year used for annualization.
  pub periods_per_year: f64,
  /// Starting points to try. `1` runs only the caller's (or equal-weight)
  /// guess; extra starts are seeded random feasible points.
  pub starts: usize,
  /// Seed for the extra starting points.
  pub seed: u64,
  /// Fail with [`PortfolioError::OptimizerNonConvergence`] instead of
  /// returning a non-converged report.
  pub strict: bool,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      periods_per_year: TRADING_DAYS,
      starts: 1,
      seed: 42,
      strict: false,
    }
  }
}

/// Sharpe-ratio maximizer over an injectable [`ConstrainedMinimizer`].
#[derive(Clone, Debug)]
pub struct SharpeOptimizer {
  solver: Arc<dyn ConstrainedMinimizer>,
  config: OptimizerConfig,
}

impl Default for SharpeOptimizer {
  fn default() -> Self {
    Self::new(OptimizerConfig::default())
  }
}

impl SharpeOptimizer {
  /// Optimizer backed by [`ProjectedGradient`].
  pub fn new(config: OptimizerConfig) -> Self {
    Self::with_solver(ProjectedGradient::default(), config)
  }

  pub fn with_solver<S: ConstrainedMinimizer + 'static>(solver: S, config: OptimizerConfig) -> Self {
    Self {
      solver: Arc::new(solver),
      config,
    }
  }

  pub fn config(&self) -> &OptimizerConfig {
    &self.config
  }

  pub fn solver(&self) -> &dyn ConstrainedMinimizer {
    self.solver.as_ref()
  }

  /// Find Sharpe-maximizing weights.
  ///
  /// `bounds` defaults to `[0, 1]` per asset and `x0` to equal weights. An
  /// infeasible `x0` is projected onto the feasible set first. Convergence
  /// is reported in the returned [`OptimizationReport`]; with
  /// [`OptimizerConfig::strict`] a non-converged run is an error.
  pub fn optimize(
    &self,
    returns: &ReturnTable,
    risk_free: RiskFreeRate,
    bounds: Option<&Bounds>,
    x0: Option<&[f64]>,
  ) -> Result<OptimizationReport> {
    let report = self.run(returns, risk_free, bounds, x0)?;
    if self.config.strict {
      ensure_converged(report)
    } else {
      Ok(report)
    }
  }

  /// Like [`SharpeOptimizer::optimize`], but a non-converged run is always an error.
  pub fn optimize_strict(
    &self,
    returns: &ReturnTable,
    risk_free: RiskFreeRate,
    bounds: Option<&Bounds>,
    x0: Option<&[f64]>,
  ) -> Result<OptimizationReport> {
    ensure_converged(self.run(returns, risk_free, bounds, x0)?)
  }

  fn run(
    &self,
    returns: &ReturnTable,
    risk_free: RiskFreeRate,
    bounds: Option<&Bounds>,
    x0: Option<&[f64]>,
  ) -> Result<OptimizationReport> {
    let evaluator = PortfolioEvaluator::new(returns, risk_free, self.config.periods_per_year)?;
    let n = evaluator.n_assets();

    let default_bounds;
    let bounds = match bounds {
      Some(b) => b,
      None => {
        default_bounds = Bounds::long_only(n);
        &default_bounds
      }
    };
    bounds.validate_for(n)?;

    let x0 = match x0 {
      Some(x) if x.len() != n => {
        return Err(PortfolioError::DimensionMismatch {
          expected: n,
          actual: x.len(),
        });
      }
      Some(x) => x.to_vec(),
      None => vec![1.0 / n as f64; n],
    };

    let start = bounds.project(&x0);
    let initial_sharpe = evaluator.stats(&start)?.sharpe;

    let objective = |w: &[f64]| -> anyhow::Result<f64> { Ok(-evaluator.stats(w)?.sharpe) };

    let starts = self.starting_points(start, bounds);
    tracing::debug!(
      solver = self.solver.name(),
      assets = n,
      periods = returns.n_periods(),
      starts = starts.len(),
      %risk_free,
      "starting sharpe optimization"
    );

    let outcomes = if starts.len() == 1 {
      vec![self.solver.minimize(&objective, &starts[0], bounds)?]
    } else {
      starts
        .par_iter()
        .map(|x| self.solver.minimize(&objective, x, bounds))
        .collect::<anyhow::Result<Vec<_>>>()?
    };

    let best = select_best(outcomes)
      .ok_or_else(|| PortfolioError::InsufficientData("no optimization run completed".into()))?;

    let stats = evaluator.stats(&best.x)?;
    let report = OptimizationReport {
      assets: returns.assets().to_vec(),
      constraint_violation: bounds.violation(&best.x),
      weights: best.x,
      stats,
      initial_sharpe,
      iterations: best.iterations,
      evaluations: best.evaluations,
      termination: best.termination,
      starts: starts.len(),
    };

    if report.converged() {
      tracing::info!(
        iterations = report.iterations,
        sharpe = report.stats.sharpe,
        initial_sharpe,
        violation = report.constraint_violation,
        "sharpe optimization converged"
      );
    } else {
      tracing::warn!(
        iterations = report.iterations,
        termination = %report.termination,
        violation = report.constraint_violation,
        "sharpe optimization did not converge"
      );
    }

    Ok(report)
  }

  fn starting_points(&self, start: Vec<f64>, bounds: &Bounds) -> Vec<Vec<f64>> {
    let extra = self.config.starts.saturating_sub(1);
    let mut rng = StdRng::seed_from_u64(self.config.seed);
    let mut points = Vec::with_capacity(extra + 1);
    points.push(start);

    for _ in 0..extra {
      let raw: Vec<f64> = bounds
        .lower()
        .iter()
        .zip(bounds.upper().iter())
        .map(|(&lo, &hi)| if hi > lo { rng.random_range(lo..hi) } else { lo })
        .collect();
      points.push(bounds.project(&raw));
    }

    points
  }
}

/// Converged runs beat non-converged ones, then lower cost wins. Ties keep
/// the earliest start, which keeps multi-start results deterministic.
fn select_best(outcomes: Vec<MinimizerOutcome>) -> Option<MinimizerOutcome> {
  outcomes.into_iter().reduce(|best, next| {
    let better = match (next.converged(), best.converged()) {
      (true, false) => true,
      (false, true) => false,
      _ => next.cost < best.cost,
    };
    if better {
      next
    } else {
      best
    }
  })
}

fn ensure_converged(report: OptimizationReport) -> Result<OptimizationReport> {
  if report.converged() {
    Ok(report)
  } else {
    Err(PortfolioError::OptimizerNonConvergence {
      iterations: report.iterations,
      constraint_violation: report.constraint_violation,
      reason: report.termination.to_string(),
    })
  }
}
