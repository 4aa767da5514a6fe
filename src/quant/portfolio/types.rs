//! # Portfolio Types
//!
//! $$
//! \mathcal W=\{\mathbf w\in\mathbb R^N : l_i\le w_i\le u_i,\ \textstyle\sum_i w_i=1\}
//! $$
//!
//! Shared records for portfolio evaluation and optimization, and the
//! feasible-set geometry (validation, projection, violation) the solvers
//! work against.

use std::fmt::Display;

use crate::error::PortfolioError;
use crate::error::Result;

/// Floor added to annualized volatility in the portfolio Sharpe ratio.
pub const SHARPE_EPSILON: f64 = 1e-12;

const SUM_TOLERANCE: f64 = 1e-12;
const PROJECTION_ITERS: usize = 200;

/// Aggregate risk/return record for one evaluated weight vector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RiskStats {
  /// Annualized mean return.
  pub ann_return: f64,
  /// Annualized population volatility.
  pub ann_vol: f64,
  /// Annualized Sharpe ratio.
  pub sharpe: f64,
  /// Compound annual growth rate.
  pub cagr: f64,
  /// Maximum drawdown (`<= 0`).
  pub max_drawdown: f64,
  /// CVaR at 95%, positive loss.
  pub cvar_95: f64,
}

impl RiskStats {
  /// Whether volatility collapsed below [`SHARPE_EPSILON`], making the
  /// Sharpe ratio a ratio against the floor rather than a real risk.
  pub fn is_degenerate(&self) -> bool {
    self.ann_vol < SHARPE_EPSILON
  }
}

/// Per-asset weight bounds `[lower_i, upper_i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
  lower: Vec<f64>,
  upper: Vec<f64>,
}

impl Bounds {
  /// Build bounds from `(lower, upper)` pairs.
  pub fn new(pairs: &[(f64, f64)]) -> Result<Self> {
    for (i, &(lo, hi)) in pairs.iter().enumerate() {
      if !lo.is_finite() || !hi.is_finite() {
        return Err(PortfolioError::InvalidBounds(format!(
          "bound {i} is not finite: ({lo}, {hi})"
        )));
      }
      if lo > hi {
        return Err(PortfolioError::InvalidBounds(format!(
          "bound {i} has lower {lo} above upper {hi}"
        )));
      }
    }

    Ok(Self {
      lower: pairs.iter().map(|p| p.0).collect(),
      upper: pairs.iter().map(|p| p.1).collect(),
    })
  }

  /// Same `[lower, upper]` for every asset.
  pub fn uniform(n: usize, lower: f64, upper: f64) -> Result<Self> {
    Self::new(&vec![(lower, upper); n])
  }

  /// `[0, 1]` for every asset.
  pub fn long_only(n: usize) -> Self {
    Self {
      lower: vec![0.0; n],
      upper: vec![1.0; n],
    }
  }

  /// Number of assets the bounds cover.
  pub fn len(&self) -> usize {
    self.lower.len()
  }

  /// Whether no asset is bounded.
  pub fn is_empty(&self) -> bool {
    self.lower.is_empty()
  }

  /// Lower bound per asset.
  pub fn lower(&self) -> &[f64] {
    &self.lower
  }

  /// Upper bound per asset.
  pub fn upper(&self) -> &[f64] {
    &self.upper
  }

  /// Check the bounds describe a non-empty feasible set for `n` assets.
  pub fn validate_for(&self, n: usize) -> Result<()> {
    if self.len() != n {
      return Err(PortfolioError::InvalidBounds(format!(
        "{} bounds supplied for {n} assets",
        self.len()
      )));
    }

    let lo_sum: f64 = self.lower.iter().sum();
    let hi_sum: f64 = self.upper.iter().sum();
    if lo_sum > 1.0 + SUM_TOLERANCE || hi_sum < 1.0 - SUM_TOLERANCE {
      return Err(PortfolioError::InvalidBounds(format!(
        "no fully invested portfolio fits: lower bounds sum to {lo_sum}, upper bounds to {hi_sum}"
      )));
    }

    Ok(())
  }

  /// Euclidean projection onto `{lower <= w <= upper, sum(w) = 1}`.
  ///
  /// The projection has the form `clamp(v_i - tau, l_i, u_i)`; `tau` is found
  /// by bisection since the clamped sum is non-increasing in it. Requires
  /// [`Bounds::validate_for`] to have passed.
  pub fn project(&self, v: &[f64]) -> Vec<f64> {
    let clamped = |tau: f64| -> Vec<f64> {
      v.iter()
        .zip(self.lower.iter().zip(self.upper.iter()))
        .map(|(&x, (&lo, &hi))| (x - tau).clamp(lo, hi))
        .collect()
    };

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for ((&x, &l), &u) in v.iter().zip(self.lower.iter()).zip(self.upper.iter()) {
      lo = lo.min(x - u);
      hi = hi.max(x - l);
    }
    if !lo.is_finite() || !hi.is_finite() {
      return clamped(0.0);
    }

    for _ in 0..PROJECTION_ITERS {
      let mid = 0.5 * (lo + hi);
      if mid <= lo || mid >= hi {
        break;
      }
      let total: f64 = clamped(mid).iter().sum();
      if total > 1.0 {
        lo = mid;
      } else {
        hi = mid;
      }
    }

    clamped(0.5 * (lo + hi))
  }

  /// Largest of `|sum(w) - 1|` and the worst bound breach.
  pub fn violation(&self, w: &[f64]) -> f64 {
    let sum_gap = (w.iter().sum::<f64>() - 1.0).abs();
    w.iter()
      .zip(self.lower.iter().zip(self.upper.iter()))
      .map(|(&x, (&lo, &hi))| (lo - x).max(x - hi).max(0.0))
      .fold(sum_gap, f64::max)
  }
}

/// Why a minimizer stopped.
#[derive(Clone, Debug, PartialEq)]
pub enum Termination {
  /// Stationarity or objective tolerance reached.
  Converged,
  /// Iteration budget exhausted.
  MaxIterations,
  /// No step along the search direction decreased the objective.
  LineSearchFailed,
  /// Backend-specific stop reason.
  Other(String),
}

impl Termination {
  /// Whether the run stopped on a convergence criterion.
  pub fn is_converged(&self) -> bool {
    matches!(self, Self::Converged)
  }
}

impl Display for Termination {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Converged => write!(f, "converged"),
      Self::MaxIterations => write!(f, "maximum iterations reached"),
      Self::LineSearchFailed => write!(f, "line search failed"),
      Self::Other(reason) => write!(f, "{reason}"),
    }
  }
}

/// Output of a Sharpe optimization run.
#[derive(Clone, Debug)]
pub struct OptimizationReport {
  /// Asset names, aligned with `weights`.
  pub assets: Vec<String>,
  /// Final iterate of the selected run.
  pub weights: Vec<f64>,
  /// Statistics at `weights`.
  pub stats: RiskStats,
  /// Sharpe ratio at the (projected) initial guess.
  pub initial_sharpe: f64,
  /// Iterations of the selected run.
  pub iterations: u64,
  /// Objective evaluations of the selected run.
  pub evaluations: u64,
  /// See [`Bounds::violation`].
  pub constraint_violation: f64,
  pub termination: Termination,
  /// Number of starting points tried.
  pub starts: usize,
}

impl OptimizationReport {
  /// Whether the selected run converged.
  pub fn converged(&self) -> bool {
    self.termination.is_converged()
  }

  /// Weight assigned to `asset`, if present.
  pub fn weight_of(&self, asset: &str) -> Option<f64> {
    self
      .assets
      .iter()
      .position(|a| a == asset)
      .map(|i| self.weights[i])
  }
}
