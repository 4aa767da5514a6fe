//! # Errors
//!
//! $$
//! \text{input} \mapsto \text{Ok}(\cdot) \ \vert\ \text{Err}(\text{PortfolioError})
//! $$
//!
//! Structural input problems fail fast; numerical edge cases are absorbed by
//! guards and surfaced through the returned statistics instead.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PortfolioError>;

#[derive(Debug, Error)]
pub enum PortfolioError {
  /// Unknown return-transform name.
  #[error("invalid return method '{0}', expected 'simple' or 'log'")]
  InvalidMethod(String),

  #[error("invalid bounds: {0}")]
  InvalidBounds(String),

  #[error("invalid price table: {0}")]
  InvalidTable(String),

  #[error("dimension mismatch: expected {expected}, got {actual}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("insufficient data: {0}")]
  InsufficientData(String),

  /// Raised only when the caller asks for strict convergence.
  #[error(
    "optimizer did not converge after {iterations} iterations \
     (constraint violation {constraint_violation:.3e}, reason: {reason})"
  )]
  OptimizerNonConvergence {
    iterations: u64,
    constraint_violation: f64,
    reason: String,
  },

  #[error(transparent)]
  Solver(#[from] anyhow::Error),
}
