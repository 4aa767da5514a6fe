//! # Quant
//!
//! $$
//! S(\mathbf{w})=\frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Return transforms, risk metrics and Sharpe-ratio portfolio construction.

use std::fmt::Display;

pub mod data;
pub mod metrics;
pub mod portfolio;
pub mod returns;

/// Default number of trading periods per year (daily bars).
pub const TRADING_DAYS: f64 = 252.0;

/// Risk-free rate with an explicit unit.
///
/// Every interface that consumes a risk-free rate takes this type, so the
/// per-period vs. annual distinction is never implied by a call site.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RiskFreeRate {
  /// Rate earned over a single sampling period.
  PerPeriod(f64),
  /// Annualized rate.
  Annual(f64),
}

impl Default for RiskFreeRate {
  fn default() -> Self {
    Self::PerPeriod(0.0)
  }
}

impl RiskFreeRate {
  /// Rate per sampling period.
  #[must_use]
  pub fn per_period(&self, periods_per_year: f64) -> f64 {
    match *self {
      Self::PerPeriod(r) => r,
      Self::Annual(r) => r / periods_per_year,
    }
  }

  /// Annualized rate.
  #[must_use]
  pub fn annual(&self, periods_per_year: f64) -> f64 {
    match *self {
      Self::PerPeriod(r) => r * periods_per_year,
      Self::Annual(r) => r,
    }
  }
}

impl Display for RiskFreeRate {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::PerPeriod(r) => write!(f, "{r} per period"),
      Self::Annual(r) => write!(f, "{r} annual"),
    }
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn risk_free_conversions_are_inverse() {
    let annual = RiskFreeRate::Annual(0.0504);
    assert_relative_eq!(annual.per_period(TRADING_DAYS), 0.0002, epsilon = 1e-15);
    assert_relative_eq!(annual.annual(TRADING_DAYS), 0.0504);

    let per_period = RiskFreeRate::PerPeriod(0.0002);
    assert_relative_eq!(per_period.annual(TRADING_DAYS), 0.0504, epsilon = 1e-15);
    assert_relative_eq!(per_period.per_period(TRADING_DAYS), 0.0002);
  }
}
