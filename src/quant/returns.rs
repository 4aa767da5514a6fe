//! # Returns
//!
//! $$
//! r_t^{\text{simple}}=\frac{P_t}{P_{t-1}}-1,\qquad
//! r_t^{\text{log}}=\ln P_t-\ln P_{t-1}
//! $$
//!
//! Price-to-return transforms for single series and whole tables.

use std::fmt::Display;
use std::str::FromStr;

use ndarray::Array2;
use ndarray::Zip;
use ndarray::s;

use super::data::PriceTable;
use super::data::ReturnTable;
use crate::error::PortfolioError;

/// Return transform.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReturnMethod {
  #[default]
  Simple,
  Log,
}

impl ReturnMethod {
  /// Return over a single step from `prev` to `curr`.
  #[must_use]
  pub fn step(&self, prev: f64, curr: f64) -> f64 {
    match self {
      Self::Simple => curr / prev - 1.0,
      Self::Log => curr.ln() - prev.ln(),
    }
  }
}

impl FromStr for ReturnMethod {
  type Err = PortfolioError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "simple" => Ok(Self::Simple),
      "log" => Ok(Self::Log),
      _ => Err(PortfolioError::InvalidMethod(s.to_string())),
    }
  }
}

impl Display for ReturnMethod {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Simple => write!(f, "simple"),
      Self::Log => write!(f, "log"),
    }
  }
}

/// Transform a price table into a return table.
///
/// With `drop_first` the undefined first row is removed and the result has
/// `T - 1` rows; otherwise the first row is kept as NaN.
pub fn to_returns(prices: &PriceTable, method: ReturnMethod, drop_first: bool) -> ReturnTable {
  let p = prices.prices();
  let (rows, cols) = p.dim();

  let mut out = Array2::from_elem((rows, cols), f64::NAN);
  Zip::from(out.slice_mut(s![1.., ..]))
    .and(p.slice(s![..-1, ..]))
    .and(p.slice(s![1.., ..]))
    .for_each(|r, &prev, &curr| *r = method.step(prev, curr));

  tracing::debug!(%method, rows, cols, drop_first, "computed return table");

  if drop_first {
    ReturnTable::from_parts(
      prices.dates()[1..].to_vec(),
      prices.assets().to_vec(),
      out.slice(s![1.., ..]).to_owned(),
    )
  } else {
    ReturnTable::from_parts(prices.dates().to_vec(), prices.assets().to_vec(), out)
  }
}

/// Simple returns of a single price series (first observation dropped).
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
  prices
    .windows(2)
    .map(|w| ReturnMethod::Simple.step(w[0], w[1]))
    .collect()
}

/// Log returns of a single price series (first observation dropped).
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
  prices
    .windows(2)
    .map(|w| ReturnMethod::Log.step(w[0], w[1]))
    .collect()
}

/// Rebuild a value path from simple returns, starting at `start`.
///
/// The output has one more element than `returns`.
pub fn cumulative_growth(returns: &[f64], start: f64) -> Vec<f64> {
  let mut out = Vec::with_capacity(returns.len() + 1);
  out.push(start);
  let mut level = start;
  for r in returns {
    level *= 1.0 + r;
    out.push(level);
  }
  out
}
