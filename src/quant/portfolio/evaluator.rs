//! # Portfolio Evaluator
//!
//! $$
//! r^p_t=\sum_i w_i r_{t,i},\qquad
//! S(\mathbf w)=\frac{\hat\mu_a(r^p)-r_f^{a}}{\hat\sigma_a(r^p)+\varepsilon}
//! $$
//!
//! Maps a weight vector and a return table to a fresh [`RiskStats`].
//!
//! Drawdown and CAGR are taken from a growth proxy `G_t = \prod_{s\le t}(1 + r^p_s)`,
//! `t = 1..T`. The drawdown path starts at `G_1`, so a loss in the first
//! period is not a drawdown; CAGR uses the total factor `G_T` against a
//! starting level of 1. The proxy ignores the assets' real starting prices
//! and calendar gaps between rows, so both figures are approximations of
//! what a traded portfolio would show, not exact price-path statistics.

use ndarray::Array1;
use ndarray::ArrayView1;

use super::types::RiskStats;
use super::types::SHARPE_EPSILON;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::quant::RiskFreeRate;
use crate::quant::data::ReturnTable;
use crate::quant::metrics;
use crate::quant::returns::cumulative_growth;

/// Confidence level of the CVaR reported in [`RiskStats`].
pub const CVAR_ALPHA: f64 = 0.95;

/// Evaluates weight vectors against a fixed return table.
#[derive(Clone, Debug)]
pub struct PortfolioEvaluator<'a> {
  returns: &'a ReturnTable,
  risk_free: RiskFreeRate,
  periods_per_year: f64,
}

impl<'a> PortfolioEvaluator<'a> {
  pub fn new(returns: &'a ReturnTable, risk_free: RiskFreeRate, periods_per_year: f64) -> Result<Self> {
    if returns.n_periods() == 0 || returns.n_assets() == 0 {
      return Err(PortfolioError::InsufficientData(format!(
        "return table is {}x{}",
        returns.n_periods(),
        returns.n_assets()
      )));
    }
    if returns.has_missing() {
      return Err(PortfolioError::InvalidTable(
        "return table contains undefined rows; drop them before evaluating".into(),
      ));
    }

    Ok(Self {
      returns,
      risk_free,
      periods_per_year,
    })
  }

  pub fn n_assets(&self) -> usize {
    self.returns.n_assets()
  }

  pub fn returns(&self) -> &ReturnTable {
    self.returns
  }

  pub fn risk_free(&self) -> RiskFreeRate {
    self.risk_free
  }

  pub fn periods_per_year(&self) -> f64 {
    self.periods_per_year
  }

  /// Per-period portfolio returns for `weights`.
  pub fn portfolio_returns(&self, weights: &[f64]) -> Result<Array1<f64>> {
    if weights.len() != self.n_assets() {
      return Err(PortfolioError::DimensionMismatch {
        expected: self.n_assets(),
        actual: weights.len(),
      });
    }
    Ok(self.returns.returns().dot(&ArrayView1::from(weights)))
  }

  pub fn stats(&self, weights: &[f64]) -> Result<RiskStats> {
    let port = self.portfolio_returns(weights)?;
    let ppy = self.periods_per_year;

    let (ann_return, ann_vol) = metrics::annualize(&port, ppy);
    let sharpe = (ann_return - self.risk_free.annual(ppy)) / (ann_vol + SHARPE_EPSILON);

    let growth = cumulative_growth(&port.to_vec(), 1.0);
    let final_level = growth.last().copied().unwrap_or(1.0);
    let path = &growth[1..];

    let stats = RiskStats {
      ann_return,
      ann_vol,
      sharpe,
      cagr: metrics::cagr_from_growth(final_level, port.len(), ppy),
      max_drawdown: metrics::max_drawdown(path),
      cvar_95: metrics::cvar(&port, CVAR_ALPHA),
    };

    if stats.is_degenerate() {
      tracing::debug!(
        ann_return,
        ann_vol,
        "portfolio volatility below floor, sharpe ratio is floor-scaled"
      );
    }

    Ok(stats)
  }
}

/// One-shot evaluation of `weights` against `returns`.
pub fn portfolio_stats(
  weights: &[f64],
  returns: &ReturnTable,
  risk_free: RiskFreeRate,
  periods_per_year: f64,
) -> Result<RiskStats> {
  PortfolioEvaluator::new(returns, risk_free, periods_per_year)?.stats(weights)
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use chrono::NaiveDate;
  use ndarray::array;

  use super::*;
  use crate::quant::TRADING_DAYS;
  use crate::quant::data::PriceTable;
  use crate::quant::returns::ReturnMethod;
  use crate::quant::returns::to_returns;

  fn two_asset_returns() -> ReturnTable {
    let dates = (1..=4)
      .map(|d| NaiveDate::from_ymd_opt(2023, 6, d).unwrap())
      .collect();
    let prices = PriceTable::new(
      dates,
      vec!["A".into(), "B".into()],
      array![[100.0, 50.0], [101.0, 49.0], [102.0, 50.0], [101.0, 51.0]],
    )
    .unwrap();
    to_returns(&prices, ReturnMethod::Simple, true)
  }

  #[test]
  fn blended_stats_match_hand_computation() {
    let rets = two_asset_returns();
    let stats = portfolio_stats(&[0.5, 0.5], &rets, RiskFreeRate::PerPeriod(0.0), TRADING_DAYS).unwrap();

    let a = [0.01, 102.0 / 101.0 - 1.0, 101.0 / 102.0 - 1.0];
    let b = [-0.02, 50.0 / 49.0 - 1.0, 0.02];
    let blend: Vec<f64> = a.iter().zip(b.iter()).map(|(x, y)| 0.5 * x + 0.5 * y).collect();

    let mean = blend.iter().sum::<f64>() / 3.0;
    let var = blend.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 3.0;
    let ann_return = mean * TRADING_DAYS;
    let ann_vol = var.sqrt() * TRADING_DAYS.sqrt();

    assert_relative_eq!(stats.ann_return, ann_return, max_relative = 1e-12);
    assert_relative_eq!(stats.ann_vol, ann_vol, max_relative = 1e-12);
    assert_relative_eq!(stats.sharpe, ann_return / (ann_vol + 1e-12), max_relative = 1e-10);

    // path 0.995 -> ... only rises after the first period, so no drawdown
    assert_relative_eq!(blend[0], -0.005, epsilon = 1e-12);
    assert!(blend[1] > 0.0 && blend[2] > 0.0);
    assert_eq!(stats.max_drawdown, 0.0);

    // 5% tail of three points: q = min + 0.1 * (second - min), only the minimum is in it
    assert_relative_eq!(stats.cvar_95, 0.005, epsilon = 1e-12);

    let growth: f64 = blend.iter().map(|r| 1.0 + r).product();
    assert_relative_eq!(
      stats.cagr,
      growth.powf(TRADING_DAYS / 3.0) - 1.0,
      max_relative = 1e-10
    );
  }

  #[test]
  fn drawdown_path_starts_after_first_period() {
    let rets = ReturnTable::unnamed(array![[-0.10], [0.05], [-0.02], [0.01]]).unwrap();
    let stats = portfolio_stats(&[1.0], &rets, RiskFreeRate::default(), TRADING_DAYS).unwrap();

    // path 0.9, 0.945, 0.9261, 0.935361: the only decline is from the 0.945 peak
    assert_relative_eq!(stats.max_drawdown, 0.9261 / 0.945 - 1.0, epsilon = 1e-12);
    assert_relative_eq!(
      stats.cagr,
      (0.9_f64 * 1.05 * 0.98 * 1.01).powf(TRADING_DAYS / 4.0) - 1.0,
      max_relative = 1e-10
    );

    let falling = ReturnTable::unnamed(array![[-0.01], [-0.01]]).unwrap();
    let stats = portfolio_stats(&[1.0], &falling, RiskFreeRate::default(), TRADING_DAYS).unwrap();
    assert_relative_eq!(stats.max_drawdown, -0.01, epsilon = 1e-12);
  }

  #[test]
  fn annual_risk_free_is_subtracted_once() {
    let rets = two_asset_returns();
    let base = portfolio_stats(&[0.5, 0.5], &rets, RiskFreeRate::Annual(0.0), TRADING_DAYS).unwrap();
    let with_rf = portfolio_stats(&[0.5, 0.5], &rets, RiskFreeRate::Annual(0.05), TRADING_DAYS).unwrap();
    let per_period =
      portfolio_stats(&[0.5, 0.5], &rets, RiskFreeRate::PerPeriod(0.05 / TRADING_DAYS), TRADING_DAYS).unwrap();

    assert_relative_eq!(
      with_rf.sharpe,
      base.sharpe - 0.05 / (base.ann_vol + SHARPE_EPSILON),
      max_relative = 1e-10
    );
    assert_relative_eq!(with_rf.sharpe, per_period.sharpe, max_relative = 1e-10);
    assert_eq!(with_rf.ann_vol, base.ann_vol);
  }

  #[test]
  fn single_asset_weight_reproduces_asset_statistics() {
    let rets = two_asset_returns();
    let stats = portfolio_stats(&[1.0, 0.0], &rets, RiskFreeRate::default(), 12.0).unwrap();
    let (mu, vol) = metrics::annualize(rets.column(0), 12.0);

    assert_relative_eq!(stats.ann_return, mu, epsilon = 1e-14);
    assert_relative_eq!(stats.ann_vol, vol, epsilon = 1e-14);
    assert_relative_eq!(stats.cvar_95, metrics::cvar(rets.column(0), 0.95), epsilon = 1e-14);
  }

  #[test]
  fn zero_volatility_is_absorbed_by_floor() {
    let rets = ReturnTable::unnamed(array![[0.001], [0.001], [0.001]]).unwrap();
    let stats = portfolio_stats(&[1.0], &rets, RiskFreeRate::default(), TRADING_DAYS).unwrap();

    assert!(stats.is_degenerate());
    assert!(stats.sharpe.is_finite());
    assert!(stats.sharpe > 0.0);
    assert_eq!(stats.max_drawdown, 0.0);
  }

  #[test]
  fn all_cash_portfolio_has_zero_sharpe() {
    let rets = ReturnTable::unnamed(array![[0.0, 0.01], [0.0, -0.01]]).unwrap();
    let stats = portfolio_stats(&[1.0, 0.0], &rets, RiskFreeRate::default(), TRADING_DAYS).unwrap();

    assert!(stats.is_degenerate());
    assert_eq!(stats.sharpe, 0.0);
  }

  #[test]
  fn rejects_mismatched_weights_and_missing_rows() {
    let rets = two_asset_returns();
    assert!(matches!(
      portfolio_stats(&[1.0], &rets, RiskFreeRate::default(), TRADING_DAYS),
      Err(PortfolioError::DimensionMismatch {
        expected: 2,
        actual: 1
      })
    ));

    let dates = (1..=3)
      .map(|d| NaiveDate::from_ymd_opt(2023, 6, d).unwrap())
      .collect();
    let prices = PriceTable::new(dates, vec!["A".into()], array![[1.0], [1.1], [1.2]]).unwrap();
    let undropped = to_returns(&prices, ReturnMethod::Simple, false);
    assert!(matches!(
      PortfolioEvaluator::new(&undropped, RiskFreeRate::default(), TRADING_DAYS),
      Err(PortfolioError::InvalidTable(_))
    ));

    let empty = ReturnTable::unnamed(ndarray::Array2::zeros((0, 2))).unwrap();
    assert!(matches!(
      PortfolioEvaluator::new(&empty, RiskFreeRate::default(), TRADING_DAYS),
      Err(PortfolioError::InsufficientData(_))
    ));
  }
}
