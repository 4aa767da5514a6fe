//! # Portfolio Engine
//!
//! $$
//! P \xrightarrow{\ \text{returns}\ } R \xrightarrow{\ \arg\max S\ } \mathbf w^\*
//! $$
//!
//! High-level orchestration API: prices in, per-asset statistics and
//! Sharpe-maximizing weights out. Loading and cleaning the price table is the
//! caller's job.

use super::optimizer::OptimizerConfig;
use super::optimizer::SharpeOptimizer;
use super::solver::ConstrainedMinimizer;
use super::types::Bounds;
use super::types::OptimizationReport;
use super::types::RiskStats;
use crate::error::Result;
use crate::quant::RiskFreeRate;
use crate::quant::data::PriceTable;
use crate::quant::data::ReturnTable;
use crate::quant::metrics;
use crate::quant::returns::ReturnMethod;
use crate::quant::returns::to_returns;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug)]
pub struct PortfolioEngineConfig {
  /// Transform applied to prices.
  pub method: ReturnMethod,
  /// Risk-free rate used for every Sharpe computation.
  pub risk_free: RiskFreeRate,
  /// Per-asset `(lower, upper)` weight bounds; `[0, 1]` each when unset.
  pub bounds: Option<Vec<(f64, f64)>>,
  pub optimizer: OptimizerConfig,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      method: ReturnMethod::Simple,
      risk_free: RiskFreeRate::Annual(0.0),
      bounds: None,
      optimizer: OptimizerConfig::default(),
    }
  }
}

/// Statistics of a single asset computed from its own price history.
#[derive(Clone, Debug)]
pub struct AssetSummary {
  pub asset: String,
  pub stats: RiskStats,
}

/// Single entry-point engine for the price-to-weights workflow.
#[derive(Clone, Debug)]
pub struct PortfolioEngine {
  config: PortfolioEngineConfig,
  optimizer: SharpeOptimizer,
}

impl PortfolioEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: PortfolioEngineConfig) -> Self {
    let optimizer = SharpeOptimizer::new(config.optimizer.clone());
    Self { config, optimizer }
  }

  /// Construct an engine around a specific minimizer backend.
  pub fn with_solver<S: ConstrainedMinimizer + 'static>(config: PortfolioEngineConfig, solver: S) -> Self {
    let optimizer = SharpeOptimizer::with_solver(solver, config.optimizer.clone());
    Self { config, optimizer }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  /// Returns with the undefined first row dropped.
  pub fn returns(&self, prices: &PriceTable) -> ReturnTable {
    to_returns(prices, self.config.method, true)
  }

  /// Per-asset statistics. CAGR and drawdown use the real price path and
  /// calendar dates; the Sharpe ratio carries no volatility floor.
  pub fn asset_summary(&self, prices: &PriceTable) -> Result<Vec<AssetSummary>> {
    let returns = self.returns(prices);
    let ppy = self.config.optimizer.periods_per_year;

    prices
      .assets()
      .iter()
      .enumerate()
      .map(|(i, asset)| -> Result<AssetSummary> {
        let r = returns.column(i);
        let (ann_return, ann_vol) = metrics::annualize(r, ppy);
        Ok(AssetSummary {
          asset: asset.clone(),
          stats: RiskStats {
            ann_return,
            ann_vol,
            sharpe: metrics::sharpe(r, self.config.risk_free, ppy),
            cagr: metrics::cagr(prices.dates(), prices.series(i))?,
            max_drawdown: metrics::max_drawdown(prices.series(i)),
            cvar_95: metrics::cvar(r, 0.95),
          },
        })
      })
      .collect()
  }

  /// Sharpe-maximizing weights for `prices`, starting from equal weights.
  pub fn max_sharpe(&self, prices: &PriceTable) -> Result<OptimizationReport> {
    let returns = self.returns(prices);
    let bounds = self
      .config
      .bounds
      .as_deref()
      .map(Bounds::new)
      .transpose()?;

    self
      .optimizer
      .optimize(&returns, self.config.risk_free, bounds.as_ref(), None)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use chrono::Duration;
  use chrono::NaiveDate;
  use ndarray::Array2;

  use super::*;
  use crate::error::PortfolioError;
  use crate::quant::portfolio::solver::NelderMeadPenalty;

  /// Daily prices for a steady grower, a choppy flat asset and a decliner.
  fn prices() -> PriceTable {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let rows = 200;
    let dates = (0..rows).map(|t| start + Duration::days(t as i64)).collect();

    let drift = [0.0012, 0.0, -0.0008];
    let mut values = Array2::zeros((rows, 3));
    values.row_mut(0).assign(&ndarray::array![100.0, 50.0, 80.0]);
    for t in 1..rows {
      for k in 0..3 {
        let wiggle = if (t / (k + 1)) % 2 == 0 { 0.01 } else { -0.01 };
        values[[t, k]] = values[[t - 1, k]] * (1.0 + drift[k] + wiggle);
      }
    }

    PriceTable::new(dates, vec!["UP".into(), "FLAT".into(), "DOWN".into()], values).unwrap()
  }

  #[test]
  fn max_sharpe_prefers_trending_asset() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig::default());
    let report = engine.max_sharpe(&prices()).unwrap();

    assert!(report.converged());
    assert_eq!(report.assets, vec!["UP", "FLAT", "DOWN"]);
    assert!(report.weight_of("UP").unwrap() > 0.9, "{:?}", report.weights);
    assert!((report.weights.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    assert!(report.stats.sharpe >= report.initial_sharpe);
  }

  #[test]
  fn configured_bounds_are_applied() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig {
      bounds: Some(vec![(0.0, 0.5), (0.0, 1.0), (0.0, 1.0)]),
      risk_free: RiskFreeRate::Annual(0.03),
      ..PortfolioEngineConfig::default()
    });
    let report = engine.max_sharpe(&prices()).unwrap();

    assert!(report.weights[0] <= 0.5 + 1e-9);
    assert!(report.constraint_violation < 1e-6);
  }

  #[test]
  fn malformed_configured_bounds_are_rejected() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig {
      bounds: Some(vec![(0.5, 0.1), (0.0, 1.0), (0.0, 1.0)]),
      ..PortfolioEngineConfig::default()
    });
    assert!(matches!(
      engine.max_sharpe(&prices()),
      Err(PortfolioError::InvalidBounds(_))
    ));
  }

  #[test]
  fn asset_summary_uses_price_path() {
    let p = prices();
    let engine = PortfolioEngine::new(PortfolioEngineConfig::default());
    let summary = engine.asset_summary(&p).unwrap();

    assert_eq!(summary.len(), 3);
    assert_eq!(summary[2].asset, "DOWN");
    assert!(summary[0].stats.cagr > 0.0);
    assert!(summary[2].stats.cagr < 0.0);
    assert!(summary.iter().all(|s| s.stats.max_drawdown <= 0.0));
    assert_relative_eq!(
      summary[1].stats.max_drawdown,
      metrics::max_drawdown(p.series(1)),
      epsilon = 1e-15
    );
  }

  #[test]
  fn log_returns_engine_keeps_row_count() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig {
      method: ReturnMethod::Log,
      ..PortfolioEngineConfig::default()
    });
    let p = prices();
    assert_eq!(engine.returns(&p).n_periods(), p.n_periods() - 1);
  }

  #[test]
  fn engine_accepts_alternative_solver() {
    let engine = PortfolioEngine::with_solver(PortfolioEngineConfig::default(), NelderMeadPenalty::default());
    let report = engine.max_sharpe(&prices()).unwrap();

    assert!(report.constraint_violation < 1e-9);
    assert!(report.weight_of("UP").unwrap() > 0.8);
  }
}
