//! # Risk Metrics
//!
//! $$
//! \hat\mu_a = m\,\bar r,\qquad \hat\sigma_a=\sqrt{m}\,\sqrt{\tfrac1T\textstyle\sum_t (r_t-\bar r)^2},
//! \qquad \operatorname{CVaR}_\alpha = -\mathbb E[r \mid r \le q_{1-\alpha}]
//! $$
//!
//! Pure statistics over return and price series. Volatility always uses the
//! population (ddof = 0) estimator so that samples of different length are
//! scaled consistently.

use chrono::NaiveDate;
use ndarray::Array1;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::AsArray;
use ndarray::Axis;
use ndarray_stats::QuantileExt;
use ordered_float::OrderedFloat;

use super::RiskFreeRate;
use crate::error::PortfolioError;
use crate::error::Result;

/// Calendar days per year used by [`cagr`].
pub const DAYS_PER_YEAR: f64 = 365.25;

fn mean(r: ArrayView1<f64>) -> f64 {
  r.mean().unwrap_or(f64::NAN)
}

fn population_std(r: ArrayView1<f64>) -> f64 {
  if r.is_empty() {
    f64::NAN
  } else {
    r.std(0.0)
  }
}

/// Annualized mean and volatility `(mean * m, std * sqrt(m))`.
pub fn annualize<'a, V: AsArray<'a, f64>>(returns: V, periods_per_year: f64) -> (f64, f64) {
  let r: ArrayView1<f64> = returns.into();
  (
    mean(r) * periods_per_year,
    population_std(r) * periods_per_year.sqrt(),
  )
}

/// Column-wise [`annualize`] for a `T x N` return table.
pub fn annualize_columns(returns: ArrayView2<f64>, periods_per_year: f64) -> (Array1<f64>, Array1<f64>) {
  let n = returns.ncols();
  if returns.nrows() == 0 {
    return (Array1::from_elem(n, f64::NAN), Array1::from_elem(n, f64::NAN));
  }

  let mu = returns
    .mean_axis(Axis(0))
    .unwrap_or_else(|| Array1::from_elem(n, f64::NAN))
    * periods_per_year;
  let vol = returns.std_axis(Axis(0), 0.0) * periods_per_year.sqrt();
  (mu, vol)
}

/// Annualized Sharpe ratio of the excess series `r_t - rf`.
///
/// No volatility floor is applied: a constant series yields an infinite or
/// NaN ratio. The guarded variant lives in the portfolio evaluator.
pub fn sharpe<'a, V: AsArray<'a, f64>>(returns: V, rf: RiskFreeRate, periods_per_year: f64) -> f64 {
  let r: ArrayView1<f64> = returns.into();
  let excess = &r - rf.per_period(periods_per_year);
  let (mu, vol) = annualize(&excess, periods_per_year);
  mu / vol
}

/// Per-asset Sharpe ratios; assets are treated independently.
pub fn sharpe_columns(returns: ArrayView2<f64>, rf: RiskFreeRate, periods_per_year: f64) -> Array1<f64> {
  let excess = &returns - rf.per_period(periods_per_year);
  let (mu, vol) = annualize_columns(excess.view(), periods_per_year);
  mu / vol
}

/// Compound annual growth rate between the first and last price.
///
/// Elapsed time is measured in calendar days over [`DAYS_PER_YEAR`].
pub fn cagr<'a, V: AsArray<'a, f64>>(dates: &[NaiveDate], prices: V) -> Result<f64> {
  let p: ArrayView1<f64> = prices.into();
  if dates.len() != p.len() {
    return Err(PortfolioError::DimensionMismatch {
      expected: dates.len(),
      actual: p.len(),
    });
  }
  if p.len() < 2 {
    return Err(PortfolioError::InsufficientData(
      "CAGR needs at least two prices".into(),
    ));
  }

  let days = (dates[dates.len() - 1] - dates[0]).num_days();
  if days <= 0 {
    return Err(PortfolioError::InsufficientData(format!(
      "CAGR needs a positive elapsed period, got {days} days"
    )));
  }

  let years = days as f64 / DAYS_PER_YEAR;
  Ok((p[p.len() - 1] / p[0]).powf(1.0 / years) - 1.0)
}

/// CAGR implied by a total growth factor over `periods` sampling periods.
pub fn cagr_from_growth(growth: f64, periods: usize, periods_per_year: f64) -> f64 {
  if periods == 0 {
    return f64::NAN;
  }
  growth.powf(periods_per_year / periods as f64) - 1.0
}

/// Drawdown path `P_t / max_{s<=t} P_s - 1`.
pub fn drawdowns<'a, V: AsArray<'a, f64>>(prices: V) -> Array1<f64> {
  let p: ArrayView1<f64> = prices.into();
  let mut peak = f64::NEG_INFINITY;
  p.iter()
    .map(|&x| {
      peak = peak.max(x);
      x / peak - 1.0
    })
    .collect()
}

/// Largest peak-to-trough decline. Always `<= 0`; zero for an empty or
/// non-decreasing series.
pub fn max_drawdown<'a, V: AsArray<'a, f64>>(prices: V) -> f64 {
  let p: ArrayView1<f64> = prices.into();
  if p.is_empty() {
    return 0.0;
  }
  *drawdowns(p).min_skipnan()
}

/// Empirical quantile with linear interpolation between order statistics.
///
/// Returns NaN for an empty sample or `q` outside `[0, 1]`.
pub fn quantile<'a, V: AsArray<'a, f64>>(returns: V, q: f64) -> f64 {
  let r: ArrayView1<f64> = returns.into();
  if r.is_empty() || !(0.0..=1.0).contains(&q) {
    return f64::NAN;
  }

  let mut sorted: Vec<OrderedFloat<f64>> = r.iter().copied().map(OrderedFloat).collect();
  sorted.sort_unstable();

  let h = (sorted.len() - 1) as f64 * q;
  let lo = h.floor() as usize;
  let hi = h.ceil() as usize;
  let (a, b) = (sorted[lo].0, sorted[hi].0);
  a + (h - lo as f64) * (b - a)
}

/// Historical value at risk reported as a positive loss.
pub fn value_at_risk<'a, V: AsArray<'a, f64>>(returns: V, alpha: f64) -> f64 {
  -quantile(returns, 1.0 - alpha)
}

/// Conditional value at risk reported as a positive loss.
///
/// The tail holds every observation at or below the `1 - alpha` quantile,
/// ties included.
pub fn cvar<'a, V: AsArray<'a, f64>>(returns: V, alpha: f64) -> f64 {
  let r: ArrayView1<f64> = returns.into();
  let q = quantile(r, 1.0 - alpha);
  if q.is_nan() {
    return f64::NAN;
  }

  let (sum, count) = r
    .iter()
    .filter(|&&x| x <= q)
    .fold((0.0, 0usize), |(s, c), &x| (s + x, c + 1));
  -(sum / count as f64)
}
