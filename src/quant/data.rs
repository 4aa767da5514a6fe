//! # Price and Return Tables
//!
//! $$
//! P\in\mathbb R_{>0}^{T\times N},\qquad R\in\mathbb R^{(T-1)\times N}
//! $$
//!
//! Time-indexed tables consumed by the return transforms and the portfolio
//! optimizer. Loading and cleaning happen outside this crate; the
//! constructors only check the contract the statistics rely on.

use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Axis;

use crate::error::PortfolioError;
use crate::error::Result;

/// Asset prices indexed by strictly ascending unique dates.
#[derive(Clone, Debug)]
pub struct PriceTable {
  dates: Vec<NaiveDate>,
  assets: Vec<String>,
  prices: Array2<f64>,
}

impl PriceTable {
  /// Build a table from a `T x N` price matrix.
  pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, prices: Array2<f64>) -> Result<Self> {
    let (rows, cols) = prices.dim();

    if rows < 2 {
      return Err(PortfolioError::InvalidTable(format!(
        "at least two observations are required, got {rows}"
      )));
    }
    if cols == 0 {
      return Err(PortfolioError::InvalidTable("no asset columns".into()));
    }
    if dates.len() != rows {
      return Err(PortfolioError::InvalidTable(format!(
        "{} dates for {rows} price rows",
        dates.len()
      )));
    }
    if assets.len() != cols {
      return Err(PortfolioError::InvalidTable(format!(
        "{} asset names for {cols} price columns",
        assets.len()
      )));
    }
    if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
      return Err(PortfolioError::InvalidTable(format!(
        "dates must be strictly ascending, found {} followed by {}",
        pair[0], pair[1]
      )));
    }
    if let Some(((t, i), p)) = prices
      .indexed_iter()
      .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
      return Err(PortfolioError::InvalidTable(format!(
        "price for '{}' on {} must be finite and positive, got {p}",
        assets[i], dates[t]
      )));
    }

    Ok(Self {
      dates,
      assets,
      prices,
    })
  }

  /// Build a table from named price columns of equal length.
  pub fn from_columns(dates: Vec<NaiveDate>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
    let rows = dates.len();
    let cols = columns.len();
    let mut prices = Array2::zeros((rows, cols));
    let mut assets = Vec::with_capacity(cols);

    for (j, (name, series)) in columns.into_iter().enumerate() {
      if series.len() != rows {
        return Err(PortfolioError::InvalidTable(format!(
          "column '{name}' has {} prices for {rows} dates",
          series.len()
        )));
      }
      prices.column_mut(j).assign(&ArrayView1::from(series.as_slice()));
      assets.push(name);
    }

    Self::new(dates, assets, prices)
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn prices(&self) -> ArrayView2<'_, f64> {
    self.prices.view()
  }

  /// Price series of a single asset.
  pub fn series(&self, asset: usize) -> ArrayView1<'_, f64> {
    self.prices.column(asset)
  }

  pub fn n_periods(&self) -> usize {
    self.prices.nrows()
  }

  pub fn n_assets(&self) -> usize {
    self.prices.ncols()
  }
}

/// Per-period asset returns. Immutable once derived.
#[derive(Clone, Debug)]
pub struct ReturnTable {
  dates: Vec<NaiveDate>,
  assets: Vec<String>,
  returns: Array2<f64>,
}

impl ReturnTable {
  /// Wrap a raw `T x N` return matrix that carries no dates.
  pub fn new(assets: Vec<String>, returns: Array2<f64>) -> Result<Self> {
    if assets.len() != returns.ncols() {
      return Err(PortfolioError::InvalidTable(format!(
        "{} asset names for {} return columns",
        assets.len(),
        returns.ncols()
      )));
    }
    if returns.iter().any(|r| !r.is_finite()) {
      return Err(PortfolioError::InvalidTable(
        "returns must be finite".into(),
      ));
    }

    Ok(Self {
      dates: Vec::new(),
      assets,
      returns,
    })
  }

  /// Wrap a raw return matrix, naming the columns `asset_0..asset_{N-1}`.
  pub fn unnamed(returns: Array2<f64>) -> Result<Self> {
    let assets = (0..returns.ncols()).map(|i| format!("asset_{i}")).collect();
    Self::new(assets, returns)
  }

  pub(crate) fn from_parts(dates: Vec<NaiveDate>, assets: Vec<String>, returns: Array2<f64>) -> Self {
    Self {
      dates,
      assets,
      returns,
    }
  }

  /// Dates of the return rows; empty for tables built from raw matrices.
  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn returns(&self) -> ArrayView2<'_, f64> {
    self.returns.view()
  }

  pub fn column(&self, asset: usize) -> ArrayView1<'_, f64> {
    self.returns.column(asset)
  }

  pub fn n_periods(&self) -> usize {
    self.returns.nrows()
  }

  pub fn n_assets(&self) -> usize {
    self.returns.ncols()
  }

  /// Whether any row is undefined (the kept first row of an undropped transform).
  pub fn has_missing(&self) -> bool {
    self.returns.iter().any(|r| r.is_nan())
  }

  /// Copy of the table without rows that contain undefined values.
  pub fn dropna(&self) -> Self {
    let keep: Vec<usize> = self
      .returns
      .axis_iter(Axis(0))
      .enumerate()
      .filter(|(_, row)| row.iter().all(|r| !r.is_nan()))
      .map(|(t, _)| t)
      .collect();

    let dates = if self.dates.is_empty() {
      Vec::new()
    } else {
      keep.iter().map(|&t| self.dates[t]).collect()
    };

    Self {
      dates,
      assets: self.assets.clone(),
      returns: self.returns.select(Axis(0), &keep),
    }
  }
}

#[cfg(test)]
mod tests {
  use ndarray::array;

  use super::*;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
  }

  #[test]
  fn price_table_rejects_unsorted_dates() {
    let err = PriceTable::new(
      vec![day(2), day(1), day(3)],
      vec!["A".into()],
      array![[1.0], [2.0], [3.0]],
    )
    .unwrap_err();

    assert!(matches!(err, PortfolioError::InvalidTable(_)));
  }

  #[test]
  fn price_table_rejects_duplicate_dates_and_non_positive_prices() {
    let dup = PriceTable::new(
      vec![day(1), day(1)],
      vec!["A".into()],
      array![[1.0], [2.0]],
    );
    assert!(dup.is_err());

    let negative = PriceTable::new(
      vec![day(1), day(2)],
      vec!["A".into()],
      array![[1.0], [-2.0]],
    );
    assert!(matches!(negative, Err(PortfolioError::InvalidTable(_))));
  }

  #[test]
  fn from_columns_builds_wide_table() {
    let table = PriceTable::from_columns(
      vec![day(1), day(2), day(3)],
      vec![
        ("A".into(), vec![100.0, 101.0, 102.0]),
        ("B".into(), vec![50.0, 49.0, 50.0]),
      ],
    )
    .unwrap();

    assert_eq!(table.n_periods(), 3);
    assert_eq!(table.n_assets(), 2);
    assert_eq!(table.series(1).to_vec(), vec![50.0, 49.0, 50.0]);
  }

  #[test]
  fn from_columns_rejects_ragged_columns() {
    let err = PriceTable::from_columns(
      vec![day(1), day(2)],
      vec![("A".into(), vec![1.0, 2.0, 3.0])],
    )
    .unwrap_err();
    assert!(err.to_string().contains("column 'A'"));
  }

  #[test]
  fn dropna_removes_undefined_rows() {
    let table = ReturnTable::from_parts(
      vec![day(1), day(2), day(3)],
      vec!["A".into()],
      array![[f64::NAN], [0.01], [0.02]],
    );
    assert!(table.has_missing());

    let clean = table.dropna();
    assert!(!clean.has_missing());
    assert_eq!(clean.n_periods(), 2);
    assert_eq!(clean.dates(), &[day(2), day(3)]);
  }

  #[test]
  fn raw_return_table_rejects_non_finite_values() {
    assert!(ReturnTable::unnamed(array![[0.01, f64::INFINITY]]).is_err());
    assert!(ReturnTable::new(vec!["A".into()], array![[0.01, 0.02]]).is_err());
  }
}
