//! # sharpe-rs
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! \quad \text{s.t.}\quad \textstyle\sum_i w_i = 1,\ l_i \le w_i \le u_i
//! $$
//!
//! Risk/return statistics for asset return series and a constrained
//! Sharpe-ratio maximizer built on top of them.
//!
//! ```ignore
//! use sharpe_rs::quant::portfolio::PortfolioEngine;
//! use sharpe_rs::quant::portfolio::PortfolioEngineConfig;
//!
//! let engine = PortfolioEngine::new(PortfolioEngineConfig::default());
//! let report = engine.max_sharpe(&prices)?;
//! println!("{:?} sharpe={}", report.weights, report.stats.sharpe);
//! ```

pub mod error;
pub mod quant;

pub use error::PortfolioError;
pub use error::Result;
