//! # Portfolio
//!
//! $$
//! \mathbf w^\*=\arg\max_{\mathbf w\in\mathcal W}\frac{\mu_p(\mathbf w)-r_f}{\sigma_p(\mathbf w)}
//! $$
//!
//! Weight evaluation and long-only, bounded maximum-Sharpe optimization.

pub mod engine;
pub mod evaluator;
pub mod optimizer;
pub mod solver;
pub mod types;

pub use engine::AssetSummary;
pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use evaluator::portfolio_stats;
pub use evaluator::PortfolioEvaluator;
pub use optimizer::OptimizerConfig;
pub use optimizer::SharpeOptimizer;
pub use solver::ConstrainedMinimizer;
pub use solver::MinimizerOutcome;
pub use solver::NelderMeadPenalty;
pub use solver::Objective;
pub use solver::ProjectedGradient;
pub use types::Bounds;
pub use types::OptimizationReport;
pub use types::RiskStats;
pub use types::Termination;
pub use types::SHARPE_EPSILON;
