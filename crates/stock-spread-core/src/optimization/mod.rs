pub mod covariance_model;
pub mod optimizer;
pub mod qp;
pub mod risk_target;

pub use covariance_model::CovarianceModel;
pub use optimizer::{OptimizedPortfolio, PortfolioOptimizer};
pub use qp::{ActiveSetSolver, QpSolution, QuadraticProgram};
pub use risk_target::RiskTargetMapper;
