pub mod config;
pub mod data;
pub mod error;
pub mod types;

#[cfg(feature = "estimation")]
pub mod estimation;

#[cfg(feature = "optimization")]
pub mod optimization;

#[cfg(all(feature = "estimation", feature = "optimization"))]
pub mod result;

#[cfg(all(feature = "estimation", feature = "optimization"))]
pub mod allocation;

pub use error::SpreadError;
pub use types::*;

/// Standard result type for this crate
pub type SpreadResult<T> = Result<T, SpreadError>;
