pub mod config;
pub mod error;
pub mod repository;
pub mod types;

#[cfg(feature = "emi")]
pub mod emi;

#[cfg(feature = "insights")]
pub mod insights;

#[cfg(feature = "spending")]
pub mod spending;

#[cfg(feature = "budget")]
pub mod budget;

pub use config::EngineConfig;
pub use error::CardFinanceError;
pub use types::*;

/// Standard result type for all card-finance operations
pub type CardFinanceResult<T> = Result<T, CardFinanceError>;
