//! Domain types for StockPulse

pub mod company;
pub mod ids;
pub mod sample;

pub use company::{Company, CompanyId, CompanyStatus, UpstreamStatus};
pub use ids::{SessionId, TimerHandle};
pub use sample::Sample;
