//! Backend access: the DashboardApi seam and its implementations.

pub mod http;
pub mod provider;
pub mod simulated;

pub use http::HttpDashboardApi;
pub use provider::{ApiEnvelope, ApiError, DashboardApi, DashboardSnapshot, FALLBACK_MESSAGE};
pub use simulated::{SimulatedBackend, SimulationSettings};
