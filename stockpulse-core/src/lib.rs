//! StockPulse Core: incremental stock-dashboard sync engine.
//!
//! This crate contains everything below the command line:
//! - Domain types (companies, upstream status, samples, session and timer ids)
//! - The `DashboardApi` seam with HTTP and simulated backends
//! - Per-company session state and the append-only series store
//! - Sync controller: fetch, merge, then reschedule or stop
//! - Timer registry with at most one pending timer per session
//! - Chart frames and payload formats for the render boundary
//! - Dashboard view lifecycle (mount, switch, pump, unmount)

pub mod api;
pub mod config;
pub mod domain;
pub mod notify;
pub mod render;
pub mod rng;
pub mod sync;
pub mod testing;
pub mod view;

pub use api::{ApiError, DashboardApi, DashboardSnapshot, HttpDashboardApi, SimulatedBackend};
pub use config::{ConfigError, DashboardConfig};
pub use domain::{Company, CompanyId, Sample, SessionId, UpstreamStatus};
pub use notify::{LogNotifier, Notifier, RecordingNotifier};
pub use render::{ChartFormat, ChartFormatKind, ChartFrame, JsonLinesSink, RenderSink};
pub use sync::{FetchOutcome, SyncController, SyncError, SyncState};
pub use view::{DashboardView, ViewError};
