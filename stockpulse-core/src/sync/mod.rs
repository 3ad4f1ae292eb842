//! Incremental sync: sessions, the series store, timers and the controller
//! that drives them.

pub mod clock;
pub mod controller;
pub mod selector;
pub mod session;
pub mod store;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{FetchOutcome, SyncController, SyncError};
pub use selector::{CompanySelector, Selection, SelectionError, NO_COMPANIES_MESSAGE};
pub use session::{CompanySession, FetchRequest, PollKind, SyncState};
pub use store::{SeriesError, SeriesStore};
pub use timer::{ScheduledTimer, TimerRegistry};
