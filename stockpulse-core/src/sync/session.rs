//! Per-company session state.

use super::store::SeriesStore;
use crate::domain::{Company, CompanyId, SessionId, TimerHandle, UpstreamStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sync state of a company session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncState {
    /// Created or torn down; nothing in flight, nothing scheduled.
    Idle,
    /// A fetch is outstanding.
    Fetching,
    /// A follow-up fetch is scheduled.
    Waiting,
    /// Upstream finished; no more work.
    Completed,
    /// A fetch failed; no more work.
    Failed,
}

impl SyncState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SyncState::Completed | SyncState::Failed)
    }

    /// Whether a fetch may be started from this state.
    pub fn can_fetch(self) -> bool {
        matches!(self, SyncState::Idle | SyncState::Waiting)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncState::Idle => "idle",
            SyncState::Fetching => "fetching",
            SyncState::Waiting => "waiting",
            SyncState::Completed => "completed",
            SyncState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What a scheduled timer will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PollKind {
    /// Nothing new arrived; request the same window again.
    Retry,
    /// New samples arrived; request everything from the watermark on.
    Incremental,
}

/// One outstanding request, as handed out by `SyncController::begin_fetch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub session: SessionId,
    pub company_id: CompanyId,
    /// Lower bound (inclusive); `None` requests the full history.
    pub since: Option<DateTime<Utc>>,
}

impl FetchRequest {
    pub fn is_incremental(&self) -> bool {
        self.since.is_some()
    }
}

/// State owned for one selected company during the lifetime of the view.
#[derive(Debug, Clone)]
pub struct CompanySession {
    pub(crate) id: SessionId,
    pub(crate) company_id: CompanyId,
    pub(crate) series: SeriesStore,
    pub(crate) state: SyncState,
    pub(crate) pending_timer: Option<TimerHandle>,
    pub(crate) loading: bool,
    pub(crate) company: Option<Company>,
    pub(crate) last_status: Option<UpstreamStatus>,
    pub(crate) placeholder: bool,
    pub(crate) last_error: Option<String>,
}

impl CompanySession {
    pub(crate) fn new(id: SessionId, company_id: CompanyId) -> Self {
        Self {
            id,
            company_id,
            series: SeriesStore::new(),
            state: SyncState::Idle,
            pending_timer: None,
            loading: false,
            company: None,
            last_status: None,
            placeholder: false,
            last_error: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn company_id(&self) -> &CompanyId {
        &self.company_id
    }

    pub fn series(&self) -> &SeriesStore {
        &self.series
    }

    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.series.watermark()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn pending_timer(&self) -> Option<TimerHandle> {
        self.pending_timer
    }

    /// Loading indicator: set while a full-history fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Company metadata from the latest dashboard response.
    pub fn company(&self) -> Option<&Company> {
        self.company.as_ref()
    }

    /// Whether the empty-series placeholder was shown.
    pub fn showed_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Request shape for the next fetch.
    pub(crate) fn next_request(&self) -> FetchRequest {
        FetchRequest {
            session: self.id,
            company_id: self.company_id.clone(),
            since: self.series.watermark(),
        }
    }
}
