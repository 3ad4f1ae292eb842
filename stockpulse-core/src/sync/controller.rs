//! Sync controller: the fetch → merge → decide → (reschedule | stop) loop.
//!
//! State machine per session:
//!
//! ```text
//!   Idle ──begin_fetch──▶ Fetching ──ok, PROCESSING──▶ Waiting ──timer──▶ Fetching
//!                            │
//!                            ├──ok, COMPLETED / unset / unknown──▶ Completed
//!                            └──error or inconsistent batch──────▶ Failed
//!   any ──stop / start(other company)──▶ Idle (timers cancelled, session dropped)
//! ```
//!
//! A fetch is split into `begin_fetch` and `complete_fetch` so the request
//! itself can run anywhere; `tick` does both against the configured API.
//! Every response and every timer is tagged with its `SessionId` and is
//! ignored unless it matches the live session in the expected state.

use super::clock::{add_std, Clock};
use super::session::{CompanySession, FetchRequest, PollKind, SyncState};
use super::timer::TimerRegistry;
use crate::api::{ApiError, DashboardApi, DashboardSnapshot, FALLBACK_MESSAGE};
use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::domain::{Company, CompanyId, Sample, SessionId, TimerHandle, UpstreamStatus};
use crate::notify::Notifier;
use crate::render::{placeholder_points, ChartFrame, RenderSink};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("no active company session")]
    NoSession,

    #[error("a fetch is already in flight for session {0}")]
    FetchInFlight(SessionId),

    #[error("session {session} is {state}; no further fetches")]
    Finished { session: SessionId, state: SyncState },
}

/// What happened when a fetch completed.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Upstream still processing; a follow-up fetch is scheduled.
    Scheduled {
        kind: PollKind,
        appended: usize,
        handle: TimerHandle,
        due_at: DateTime<Utc>,
    },
    /// Upstream finished (or reported no usable status). Polling stopped.
    Completed { appended: usize, placeholder: bool },
    /// The fetch failed; the user was notified. Polling stopped.
    Failed { message: String },
    /// The response belonged to a superseded session and was dropped.
    Stale,
}

pub struct SyncController {
    api: Arc<dyn DashboardApi>,
    clock: Arc<dyn Clock>,
    renderer: Box<dyn RenderSink>,
    notifier: Arc<dyn Notifier>,
    poll_interval: Duration,
    timers: TimerRegistry<PollKind>,
    session: Option<CompanySession>,
    last_session: SessionId,
}

impl SyncController {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        clock: Arc<dyn Clock>,
        renderer: Box<dyn RenderSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            clock,
            renderer,
            notifier,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timers: TimerRegistry::new(),
            session: None,
            last_session: SessionId(0),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn api(&self) -> &Arc<dyn DashboardApi> {
        &self.api
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn session(&self) -> Option<&CompanySession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> Option<SyncState> {
        self.session.as_ref().map(|s| s.state)
    }

    pub fn timers(&self) -> &TimerRegistry<PollKind> {
        &self.timers
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    pub fn is_loading(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.loading)
    }

    /// No session, or the session reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.session.as_ref().map_or(true, |s| s.state.is_terminal())
    }

    /// Open a fresh session for `company_id`, tearing down the current one
    /// first. The new session starts `Idle`; call `tick` to fetch.
    pub fn start(&mut self, company_id: CompanyId) -> SessionId {
        self.stop();
        self.last_session = self.last_session.next();
        let id = self.last_session;
        info!(session = %id, company = %company_id, "session started");
        self.session = Some(CompanySession::new(id, company_id));
        id
    }

    /// Tear down the current session: cancel its timers and drop it.
    ///
    /// Returns the closed session (now `Idle`) for inspection. A response
    /// still in flight for it will be discarded as stale.
    pub fn stop(&mut self) -> Option<CompanySession> {
        let mut session = self.session.take()?;
        let cancelled = self.timers.cancel_all(session.id);
        let previous = session.state;
        session.pending_timer = None;
        session.loading = false;
        session.state = SyncState::Idle;
        info!(
            session = %session.id,
            company = %session.company_id,
            previous = %previous,
            cancelled,
            samples = session.series.len(),
            "session stopped"
        );
        Some(session)
    }

    /// Move the session to `Fetching` and hand out the request to perform.
    ///
    /// Refuses while another fetch is outstanding or after a terminal state.
    /// A pending timer is cancelled: the fetch it would have issued is the one
    /// being started now.
    pub fn begin_fetch(&mut self) -> Result<FetchRequest, SyncError> {
        let session = self.session.as_mut().ok_or(SyncError::NoSession)?;
        if !session.state.can_fetch() {
            return Err(match session.state {
                SyncState::Fetching => SyncError::FetchInFlight(session.id),
                state => SyncError::Finished {
                    session: session.id,
                    state,
                },
            });
        }

        if self.timers.cancel_all(session.id) > 0 {
            debug!(session = %session.id, "pending timer superseded by direct fetch");
        }
        session.pending_timer = None;
        session.state = SyncState::Fetching;

        let request = session.next_request();
        if !request.is_incremental() {
            session.loading = true;
        }
        debug!(
            session = %request.session,
            company = %request.company_id,
            since = ?request.since,
            "fetch started"
        );
        Ok(request)
    }

    /// Apply the result of `request` to the session.
    pub fn complete_fetch(
        &mut self,
        request: FetchRequest,
        result: Result<DashboardSnapshot, ApiError>,
    ) -> FetchOutcome {
        let now = self.clock.now();
        let session = match self.session.as_mut() {
            Some(s) if s.id == request.session && s.state == SyncState::Fetching => s,
            _ => {
                debug!(session = %request.session, "dropping stale response");
                return FetchOutcome::Stale;
            }
        };

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(session = %session.id, company = %session.company_id, error = %e, "fetch failed");
                return fail(session, &mut self.timers, self.notifier.as_ref(), e.user_message());
            }
        };

        let status = snapshot.company.status;
        session.company = Some(snapshot.company.company);
        session.last_status = Some(status.clone());

        let batch = skip_boundary(&snapshot.stocks, session.series.watermark());
        let appended = match session.series.append(batch) {
            Ok(n) => n,
            Err(e) => {
                warn!(session = %session.id, company = %session.company_id, error = %e, "backend broke series ordering");
                return fail(
                    session,
                    &mut self.timers,
                    self.notifier.as_ref(),
                    format!("Received inconsistent stock data: {e}"),
                );
            }
        };
        session.loading = false;

        if appended > 0 {
            self.renderer.render(&frame_for(session, appended));
        }

        if status.is_processing() {
            let kind = if appended > 0 {
                PollKind::Incremental
            } else {
                PollKind::Retry
            };
            let handle = self.timers.schedule(session.id, now, self.poll_interval, kind);
            session.pending_timer = Some(handle);
            session.state = SyncState::Waiting;
            info!(
                session = %session.id,
                company = %session.company_id,
                appended,
                total = session.series.len(),
                kind = ?kind,
                "upstream processing; next poll scheduled"
            );
            return FetchOutcome::Scheduled {
                kind,
                appended,
                handle,
                due_at: add_std(now, self.poll_interval),
            };
        }

        if let UpstreamStatus::Other(raw) = &status {
            warn!(session = %session.id, status = %raw, "unknown upstream status; treating as terminal");
        }
        self.timers.cancel_all(session.id);
        session.pending_timer = None;
        session.state = SyncState::Completed;

        let placeholder = session.series.is_empty();
        if placeholder {
            session.placeholder = true;
            let mut frame = frame_for(session, 0);
            frame.points = placeholder_points(now);
            frame.placeholder = true;
            self.renderer.render(&frame);
        }
        info!(
            session = %session.id,
            company = %session.company_id,
            status = %status,
            appended,
            total = session.series.len(),
            placeholder,
            "sync completed"
        );
        FetchOutcome::Completed {
            appended,
            placeholder,
        }
    }

    /// Run one full fetch against the configured API.
    pub fn tick(&mut self) -> Result<FetchOutcome, SyncError> {
        let request = self.begin_fetch()?;
        let result = self
            .api
            .get_dashboard(&request.company_id, request.since);
        Ok(self.complete_fetch(request, result))
    }

    /// Fire every timer that is due, running the fetch each one stands for.
    ///
    /// A timer only runs if it is the pending timer of the live session;
    /// anything else is stale and ignored.
    pub fn fire_due(&mut self) -> Vec<FetchOutcome> {
        let now = self.clock.now();
        let mut outcomes = Vec::new();

        for timer in self.timers.take_due(now) {
            let live = self.session.as_mut().filter(|s| {
                s.id == timer.session
                    && s.state == SyncState::Waiting
                    && s.pending_timer == Some(timer.handle)
            });
            let Some(session) = live else {
                debug!(session = %timer.session, handle = %timer.handle, "ignoring stale timer");
                continue;
            };
            session.pending_timer = None;
            debug!(session = %timer.session, kind = ?timer.action, "timer fired");

            match self.tick() {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(session = %timer.session, error = %e, "timer fetch refused"),
            }
        }
        outcomes
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drop the leading samples that repeat the watermark.
///
/// Incremental windows are inclusive, so the backend may resend the sample
/// merged last time.
fn skip_boundary(stocks: &[Sample], watermark: Option<DateTime<Utc>>) -> &[Sample] {
    let Some(watermark) = watermark else {
        return stocks;
    };
    let skip = stocks
        .iter()
        .take_while(|s| s.timestamp == watermark)
        .count();
    if skip > 0 {
        debug!(skipped = skip, "dropped boundary samples already merged");
    }
    &stocks[skip..]
}

fn fail(
    session: &mut CompanySession,
    timers: &mut TimerRegistry<PollKind>,
    notifier: &dyn Notifier,
    message: String,
) -> FetchOutcome {
    let message = if message.trim().is_empty() {
        FALLBACK_MESSAGE.to_string()
    } else {
        message
    };
    timers.cancel_all(session.id);
    session.pending_timer = None;
    session.loading = false;
    session.state = SyncState::Failed;
    session.last_error = Some(message.clone());
    notifier.notify(&message);
    FetchOutcome::Failed { message }
}

fn frame_for(session: &CompanySession, appended: usize) -> ChartFrame {
    let company = session.company.clone().unwrap_or_else(|| Company {
        company_id: session.company_id.clone(),
        company_name: session.company_id.to_string(),
        company_short_code: String::new(),
    });
    ChartFrame {
        session: session.id,
        company,
        status: session.last_status.clone().unwrap_or_default(),
        points: session.series.points(),
        appended,
        placeholder: false,
    }
}
