//! Dashboard view lifecycle: mount, switch company, pump timers, unmount.
//!
//! The view owns one `SyncController` and drives it from the host loop.
//! Nothing runs on its own: the host calls `pump` (or `run_until_settled`)
//! and due timers fire from there.

use crate::api::DashboardApi;
use crate::config::DashboardConfig;
use crate::domain::{Company, CompanyId};
use crate::notify::Notifier;
use crate::render::RenderSink;
use crate::sync::{
    Clock, CompanySelector, CompanySession, FetchOutcome, SelectionError, SyncController,
    SyncError,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("dashboard view is not mounted")]
    NotMounted,
}

pub struct DashboardView {
    controller: SyncController,
    selector: CompanySelector,
    companies: Vec<Company>,
    mounted: bool,
}

impl DashboardView {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        clock: Arc<dyn Clock>,
        renderer: Box<dyn RenderSink>,
        notifier: Arc<dyn Notifier>,
        config: &DashboardConfig,
    ) -> Self {
        let selector = CompanySelector::new(Arc::clone(&api), Arc::clone(&notifier));
        let controller = SyncController::new(api, clock, renderer, notifier)
            .with_poll_interval(config.poll_interval());
        Self {
            controller,
            selector,
            companies: Vec::new(),
            mounted: false,
        }
    }

    /// Load the company list, select a company and run the first fetch.
    ///
    /// Selection failures leave the view unmounted with no session.
    pub fn mount(&mut self, requested: Option<&str>) -> Result<FetchOutcome, ViewError> {
        self.controller.stop();
        self.mounted = false;
        self.companies.clear();
        let selection = self.selector.resolve(requested)?;
        self.companies = selection.companies;
        self.mounted = true;
        info!(api = self.controller.api().name(), company = %selection.company_id, "dashboard mounted");
        self.controller.start(selection.company_id);
        Ok(self.controller.tick()?)
    }

    /// Tear down the current session and start over for `company_id`.
    ///
    /// A blank id selects the first listed company.
    pub fn switch_company(&mut self, company_id: &str) -> Result<FetchOutcome, ViewError> {
        if !self.mounted {
            return Err(ViewError::NotMounted);
        }
        let company_id = match company_id.trim() {
            "" => match self.companies.first() {
                Some(first) => first.company_id.clone(),
                None => return Err(SelectionError::NoCompanies.into()),
            },
            id => CompanyId::new(id),
        };
        if !self.companies.iter().any(|c| c.company_id == company_id) {
            warn!(company = %company_id, "switching to a company that is not in the list");
        }
        self.controller.start(company_id);
        Ok(self.controller.tick()?)
    }

    /// Fire due timers. Returns the outcome of each fetch that ran.
    pub fn pump(&mut self) -> Vec<FetchOutcome> {
        if !self.mounted {
            return Vec::new();
        }
        self.controller.fire_due()
    }

    /// Sleep until each pending deadline and pump, until the session settles
    /// or `max_polls` timer-driven fetches have run. Returns the fetch count.
    pub fn run_until_settled(&mut self, max_polls: Option<u32>) -> u32 {
        let mut polls = 0u32;
        while self.mounted && !self.controller.is_settled() {
            if max_polls.is_some_and(|max| polls >= max) {
                info!(polls, "poll limit reached");
                break;
            }
            let Some(deadline) = self.controller.next_deadline() else {
                break;
            };
            self.controller.clock().sleep_until(deadline);
            polls += self.pump().len() as u32;
        }
        polls
    }

    /// Cancel everything. Idempotent.
    pub fn unmount(&mut self) -> Option<CompanySession> {
        if !self.mounted {
            return None;
        }
        self.mounted = false;
        let closed = self.controller.stop();
        info!("dashboard unmounted");
        closed
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_settled(&self) -> bool {
        self.controller.is_settled()
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    pub fn session(&self) -> Option<&CompanySession> {
        self.controller.session()
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.controller.next_deadline()
    }

    pub fn controller(&self) -> &SyncController {
        &self.controller
    }
}

impl Drop for DashboardView {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UpstreamStatus;
    use crate::notify::RecordingNotifier;
    use crate::sync::{ManualClock, SyncState};
    use crate::testing::{FrameLog, ScriptedApi};

    fn acme() -> Company {
        Company::new("acme", "Acme", "ACM")
    }

    fn view(api: &Arc<ScriptedApi>, clock: &Arc<ManualClock>, frames: &FrameLog) -> DashboardView {
        DashboardView::new(
            api.clone(),
            clock.clone(),
            Box::new(frames.clone()),
            Arc::new(RecordingNotifier::new()),
            &DashboardConfig::default(),
        )
    }

    #[test]
    fn switch_before_mount_is_refused() {
        let api = Arc::new(ScriptedApi::new());
        let clock = Arc::new(ManualClock::at_epoch());
        let mut v = view(&api, &clock, &FrameLog::new());
        assert_eq!(v.switch_company("acme").unwrap_err(), ViewError::NotMounted);
        assert!(v.pump().is_empty());
        assert!(v.unmount().is_none());
    }

    #[test]
    fn failed_remount_unmounts_view() {
        let api = Arc::new(ScriptedApi::new());
        let clock = Arc::new(ManualClock::at_epoch());
        api.push_companies(Ok(vec![acme()]));
        api.push_batch(&acme(), UpstreamStatus::Processing, &[]);
        api.push_companies(Err(crate::api::ApiError::Http {
            status: 503,
            message: Some("Server down".into()),
        }));
        let mut v = view(&api, &clock, &FrameLog::new());
        v.mount(None).unwrap();
        assert!(v.is_mounted());

        let err = v.mount(None).unwrap_err();
        assert!(matches!(err, ViewError::Selection(SelectionError::ListFailed(_))));
        assert!(!v.is_mounted());
        assert!(v.session().is_none());
        assert!(v.companies().is_empty());
        assert!(v.controller().timers().is_empty());
        assert_eq!(v.switch_company("acme").unwrap_err(), ViewError::NotMounted);
        assert_eq!(api.calls().len(), 1);
    }

    #[test]
    fn blank_switch_selects_first_company() {
        let api = Arc::new(ScriptedApi::new());
        let clock = Arc::new(ManualClock::at_epoch());
        let globex = Company::new("globex", "Globex", "GLX");
        api.push_companies(Ok(vec![acme(), globex.clone()]));
        api.push_batch(&globex, UpstreamStatus::Processing, &[]);
        api.push_batch(&acme(), UpstreamStatus::Processing, &[]);
        let mut v = view(&api, &clock, &FrameLog::new());
        v.mount(Some("globex")).unwrap();

        v.switch_company("   ").unwrap();
        assert_eq!(v.session().unwrap().company_id().as_str(), "acme");
        let calls = api.calls();
        assert_eq!(calls[1].company, CompanyId::new("acme"));
        assert!(calls.iter().all(|c| !c.company.as_str().is_empty()));
    }

    #[test]
    fn failed_selection_leaves_view_unmounted() {
        let api = Arc::new(ScriptedApi::new());
        let clock = Arc::new(ManualClock::at_epoch());
        api.push_companies(Ok(Vec::new()));
        let mut v = view(&api, &clock, &FrameLog::new());
        let err = v.mount(None).unwrap_err();
        assert_eq!(err, ViewError::Selection(SelectionError::NoCompanies));
        assert!(!v.is_mounted());
        assert!(v.session().is_none());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn run_until_settled_stops_at_completion() {
        let api = Arc::new(ScriptedApi::new());
        let clock = Arc::new(ManualClock::at_epoch());
        let frames = FrameLog::new();
        api.push_companies(Ok(vec![acme()]));
        api.push_batch(&acme(), UpstreamStatus::Processing, &[(1, 1.0)]);
        api.push_batch(&acme(), UpstreamStatus::Processing, &[(1, 1.0), (2, 2.0)]);
        api.push_batch(&acme(), UpstreamStatus::Completed, &[(2, 2.0), (3, 3.0)]);

        let mut v = view(&api, &clock, &frames);
        v.mount(None).unwrap();
        assert_eq!(v.run_until_settled(None), 2);
        assert_eq!(v.session().unwrap().state(), SyncState::Completed);
        assert_eq!(v.session().unwrap().series().len(), 3);
        assert_eq!(frames.len(), 3);
        assert_eq!(api.remaining(), 0);
        assert_eq!(clock.now().timestamp(), 10);
    }

    #[test]
    fn run_until_settled_honours_poll_limit() {
        let api = Arc::new(ScriptedApi::new());
        let clock = Arc::new(ManualClock::at_epoch());
        api.push_companies(Ok(vec![acme()]));
        for _ in 0..4 {
            api.push_batch(&acme(), UpstreamStatus::Processing, &[]);
        }
        let mut v = view(&api, &clock, &FrameLog::new());
        v.mount(None).unwrap();
        assert_eq!(v.run_until_settled(Some(2)), 2);
        assert_eq!(v.session().unwrap().state(), SyncState::Waiting);
        assert_eq!(api.calls().len(), 3);
    }

    #[test]
    fn unmount_clears_timers() {
        let api = Arc::new(ScriptedApi::new());
        let clock = Arc::new(ManualClock::at_epoch());
        api.push_companies(Ok(vec![acme()]));
        api.push_batch(&acme(), UpstreamStatus::Processing, &[]);
        let mut v = view(&api, &clock, &FrameLog::new());
        v.mount(None).unwrap();
        assert!(v.next_deadline().is_some());
        let closed = v.unmount().unwrap();
        assert_eq!(closed.state(), SyncState::Idle);
        assert!(v.next_deadline().is_none());
        assert!(v.controller().timers().is_empty());
    }
}
