//! Test doubles: a scripted backend and a frame-capturing render sink.

use crate::api::{ApiError, DashboardApi, DashboardSnapshot};
use crate::domain::{Company, CompanyId, CompanyStatus, Sample, UpstreamStatus};
use crate::render::{ChartFrame, RenderSink};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// One recorded `get_dashboard` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardCall {
    pub company: CompanyId,
    pub since: Option<DateTime<Utc>>,
}

/// Backend that replays queued responses in order.
///
/// Running out of scripted responses yields `ApiError::InvalidRequest`, so a
/// test that fetches more often than expected fails visibly.
#[derive(Debug, Default)]
pub struct ScriptedApi {
    companies: Mutex<VecDeque<Result<Vec<Company>, ApiError>>>,
    dashboards: Mutex<VecDeque<Result<DashboardSnapshot, ApiError>>>,
    calls: Mutex<Vec<DashboardCall>>,
    list_calls: Mutex<usize>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(
        company: &Company,
        status: UpstreamStatus,
        samples: &[(i64, f64)],
    ) -> DashboardSnapshot {
        DashboardSnapshot {
            company: CompanyStatus {
                company: company.clone(),
                status,
            },
            stocks: samples
                .iter()
                .map(|&(secs, value)| Sample::at_secs(secs, value))
                .collect(),
        }
    }

    pub fn push_companies(&self, response: Result<Vec<Company>, ApiError>) {
        lock(&self.companies).push_back(response);
    }

    pub fn push_dashboard(&self, response: Result<DashboardSnapshot, ApiError>) {
        lock(&self.dashboards).push_back(response);
    }

    /// Queue a successful dashboard response with samples at `(secs, value)`.
    pub fn push_batch(&self, company: &Company, status: UpstreamStatus, samples: &[(i64, f64)]) {
        self.push_dashboard(Ok(Self::snapshot(company, status, samples)));
    }

    pub fn calls(&self) -> Vec<DashboardCall> {
        lock(&self.calls).clone()
    }

    pub fn list_calls(&self) -> usize {
        *lock(&self.list_calls)
    }

    /// Dashboard responses still queued.
    pub fn remaining(&self) -> usize {
        lock(&self.dashboards).len()
    }
}

impl DashboardApi for ScriptedApi {
    fn name(&self) -> &str {
        "scripted"
    }

    fn list_companies(&self) -> Result<Vec<Company>, ApiError> {
        *lock(&self.list_calls) += 1;
        lock(&self.companies).pop_front().unwrap_or_else(|| {
            Err(ApiError::InvalidRequest(
                "no scripted company list left".into(),
            ))
        })
    }

    fn get_dashboard(
        &self,
        company: &CompanyId,
        since: Option<DateTime<Utc>>,
    ) -> Result<DashboardSnapshot, ApiError> {
        lock(&self.calls).push(DashboardCall {
            company: company.clone(),
            since,
        });
        lock(&self.dashboards).pop_front().unwrap_or_else(|| {
            Err(ApiError::InvalidRequest(
                "no scripted dashboard response left".into(),
            ))
        })
    }
}

/// Render sink that keeps every frame. Clones share the same log.
#[derive(Debug, Default, Clone)]
pub struct FrameLog {
    frames: Arc<Mutex<Vec<ChartFrame>>>,
}

impl FrameLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<ChartFrame> {
        lock(&self.frames).clone()
    }

    pub fn last(&self) -> Option<ChartFrame> {
        lock(&self.frames).last().cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.frames).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RenderSink for FrameLog {
    fn render(&mut self, frame: &ChartFrame) {
        lock(&self.frames).push(frame.clone());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
