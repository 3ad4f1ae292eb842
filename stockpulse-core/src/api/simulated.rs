//! In-process simulated backend.
//!
//! Stands in for the REST service when running offline. Each company runs an
//! independent seeded random walk: every dashboard request advances that
//! company's simulation by one step, which produces a handful of new samples
//! while the status is PROCESSING and flips to COMPLETED after a fixed number
//! of steps.

use super::provider::{ApiError, DashboardApi, DashboardSnapshot};
use crate::domain::{Company, CompanyId, CompanyStatus, Sample, UpstreamStatus};
use crate::rng::SeedHierarchy;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Shape of every simulated run.
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    /// Requests after which the status becomes COMPLETED.
    pub steps_until_complete: u32,
    /// Leading requests that return no samples (simulation warming up).
    pub idle_steps: u32,
    /// Upper bound of samples produced per step.
    pub max_samples_per_step: u32,
    pub start: DateTime<Utc>,
    pub sample_spacing: Duration,
    pub start_price: f64,
    /// Maximum relative move per sample (0.02 = ±2%).
    pub volatility: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            steps_until_complete: 12,
            idle_steps: 1,
            max_samples_per_step: 3,
            start: DateTime::from_timestamp(1_609_459_200, 0).unwrap_or(DateTime::UNIX_EPOCH),
            sample_spacing: Duration::seconds(5),
            start_price: 100.0,
            volatility: 0.02,
        }
    }
}

#[derive(Debug)]
struct CompanyRun {
    rng: StdRng,
    samples: Vec<Sample>,
    steps: u32,
    price: f64,
    next_timestamp: DateTime<Utc>,
}

impl CompanyRun {
    fn status(&self, settings: &SimulationSettings) -> UpstreamStatus {
        if self.steps >= settings.steps_until_complete {
            UpstreamStatus::Completed
        } else {
            UpstreamStatus::Processing
        }
    }

    fn step(&mut self, settings: &SimulationSettings) {
        if self.steps >= settings.steps_until_complete {
            return;
        }
        self.steps += 1;
        if self.steps <= settings.idle_steps {
            return;
        }

        let count = self.rng.gen_range(0..=settings.max_samples_per_step);
        for _ in 0..count {
            let shock = self.rng.gen_range(-1.0..=1.0) * settings.volatility;
            self.price = ((self.price * (1.0 + shock)) * 100.0).round() / 100.0;
            self.samples.push(Sample::new(self.next_timestamp, self.price));
            self.next_timestamp += settings.sample_spacing;
        }
    }
}

/// Simulated dashboard backend.
pub struct SimulatedBackend {
    companies: Vec<Company>,
    settings: SimulationSettings,
    seeds: SeedHierarchy,
    runs: Mutex<HashMap<CompanyId, CompanyRun>>,
}

impl SimulatedBackend {
    pub fn new(companies: Vec<Company>, settings: SimulationSettings, seed: u64) -> Self {
        Self {
            companies,
            settings,
            seeds: SeedHierarchy::new(seed),
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Three demo companies with default settings.
    pub fn demo(seed: u64) -> Self {
        Self::new(
            vec![
                Company::new("acme", "Acme Corp", "ACME"),
                Company::new("globex", "Globex", "GLBX"),
                Company::new("initech", "Initech", "INIT"),
            ],
            SimulationSettings::default(),
            seed,
        )
    }

    fn find(&self, id: &CompanyId) -> Option<&Company> {
        self.companies.iter().find(|c| &c.company_id == id)
    }
}

impl DashboardApi for SimulatedBackend {
    fn name(&self) -> &str {
        "simulated"
    }

    fn list_companies(&self) -> Result<Vec<Company>, ApiError> {
        Ok(self.companies.clone())
    }

    fn get_dashboard(
        &self,
        company: &CompanyId,
        since: Option<DateTime<Utc>>,
    ) -> Result<DashboardSnapshot, ApiError> {
        let meta = self.find(company).cloned().ok_or_else(|| ApiError::Http {
            status: 404,
            message: Some(format!("Company {company} not found")),
        })?;

        let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        let run = runs.entry(company.clone()).or_insert_with(|| CompanyRun {
            rng: self.seeds.rng_for(company),
            samples: Vec::new(),
            steps: 0,
            price: self.settings.start_price,
            next_timestamp: self.settings.start,
        });
        run.step(&self.settings);

        let stocks = run
            .samples
            .iter()
            .filter(|s| since.map_or(true, |t| s.timestamp >= t))
            .copied()
            .collect();

        Ok(DashboardSnapshot {
            company: CompanyStatus {
                company: meta,
                status: run.status(&self.settings),
            },
            stocks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(steps: u32) -> SimulationSettings {
        SimulationSettings {
            steps_until_complete: steps,
            idle_steps: 0,
            max_samples_per_step: 3,
            ..SimulationSettings::default()
        }
    }

    #[test]
    fn lists_companies_in_order() {
        let backend = SimulatedBackend::demo(1);
        let ids: Vec<_> = backend
            .list_companies()
            .unwrap()
            .into_iter()
            .map(|c| c.company_id.0)
            .collect();
        assert_eq!(ids, vec!["acme", "globex", "initech"]);
    }

    #[test]
    fn unknown_company_is_404() {
        let backend = SimulatedBackend::demo(1);
        let err = backend
            .get_dashboard(&CompanyId::new("nope"), None)
            .unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 404, .. }));
    }

    #[test]
    fn completes_after_configured_steps() {
        let backend = SimulatedBackend::new(vec![Company::new("a", "A", "A")], settings(3), 5);
        let id = CompanyId::new("a");
        for _ in 0..2 {
            let snap = backend.get_dashboard(&id, None).unwrap();
            assert_eq!(snap.company.status, UpstreamStatus::Processing);
        }
        let last = backend.get_dashboard(&id, None).unwrap();
        assert_eq!(last.company.status, UpstreamStatus::Completed);
        let again = backend.get_dashboard(&id, None).unwrap();
        assert_eq!(again.stocks.len(), last.stocks.len());
    }

    #[test]
    fn idle_steps_return_no_samples() {
        let s = SimulationSettings {
            idle_steps: 2,
            ..settings(10)
        };
        let backend = SimulatedBackend::new(vec![Company::new("a", "A", "A")], s, 5);
        let id = CompanyId::new("a");
        assert!(backend.get_dashboard(&id, None).unwrap().stocks.is_empty());
        assert!(backend.get_dashboard(&id, None).unwrap().stocks.is_empty());
    }

    #[test]
    fn samples_are_strictly_increasing() {
        let backend = SimulatedBackend::new(vec![Company::new("a", "A", "A")], settings(20), 11);
        let id = CompanyId::new("a");
        let mut snap = backend.get_dashboard(&id, None).unwrap();
        for _ in 0..19 {
            snap = backend.get_dashboard(&id, None).unwrap();
        }
        assert!(snap
            .stocks
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn since_bound_is_inclusive() {
        let backend = SimulatedBackend::new(vec![Company::new("a", "A", "A")], settings(20), 3);
        let id = CompanyId::new("a");
        let mut all = Vec::new();
        while all.len() < 2 {
            all = backend.get_dashboard(&id, None).unwrap().stocks;
        }
        let pivot = all[1].timestamp;
        let tail = backend.get_dashboard(&id, Some(pivot)).unwrap().stocks;
        assert_eq!(tail.first().map(|s| s.timestamp), Some(pivot));
        assert!(tail.iter().all(|s| s.timestamp >= pivot));
    }

    #[test]
    fn same_seed_same_path() {
        let id = CompanyId::new("acme");
        let a = SimulatedBackend::demo(42);
        let b = SimulatedBackend::demo(42);
        for _ in 0..6 {
            assert_eq!(
                a.get_dashboard(&id, None).unwrap(),
                b.get_dashboard(&id, None).unwrap()
            );
        }
    }
}
