//! Company selection: which company the dashboard opens on.

use crate::api::{ApiError, DashboardApi};
use crate::domain::{Company, CompanyId};
use crate::notify::Notifier;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const NO_COMPANIES_MESSAGE: &str = "No companies available.";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    #[error("company list failed: {0}")]
    ListFailed(#[from] ApiError),

    #[error("company list is empty")]
    NoCompanies,
}

/// Result of resolving the initial company.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub company_id: CompanyId,
    pub companies: Vec<Company>,
}

pub struct CompanySelector {
    api: Arc<dyn DashboardApi>,
    notifier: Arc<dyn Notifier>,
}

impl CompanySelector {
    pub fn new(api: Arc<dyn DashboardApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// Load the company list and pick the company to show.
    ///
    /// A blank or missing `requested` id selects the first listed company.
    /// A requested id that is not in the list is still used, but an empty list
    /// fails whatever was requested. Failures are reported through the
    /// notifier before being returned.
    pub fn resolve(&self, requested: Option<&str>) -> Result<Selection, SelectionError> {
        let companies = match self.api.list_companies() {
            Ok(companies) => companies,
            Err(e) => {
                warn!(api = self.api.name(), error = %e, "company list failed");
                self.notifier.notify(&e.user_message());
                return Err(SelectionError::ListFailed(e));
            }
        };

        let Some(first) = companies.first() else {
            warn!(api = self.api.name(), "company list is empty");
            self.notifier.notify(NO_COMPANIES_MESSAGE);
            return Err(SelectionError::NoCompanies);
        };

        let requested = requested.map(str::trim).filter(|id| !id.is_empty());
        let company_id = match requested {
            Some(id) => {
                if !companies.iter().any(|c| c.company_id.as_str() == id) {
                    warn!(company = id, "requested company is not in the list; using it anyway");
                }
                CompanyId::new(id)
            }
            None => first.company_id.clone(),
        };

        info!(company = %company_id, listed = companies.len(), "company selected");
        Ok(Selection {
            company_id,
            companies,
        })
    }
}
