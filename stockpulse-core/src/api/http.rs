//! REST backend client.
//!
//! Talks to the dashboard service over HTTP:
//! - `GET {base}/companies/list`
//! - `GET {base}/companies/dashboard/{companyId}[?date={since}]`
//!
//! Every success body is a `{ success, data }` envelope. Non-2xx bodies are
//! `{ message }` and the message is carried into `ApiError::Http` so it can be
//! shown to the user. One request per call; retry policy belongs to the
//! caller.

use super::provider::{ApiEnvelope, ApiError, DashboardApi, DashboardSnapshot};
use crate::config::DashboardConfig;
use crate::domain::{Company, CompanyId};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Blocking HTTP client for the dashboard service.
pub struct HttpDashboardApi {
    client: reqwest::blocking::Client,
    base_url: Url,
}

impl HttpDashboardApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(&format!("{trimmed}/"))
            .map_err(|e| ApiError::InvalidRequest(format!("bad base URL '{base_url}': {e}")))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, ApiError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn companies_url(&self) -> Result<Url, ApiError> {
        self.base_url
            .join("companies/list")
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))
    }

    /// Build the dashboard URL. The company id is percent-encoded as a single
    /// path segment; `since` goes out as RFC 3339 at full sub-second precision.
    pub(crate) fn dashboard_url(
        &self,
        company: &CompanyId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join("companies/dashboard")
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest("base URL cannot carry a path".into()))?
            .push(company.as_str());

        if let Some(since) = since {
            url.query_pairs_mut()
                .append_pair("date", &since.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        }
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!(url = %url, "GET");
        let resp = self.client.get(url.clone()).send().map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(e.to_string())
            } else {
                ApiError::NetworkUnreachable(e.to_string())
            }
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| ApiError::NetworkUnreachable(format!("failed to read body from {url}: {e}")))?;

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }

        parse_envelope(&body)
    }
}

/// Build an `ApiError::Http` from a non-2xx response body.
pub(crate) fn error_from_body(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty());
    ApiError::Http { status, message }
}

/// Decode a `{ success, data }` envelope and unwrap its payload.
pub(crate) fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let envelope: ApiEnvelope<T> = serde_json::from_str(body)
        .map_err(|e| ApiError::ResponseFormatChanged(format!("failed to parse response: {e}")))?;
    envelope.into_data()
}

impl DashboardApi for HttpDashboardApi {
    fn name(&self) -> &str {
        "http"
    }

    fn list_companies(&self) -> Result<Vec<Company>, ApiError> {
        let url = self.companies_url()?;
        self.get_json(url)
    }

    fn get_dashboard(
        &self,
        company: &CompanyId,
        since: Option<DateTime<Utc>>,
    ) -> Result<DashboardSnapshot, ApiError> {
        let url = self.dashboard_url(company, since)?;
        self.get_json(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UpstreamStatus;

    fn api() -> HttpDashboardApi {
        HttpDashboardApi::new("http://localhost:3000/api/", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn builds_list_url() {
        assert_eq!(
            api().companies_url().unwrap().as_str(),
            "http://localhost:3000/api/companies/list"
        );
    }

    #[test]
    fn builds_full_history_url() {
        let url = api().dashboard_url(&CompanyId::new("c-1"), None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/companies/dashboard/c-1");
    }

    #[test]
    fn builds_incremental_url() {
        let since = DateTime::from_timestamp(1_614_592_800, 0).unwrap();
        let url = api()
            .dashboard_url(&CompanyId::new("c-1"), Some(since))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/companies/dashboard/c-1?date=2021-03-01T10%3A00%3A00Z"
        );
    }

    #[test]
    fn incremental_url_keeps_microseconds() {
        let since = DateTime::from_timestamp(1_614_592_800, 123_456_000).unwrap();
        let url = api()
            .dashboard_url(&CompanyId::new("c-1"), Some(since))
            .unwrap();
        assert!(url
            .as_str()
            .ends_with("?date=2021-03-01T10%3A00%3A00.123456Z"));
        let (_, sent) = url.query_pairs().next().unwrap();
        assert_eq!(DateTime::parse_from_rfc3339(&sent).unwrap(), since);
    }

    #[test]
    fn encodes_company_id_segment() {
        let url = api().dashboard_url(&CompanyId::new("a b/c"), None).unwrap();
        assert!(url.as_str().ends_with("/companies/dashboard/a%20b%2Fc"));
    }

    #[test]
    fn base_without_trailing_slash() {
        let api = HttpDashboardApi::new("http://host:8080/v1", Duration::from_secs(1)).unwrap();
        assert_eq!(
            api.companies_url().unwrap().as_str(),
            "http://host:8080/v1/companies/list"
        );
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(HttpDashboardApi::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn parses_company_list() {
        let body = r#"{
            "success": true,
            "data": [
                {"companyId": "b", "companyName": "Beta", "companyShortCode": "BET"},
                {"companyId": "a", "companyName": "Alpha", "companyShortCode": "ALP"}
            ]
        }"#;
        let companies: Vec<Company> = parse_envelope(body).unwrap();
        assert_eq!(companies.len(), 2);
        assert_eq!(companies[0].company_id.as_str(), "b");
    }

    #[test]
    fn parses_dashboard() {
        let body = r#"{
            "success": true,
            "data": {
                "company": {
                    "companyId": "c-1",
                    "companyName": "Acme",
                    "companyShortCode": "ACM",
                    "status": "PROCESSING"
                },
                "stocks": [
                    {"date": "2021-03-01T10:00:00.000Z", "currentValue": 10},
                    {"date": "2021-03-01T10:00:05.000Z", "currentValue": "11.5"}
                ]
            }
        }"#;
        let snap: DashboardSnapshot = parse_envelope(body).unwrap();
        assert_eq!(snap.company.status, UpstreamStatus::Processing);
        assert_eq!(snap.stocks.len(), 2);
        assert_eq!(snap.stocks[1].value, 11.5);
    }

    #[test]
    fn missing_stocks_is_empty() {
        let body = r#"{"success":true,"data":{"company":{"companyId":"c-1","status":"COMPLETED"}}}"#;
        let snap: DashboardSnapshot = parse_envelope(body).unwrap();
        assert!(snap.stocks.is_empty());
        assert_eq!(snap.company.status, UpstreamStatus::Completed);
    }

    #[test]
    fn unsuccessful_envelope_is_rejected() {
        let body = r#"{"success":false,"message":"Simulation not started"}"#;
        let err = parse_envelope::<DashboardSnapshot>(body).unwrap_err();
        assert_eq!(err.user_message(), "Simulation not started");
    }

    #[test]
    fn malformed_body_is_format_error() {
        let err = parse_envelope::<Vec<Company>>("<html>").unwrap_err();
        assert!(matches!(err, ApiError::ResponseFormatChanged(_)));
    }

    #[test]
    fn error_body_message_is_kept() {
        let err = error_from_body(500, r#"{"message":"Database unavailable"}"#);
        assert_eq!(
            err,
            ApiError::Http {
                status: 500,
                message: Some("Database unavailable".into())
            }
        );
        assert_eq!(err.user_message(), "Database unavailable");
    }

    #[test]
    fn error_body_without_json() {
        let err = error_from_body(503, "Service Unavailable");
        assert_eq!(err, ApiError::Http { status: 503, message: None });
    }
}
