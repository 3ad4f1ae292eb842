//! Company metadata and the backend-reported simulation status.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Backend identifier of a company.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(pub String);

impl CompanyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CompanyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A company as returned by `companies/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub company_id: CompanyId,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_short_code: String,
}

impl Company {
    pub fn new(id: &str, name: &str, short_code: &str) -> Self {
        Self {
            company_id: CompanyId::new(id),
            company_name: name.to_string(),
            company_short_code: short_code.to_string(),
        }
    }
}

/// Company metadata carried on a dashboard response, including the
/// simulation status that governs polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyStatus {
    #[serde(flatten)]
    pub company: Company,
    #[serde(default)]
    pub status: UpstreamStatus,
}

/// Simulation state reported by the backend with every dashboard batch.
///
/// Only `Processing` keeps the poll loop alive. `Completed`, an unset status
/// and any unrecognised value are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpstreamStatus {
    Processing,
    Completed,
    #[default]
    Unset,
    Other(String),
}

impl UpstreamStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Unset,
            Some("PROCESSING") => Self::Processing,
            Some("COMPLETED") => Self::Completed,
            Some(other) => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Processing => Some("PROCESSING"),
            Self::Completed => Some("COMPLETED"),
            Self::Unset => None,
            Self::Other(s) => Some(s.as_str()),
        }
    }

    /// Whether the upstream simulation is still producing data.
    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing)
    }
}

impl fmt::Display for UpstreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().unwrap_or("<unset>"))
    }
}

impl Serialize for UpstreamStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_str() {
            Some(s) => serializer.serialize_str(s),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for UpstreamStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::parse(raw.as_deref()))
    }
}
