// Date range selector and request query models
use crate::domain::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MAX_PROJECT_ID_LEN: usize = 64;

/// Closed set of ranges the dashboard can be viewed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[default]
    #[serde(rename = "last_30_days")]
    Last30Days,
    #[serde(rename = "last_90_days")]
    Last90Days,
    #[serde(alias = "this_year")]
    LastYear,
}

impl DateRange {
    pub const ALL: [DateRange; 4] = [
        DateRange::Last7Days,
        DateRange::Last30Days,
        DateRange::Last90Days,
        DateRange::LastYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::Last7Days => "last_7_days",
            DateRange::Last30Days => "last_30_days",
            DateRange::Last90Days => "last_90_days",
            DateRange::LastYear => "last_year",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateRange::Last7Days => "Last 7 days",
            DateRange::Last30Days => "Last 30 days",
            DateRange::Last90Days => "Last 90 days",
            DateRange::LastYear => "Last year",
        }
    }

    /// Scale applied to cumulative counts (citations, traffic, conversions).
    pub fn multiplier(&self) -> f64 {
        match self {
            DateRange::Last7Days => 0.3,
            DateRange::Last30Days => 1.0,
            DateRange::Last90Days => 2.5,
            DateRange::LastYear => 4.0,
        }
    }

    /// Trend cadence as (number of points, days between points).
    pub fn cadence(&self) -> (usize, i64) {
        match self {
            DateRange::Last7Days => (7, 1),
            DateRange::Last30Days => (10, 3),
            DateRange::Last90Days => (13, 7),
            DateRange::LastYear => (12, 30),
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last_7_days" => Ok(DateRange::Last7Days),
            "last_30_days" => Ok(DateRange::Last30Days),
            "last_90_days" => Ok(DateRange::Last90Days),
            "last_year" | "this_year" => Ok(DateRange::LastYear),
            other => Err(ValidationError::UnknownDateRange(other.to_string())),
        }
    }
}

/// Identifier of a monitored project, checked on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let well_formed = !raw.is_empty()
            && raw.len() <= MAX_PROJECT_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidProjectId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated dashboard request. Also the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DashboardQuery {
    pub date_range: DateRange,
    pub project_id: Option<ProjectId>,
}

impl DashboardQuery {
    pub fn new(date_range: DateRange, project_id: Option<ProjectId>) -> Self {
        Self {
            date_range,
            project_id,
        }
    }

    pub fn parse(date_range: &str, project_id: Option<&str>) -> Result<Self, ValidationError> {
        let date_range = date_range.parse::<DateRange>()?;
        let project_id = project_id.map(ProjectId::parse).transpose()?;
        Ok(Self::new(date_range, project_id))
    }
}

impl fmt::Display for DashboardQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.project_id {
            Some(project) => write!(f, "{}/{}", self.date_range, project),
            None => write!(f, "{}", self.date_range),
        }
    }
}
