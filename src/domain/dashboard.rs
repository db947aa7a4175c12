// Dashboard domain model - the payload shared by the backend and the mock generator
use crate::domain::error::InvariantViolation;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Up,
    Down,
    Stable,
}

impl ChangeDirection {
    /// Zero maps to `Stable`, so a direction derived here always agrees with
    /// the sign of the change.
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            ChangeDirection::Up
        } else if change < 0.0 {
            ChangeDirection::Down
        } else {
            ChangeDirection::Stable
        }
    }

    pub fn is_consistent_with(&self, change: f64) -> bool {
        match self {
            ChangeDirection::Down => change < 0.0,
            ChangeDirection::Up | ChangeDirection::Stable => change >= 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub value: f64,
    pub change: f64,
    pub change_direction: ChangeDirection,
}

impl Kpi {
    pub fn new(value: f64, change: f64) -> Self {
        Self {
            value,
            change,
            change_direction: ChangeDirection::from_change(change),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_citations: Kpi,
    pub share_of_voice: Kpi,
    pub traffic_from_citations: Kpi,
    pub citation_quality_score: Kpi,
}

impl Kpis {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Kpi)> {
        [
            ("totalCitations", &self.total_citations),
            ("shareOfVoice", &self.share_of_voice),
            ("trafficFromCitations", &self.traffic_from_citations),
            ("citationQualityScore", &self.citation_quality_score),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl TrendPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTrends {
    pub citations: Vec<TrendPoint>,
    pub traffic: Vec<TrendPoint>,
    pub conversions: Vec<TrendPoint>,
}

impl PerformanceTrends {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[TrendPoint])> {
        [
            ("citations", self.citations.as_slice()),
            ("traffic", self.traffic.as_slice()),
            ("conversions", self.conversions.as_slice()),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    NewCitation,
    CompetitorAlert,
    TrafficIncrease,
    NewSource,
    CitationLost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPayload {
    pub last_updated_at: DateTime<Utc>,
    pub kpis: Kpis,
    pub performance_trends: PerformanceTrends,
    pub recent_activity: Vec<ActivityEvent>,
}

impl DashboardPayload {
    /// Check the invariants every payload must hold, whatever produced it.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        for (kpi, data) in self.kpis.iter() {
            if !data.change_direction.is_consistent_with(data.change) {
                return Err(InvariantViolation::ChangeDirection { kpi });
            }
        }

        for (series, points) in self.performance_trends.iter() {
            if points.is_empty() {
                return Err(InvariantViolation::EmptySeries { series });
            }
            if points.windows(2).any(|pair| pair[0].date >= pair[1].date) {
                return Err(InvariantViolation::UnorderedSeries { series });
            }
        }

        let mut seen = HashSet::new();
        for event in &self.recent_activity {
            if !seen.insert(event.id.as_str()) {
                return Err(InvariantViolation::DuplicateActivityId(event.id.clone()));
            }
        }

        Ok(())
    }

    /// Put recent activity in presentation order (newest first).
    pub fn sort_activity(&mut self) {
        self.recent_activity
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}

/// Wire envelope: `{"data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardEnvelope {
    pub data: DashboardPayload,
}

/// Wire error body: `{"error": {"message": "..."}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorMessage {
    pub message: String,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorMessage {
                message: message.into(),
            },
        }
    }
}
