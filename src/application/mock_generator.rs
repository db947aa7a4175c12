// Mock generator - Synthesizes dashboard payloads when the backend is unavailable
use crate::domain::dashboard::{
    ActivityEvent, ActivityType, DashboardPayload, Kpi, Kpis, PerformanceTrends, TrendPoint,
};
use crate::domain::date_range::DateRange;
use crate::domain::error::GeneratorError;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Mutex;

// 30-day baselines
const BASE_TOTAL_CITATIONS: f64 = 248.0;
const BASE_SHARE_OF_VOICE: f64 = 0.42;
const BASE_TRAFFIC: f64 = 5400.0;
const BASE_QUALITY_SCORE: f64 = 86.0;

// Per-day rates behind the trend series
const DAILY_CITATIONS: f64 = BASE_TOTAL_CITATIONS / 30.0;
const DAILY_TRAFFIC: f64 = BASE_TRAFFIC / 30.0;
const DAILY_CONVERSIONS: f64 = 1.25;

struct ActivityTemplate {
    kind: ActivityType,
    title: &'static str,
    description: &'static str,
    hours_ago: i64,
}

const ACTIVITY_TEMPLATES: [ActivityTemplate; 5] = [
    ActivityTemplate {
        kind: ActivityType::NewCitation,
        title: "New citation detected",
        description: "'How to Optimize Content for AI Search' on Google SGE",
        hours_ago: 2,
    },
    ActivityTemplate {
        kind: ActivityType::CompetitorAlert,
        title: "Competitor alert",
        description: "TechInsider gained 5 new citations for 'AI SEO'",
        hours_ago: 4,
    },
    ActivityTemplate {
        kind: ActivityType::TrafficIncrease,
        title: "Traffic increase detected",
        description: "+32% traffic from UX Pilot citations",
        hours_ago: 6,
    },
    ActivityTemplate {
        kind: ActivityType::NewSource,
        title: "New AI source added",
        description: "Now tracking citations on Perplexity.ai",
        hours_ago: 12,
    },
    ActivityTemplate {
        kind: ActivityType::CitationLost,
        title: "Citation lost",
        description: "'AI Marketing Guide' no longer cited on UX Pilot",
        hours_ago: 24,
    },
];

/// Builds plausible dashboard payloads from an injectable random source.
pub struct MockDashboardGenerator {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl MockDashboardGenerator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    pub fn generate(&self, range: DateRange) -> Result<DashboardPayload, GeneratorError> {
        self.generate_at(range, Utc::now())
    }

    pub fn generate_at(
        &self,
        range: DateRange,
        now: DateTime<Utc>,
    ) -> Result<DashboardPayload, GeneratorError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|e| GeneratorError::RandomSource(e.to_string()))?;

        let payload = build_payload(range, now, &mut *rng);
        payload.validate()?;
        Ok(payload)
    }
}

impl Default for MockDashboardGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn build_payload<R: Rng + ?Sized>(range: DateRange, now: DateTime<Utc>, rng: &mut R) -> DashboardPayload {
    DashboardPayload {
        last_updated_at: now,
        kpis: build_kpis(range, rng),
        performance_trends: build_trends(range, now, rng),
        recent_activity: build_activity(now, rng),
    }
}

fn build_kpis<R: Rng + ?Sized>(range: DateRange, rng: &mut R) -> Kpis {
    let scale = range.multiplier();

    Kpis {
        total_citations: Kpi::new(
            (BASE_TOTAL_CITATIONS * scale * rng.gen_range(0.9..1.1)).round(),
            round2(rng.gen_range(-0.05..0.25)),
        ),
        share_of_voice: Kpi::new(
            round2(BASE_SHARE_OF_VOICE + rng.gen_range(-0.05..0.05)),
            round2(rng.gen_range(-0.05..0.15)),
        ),
        traffic_from_citations: Kpi::new(
            (BASE_TRAFFIC * scale * rng.gen_range(0.9..1.1)).round(),
            round2(rng.gen_range(-0.1..0.3)),
        ),
        citation_quality_score: Kpi::new(
            (BASE_QUALITY_SCORE + rng.gen_range(-6.0..6.0)).round(),
            rng.gen_range(-5i32..=5) as f64,
        ),
    }
}

fn build_trends<R: Rng + ?Sized>(
    range: DateRange,
    now: DateTime<Utc>,
    rng: &mut R,
) -> PerformanceTrends {
    PerformanceTrends {
        citations: build_series(range, now, DAILY_CITATIONS, rng),
        traffic: build_series(range, now, DAILY_TRAFFIC, rng),
        conversions: build_series(range, now, DAILY_CONVERSIONS, rng),
    }
}

/// One point per bucket, ending today, ramping upward over the range.
fn build_series<R: Rng + ?Sized>(
    range: DateRange,
    now: DateTime<Utc>,
    daily_rate: f64,
    rng: &mut R,
) -> Vec<TrendPoint> {
    let (points, step_days) = range.cadence();
    let end = now.date_naive();
    let last = points.saturating_sub(1).max(1) as f64;

    (0..points)
        .map(|i| {
            let date = end - Duration::days(step_days * (points - 1 - i) as i64);
            let growth = 0.6 + 0.8 * (i as f64 / last);
            let value = daily_rate * step_days as f64 * growth * rng.gen_range(0.85..1.15);
            TrendPoint::new(date, value.round())
        })
        .collect()
}

fn build_activity<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Vec<ActivityEvent> {
    let count = rng.gen_range(3..=ACTIVITY_TEMPLATES.len());

    ACTIVITY_TEMPLATES
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, template)| {
            // Jitter stays under the smallest gap between templates, so order holds.
            let minutes = rng.gen_range(0..30i64);
            ActivityEvent {
                id: format!("evt_{}", i + 1),
                kind: template.kind,
                title: template.title.to_string(),
                description: template.description.to_string(),
                timestamp: now - Duration::hours(template.hours_ago) - Duration::minutes(minutes),
            }
        })
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
