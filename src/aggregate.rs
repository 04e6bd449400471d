use crate::classify::Category;
use crate::normalize::NormalizedRecord;
use crate::severity::{Severity, SeverityCounts};
use chrono::{DateTime, Datelike, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

pub const ROLLING_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: DateTime<Utc>,
    pub category: Category,
    pub success: bool,
    pub error_count: u64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildRollup {
    pub total: usize,
    pub success: usize,
    pub durations: Vec<f64>,
    pub errors: Vec<u64>,
    pub warnings: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeploymentRollup {
    pub total: usize,
    pub success: usize,
    pub durations: Vec<f64>,
    pub errors: Vec<u64>,
    pub fatal: usize,
    pub rollbacks: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestRollup {
    pub total: usize,
    pub success: usize,
    pub coverage: Vec<f64>,
    pub cases: Vec<u64>,
    pub failures: Vec<u64>,
    pub errors: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityRollup {
    pub total: usize,
    pub success: usize,
    pub coverage: Vec<f64>,
    pub bugs: Vec<u64>,
    pub vulnerabilities: Vec<u64>,
    pub code_smells: Vec<u64>,
    pub debt_hours: Vec<f64>,
    pub duplicated_lines: Vec<f64>,
    pub quality_gate_passed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceControlRollup {
    pub total: usize,
    pub success: usize,
    pub errors: Vec<String>,
    pub fatal: usize,
}

/// Everything the dashboard needs for one filtered record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub build: BuildRollup,
    pub deployment: DeploymentRollup,
    pub test: TestRollup,
    pub quality_scan: QualityRollup,
    pub source_control: SourceControlRollup,
    pub category_counts: BTreeMap<String, usize>,
    pub severity_counts: SeverityCounts,
    pub timeline: Vec<TimelineEntry>,
    pub total_records: usize,
    pub llm_responses: usize,
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() { return 0.0; }
    xs.iter().sum::<f64>() / xs.len() as f64
}

pub fn mean_u64(xs: &[u64]) -> f64 {
    if xs.is_empty() { return 0.0; }
    xs.iter().map(|x| *x as f64).sum::<f64>() / xs.len() as f64
}

/// Percentage, `0.0` when `total` is zero.
pub fn rate(part: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { part as f64 / total as f64 * 100.0 }
}

impl BuildRollup {
    pub fn success_rate(&self) -> f64 { rate(self.success, self.total) }
    pub fn average_duration(&self) -> f64 { mean(&self.durations) }
}

impl DeploymentRollup {
    pub fn success_rate(&self) -> f64 { rate(self.success, self.total) }
    pub fn average_duration(&self) -> f64 { mean(&self.durations) }
}

impl TestRollup {
    pub fn success_rate(&self) -> f64 { rate(self.success, self.total) }
    pub fn average_coverage(&self) -> f64 { mean(&self.coverage) }
}

impl QualityRollup {
    pub fn success_rate(&self) -> f64 { rate(self.success, self.total) }
    pub fn average_coverage(&self) -> f64 { mean(&self.coverage) }
    pub fn average_bugs(&self) -> f64 { mean_u64(&self.bugs) }
    pub fn average_vulnerabilities(&self) -> f64 { mean_u64(&self.vulnerabilities) }
}

impl MetricsSnapshot {
    /// Build and deployment successes over their combined totals.
    pub fn pipeline_success_rate(&self) -> f64 {
        rate(self.build.success + self.deployment.success, self.build.total + self.deployment.total)
    }

    /// Share of records carrying a non-empty `llm_response`.
    pub fn llm_coverage(&self) -> f64 { rate(self.llm_responses, self.total_records) }

    /// Build and deployment error counts per run.
    pub fn error_rate(&self) -> f64 {
        let runs = self.build.total + self.deployment.total;
        if runs == 0 { return 0.0; }
        let errors: u64 = self.build.errors.iter().chain(self.deployment.errors.iter()).sum();
        errors as f64 / runs as f64
    }
}

pub fn aggregate(records: &[NormalizedRecord]) -> MetricsSnapshot {
    let mut snap = MetricsSnapshot::default();
    snap.total_records = records.len();
    for rec in records {
        snap.llm_responses += usize::from(rec.raw.get_str("llm_response").is_some());
        *snap.category_counts.entry(rec.category.to_string()).or_insert(0) += 1;
        snap.severity_counts.add(rec.severity);
        fold_rollup(&mut snap, rec);
        match rec.timestamp {
            Some(timestamp) => snap.timeline.push(TimelineEntry {
                timestamp,
                category: rec.category.clone(),
                success: rec.success,
                error_count: rec.error_count,
                severity: rec.severity,
            }),
            None => tracing::debug!(category = %rec.category, "record has no parseable timestamp; left out of timeline"),
        }
    }
    snap.timeline.sort_by_key(|e| e.timestamp);
    snap
}

fn fold_rollup(snap: &mut MetricsSnapshot, rec: &NormalizedRecord) {
    let ok = usize::from(rec.success);
    match rec.category {
        Category::Build => {
            let r = &mut snap.build;
            r.total += 1;
            r.success += ok;
            r.durations.extend(rec.build.duration_seconds);
            r.errors.extend(rec.build.error_count);
            r.warnings.extend(rec.build.warning_count);
        }
        Category::Deployment => {
            let r = &mut snap.deployment;
            r.total += 1;
            r.success += ok;
            r.durations.extend(rec.deployment.duration_seconds);
            r.errors.extend(rec.deployment.error_count);
            r.fatal += usize::from(rec.deployment.fatal == Some(true));
            r.rollbacks += usize::from(rec.deployment.rollback_initiated == Some(true));
        }
        Category::Test => {
            let r = &mut snap.test;
            r.total += 1;
            r.success += ok;
            r.coverage.extend(rec.test.coverage);
            r.cases.extend(rec.test.cases_found);
            r.failures.extend(rec.test.failures);
            r.errors.extend(rec.test.error_count);
        }
        Category::QualityScan => {
            let r = &mut snap.quality_scan;
            let q = &rec.quality;
            r.total += 1;
            r.success += ok;
            r.coverage.extend(q.code_coverage);
            r.bugs.extend(q.bugs);
            r.vulnerabilities.extend(q.vulnerabilities);
            r.code_smells.extend(q.code_smells);
            r.debt_hours.extend(q.technical_debt_hours);
            r.duplicated_lines.extend(q.duplicated_lines);
            r.quality_gate_passed += usize::from(q.quality_gate_passed == Some(true));
        }
        Category::SourceControl => {
            let r = &mut snap.source_control;
            r.total += 1;
            r.success += ok;
            if let Some(errors) = rec.source_control.errors.as_ref() {
                r.errors.extend(errors.iter().cloned());
            }
            r.fatal += usize::from(rec.source_control.fatal == Some(true));
        }
        Category::Unknown | Category::Other(_) => {}
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingPoint {
    pub timestamp: DateTime<Utc>,
    pub rate: f64,
    pub successes: usize,
    pub window: usize,
}

/// Trailing success rate over the last `min(5, n)` entries, oldest first.
/// Early positions divide by the shorter slice actually available.
pub fn rolling_success_rate(timeline: &[TimelineEntry], category: Option<&Category>) -> Vec<RollingPoint> {
    let mut entries: Vec<&TimelineEntry> = timeline
        .iter()
        .filter(|e| category.map(|c| &e.category == c).unwrap_or(true))
        .collect();
    entries.sort_by_key(|e| e.timestamp);
    let window = ROLLING_WINDOW.min(entries.len());
    (0..entries.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &entries[start..=i];
            let successes = slice.iter().filter(|e| e.success).count();
            RollingPoint {
                timestamp: entries[i].timestamp,
                rate: rate(successes, slice.len()),
                successes,
                window: slice.len(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Hour,
    Day,
    Week,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown granularity {0:?}; expected hour, day or week")]
pub struct ParseGranularityError(pub String);

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            _ => Err(ParseGranularityError(s.to_string())),
        }
    }
}

/// Calendar key of `ts` in `offset`: `YYYY-MM-DD HH:00`, `YYYY-MM-DD`, or the
/// `YYYY-MM-DD` of the Sunday that starts its week.
pub fn bucket_key(ts: DateTime<Utc>, granularity: Granularity, offset: &FixedOffset) -> String {
    let local = ts.with_timezone(offset);
    match granularity {
        Granularity::Hour => local.format("%Y-%m-%d %H:00").to_string(),
        Granularity::Day => local.format("%Y-%m-%d").to_string(),
        Granularity::Week => {
            let date = local.date_naive();
            let back = i64::from(date.weekday().num_days_from_sunday());
            (date - Duration::days(back)).format("%Y-%m-%d").to_string()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeBucket {
    pub key: String,
    pub total: usize,
    pub successes: usize,
    pub errors: u64,
    pub severity: SeverityCounts,
}

impl TimeBucket {
    pub fn success_rate(&self) -> f64 { rate(self.successes, self.total) }
}

/// Histogram buckets in ascending key order.
pub fn bucketize(
    timeline: &[TimelineEntry],
    granularity: Granularity,
    offset: &FixedOffset,
    category: Option<&Category>,
) -> Vec<TimeBucket> {
    let mut buckets: BTreeMap<String, TimeBucket> = BTreeMap::new();
    for e in timeline {
        if let Some(c) = category {
            if &e.category != c { continue; }
        }
        let key = bucket_key(e.timestamp, granularity, offset);
        let b = buckets.entry(key.clone()).or_insert_with(|| TimeBucket { key, ..Default::default() });
        b.total += 1;
        b.successes += usize::from(e.success);
        b.errors = b.errors.saturating_add(e.error_count);
        b.severity.add(e.severity);
    }
    buckets.into_values().collect()
}
