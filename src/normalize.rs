use crate::classify::{classify, Category};
use crate::duration::parse_duration;
use crate::extract;
use crate::record::RawRecord;
use crate::severity::{normalize_severity_opt, Severity};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildMetrics {
    pub success: Option<bool>,
    pub duration: Option<String>,
    pub duration_seconds: Option<f64>,
    pub error_count: Option<u64>,
    pub warning_count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestMetrics {
    pub coverage: Option<f64>,
    pub cases_found: Option<u64>,
    pub tests_run: Option<u64>,
    pub failures: Option<u64>,
    pub error_count: Option<u64>,
    pub skipped: Option<u64>,
    pub pass_rate: Option<f64>,
    pub fatal: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub code_coverage: Option<f64>,
    pub bugs: Option<u64>,
    pub vulnerabilities: Option<u64>,
    pub code_smells: Option<u64>,
    pub quality_gate_passed: Option<bool>,
    pub technical_debt_hours: Option<f64>,
    pub duplicated_lines: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeploymentMetrics {
    pub success: Option<bool>,
    pub duration_seconds: Option<f64>,
    pub error_count: Option<u64>,
    pub fatal: Option<bool>,
    pub rollback_initiated: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceControlMetrics {
    pub errors: Option<Vec<String>>,
    pub fatal: Option<bool>,
}

/// A raw record with its category, severity and backfilled metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub raw: RawRecord,
    pub category: Category,
    pub severity: Severity,
    pub timestamp: Option<DateTime<Utc>>,
    pub success: bool,
    pub error_count: u64,
    pub build: BuildMetrics,
    pub test: TestMetrics,
    pub quality: QualityMetrics,
    pub deployment: DeploymentMetrics,
    pub source_control: SourceControlMetrics,
}

impl NormalizedRecord {
    pub fn environment(&self) -> Option<&str> { self.raw.get_str("environment") }
    pub fn server(&self) -> Option<&str> { self.raw.get_str("server") }
    pub fn project(&self) -> Option<&str> { self.raw.get_str("project") }
    pub fn tool(&self) -> Option<&str> { self.raw.get_str("tool") }
    pub fn severity_text(&self) -> Option<&str> { self.raw.severity_text() }
}

pub fn normalize(records: &[RawRecord]) -> Vec<NormalizedRecord> {
    records.iter().map(normalize_record).collect()
}

/// Same output as [`normalize`], computed on the rayon pool.
pub fn normalize_par(records: &[RawRecord]) -> Vec<NormalizedRecord> {
    records.par_iter().map(normalize_record).collect()
}

pub fn normalize_record(raw: &RawRecord) -> NormalizedRecord {
    let category = classify(raw);
    let summary = raw.summary();
    let blob = summary.as_deref();
    // Text mining only feeds the metric group of the record's own category.
    let mined = |cat: Category| if category == cat { blob } else { None };

    let build = build_metrics(raw, mined(Category::Build));
    let test = test_metrics(raw, mined(Category::Test));
    let quality = quality_metrics(raw, mined(Category::QualityScan));
    let deployment = deployment_metrics(raw, mined(Category::Deployment));
    let source_control = source_control_metrics(raw, mined(Category::SourceControl));

    let success = match category {
        Category::Build => build.success.unwrap_or(false),
        Category::Deployment => deployment.success.unwrap_or(false),
        Category::Test => match test.pass_rate {
            Some(rate) => rate > 80.0,
            None => !extract::test_failed(blob).unwrap_or(false),
        },
        Category::QualityScan => quality.quality_gate_passed.unwrap_or(true),
        _ => raw.get_str("status") == Some("success"),
    };

    let counted = raw.get_u64("error_count").unwrap_or(0).saturating_add(match category {
        Category::Build => sum(&[build.error_count, build.warning_count]),
        Category::Deployment => {
            sum(&[deployment.error_count, flag(deployment.fatal)])
        }
        Category::Test => sum(&[test.error_count, test.failures]),
        Category::QualityScan => sum(&[quality.bugs, quality.vulnerabilities]),
        Category::SourceControl => sum(&[
            source_control.errors.as_ref().map(|e| e.len() as u64),
            flag(source_control.fatal),
        ]),
        _ => 0,
    });
    let error_count = if counted == 0 { extract::failure_tokens(blob) } else { counted };

    NormalizedRecord {
        raw: raw.clone(),
        severity: normalize_severity_opt(raw.severity_text()),
        timestamp: raw.timestamp(),
        category,
        success,
        error_count,
        build,
        test,
        quality,
        deployment,
        source_control,
    }
}

fn sum(parts: &[Option<u64>]) -> u64 {
    parts.iter().flatten().fold(0u64, |acc, n| acc.saturating_add(*n))
}

fn flag(b: Option<bool>) -> Option<u64> {
    b.map(u64::from)
}

fn build_metrics(raw: &RawRecord, s: Option<&str>) -> BuildMetrics {
    let duration = raw
        .get_str("build_duration")
        .map(str::to_string)
        .or_else(|| extract::build_duration(s));
    let duration_seconds = raw
        .get_f64("build_duration_seconds")
        .filter(|d| *d >= 0.0)
        .or_else(|| duration.as_deref().map(|d| parse_duration(d) as f64));
    BuildMetrics {
        success: raw.get_bool("build_success").or_else(|| extract::build_success(s)),
        duration,
        duration_seconds,
        error_count: raw.get_u64("build_error_count").or_else(|| extract::error_tokens(s)),
        warning_count: raw.get_u64("build_warning_count").or_else(|| extract::warning_tokens(s)),
    }
}

fn test_metrics(raw: &RawRecord, s: Option<&str>) -> TestMetrics {
    TestMetrics {
        coverage: raw.get_f64("test_coverage").or_else(|| extract::test_coverage(s)),
        cases_found: raw.get_u64("test_cases_found").or_else(|| extract::test_cases_found(s)),
        tests_run: raw.get_u64("tests_run").or_else(|| extract::tests_run(s)),
        failures: raw.get_u64("test_failures").or_else(|| extract::test_failures(s)),
        error_count: raw.get_u64("test_error_count").or_else(|| extract::error_tokens(s)),
        skipped: raw.get_u64("test_skipped"),
        pass_rate: raw.get_f64("test_pass_rate"),
        fatal: raw.get_bool("test_fatal"),
    }
}

fn quality_metrics(raw: &RawRecord, s: Option<&str>) -> QualityMetrics {
    QualityMetrics {
        code_coverage: raw.get_f64("code_coverage").or_else(|| extract::code_coverage(s)),
        bugs: raw.get_u64("bugs").or_else(|| extract::sonar_bugs(s)),
        vulnerabilities: raw.get_u64("vulnerabilities").or_else(|| extract::sonar_vulnerabilities(s)),
        code_smells: raw.get_u64("code_smells").or_else(|| extract::sonar_code_smells(s)),
        quality_gate_passed: raw.get_bool("quality_gate_passed").or_else(|| extract::quality_gate_passed(s)),
        technical_debt_hours: raw.get_f64("technical_debt_hours").or_else(|| extract::technical_debt_hours(s)),
        duplicated_lines: raw.get_f64("duplicated_lines").or_else(|| extract::duplicated_lines(s)),
    }
}

fn deployment_metrics(raw: &RawRecord, s: Option<&str>) -> DeploymentMetrics {
    // Upstream stores this either as seconds or as "2m 10s" text.
    let explicit_duration = match raw.get("deployment_duration") {
        Some(Value::Number(n)) => n.as_f64().filter(|d| d.is_finite() && *d >= 0.0),
        Some(Value::String(t)) if !t.trim().is_empty() => Some(parse_duration(t) as f64),
        _ => None,
    };
    DeploymentMetrics {
        success: raw.get_bool("deployment_success").or_else(|| extract::deployment_success(s)),
        duration_seconds: explicit_duration
            .or_else(|| extract::deployment_duration(s).map(|d| parse_duration(&d) as f64)),
        error_count: raw.get_u64("deployment_error_count").or_else(|| extract::error_tokens(s)),
        fatal: raw.get_bool("deployment_fatal").or_else(|| extract::fatal(s)),
        rollback_initiated: raw.get_bool("rollback_initiated").or_else(|| extract::rollback_initiated(s)),
    }
}

fn source_control_metrics(raw: &RawRecord, s: Option<&str>) -> SourceControlMetrics {
    SourceControlMetrics {
        errors: raw.get_str_list("git_errors").or_else(|| extract::error_lines(s)),
        fatal: raw.get_bool("git_fatal").or_else(|| extract::fatal(s)),
    }
}
