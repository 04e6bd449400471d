use chrono::{FixedOffset, TimeZone, Utc};
use pipelens::aggregate::{aggregate, bucket_key, bucketize, rate, rolling_success_rate, Granularity, TimelineEntry};
use pipelens::classify::Category;
use pipelens::normalize::normalize;
use pipelens::record::RawRecord;
use pipelens::severity::Severity;
use serde_json::json;

fn raw(values: Vec<serde_json::Value>) -> Vec<RawRecord> {
    values.into_iter().map(|v| RawRecord::from_value(v).unwrap()).collect()
}

fn entry(minute: u32, success: bool) -> TimelineEntry {
    TimelineEntry {
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap(),
        category: Category::Build,
        success,
        error_count: 0,
        severity: Severity::Unknown,
    }
}

#[test]
fn rolling_rate_over_trailing_window() {
    let timeline: Vec<TimelineEntry> = [true, true, false, true, true, false]
        .iter()
        .enumerate()
        .map(|(i, ok)| entry(i as u32, *ok))
        .collect();
    let points = rolling_success_rate(&timeline, None);
    assert_eq!(points.len(), 6);
    assert_eq!(points[0].rate, 100.0);
    assert_eq!(points[2].window, 3);
    assert!((points[2].rate - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(points[5].window, 5);
    assert_eq!(points[5].rate, 60.0);
}

#[test]
fn rolling_rate_sorts_and_filters_by_category() {
    let mut timeline = vec![entry(5, false), entry(1, true)];
    timeline.push(TimelineEntry { category: Category::Test, ..entry(3, false) });
    let points = rolling_success_rate(&timeline, Some(&Category::Build));
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].rate, 100.0);
    assert_eq!(points[1].rate, 50.0);
    assert!(rolling_success_rate(&[], None).is_empty());
}

#[test]
fn snapshot_rollups_and_counts() {
    let recs = normalize(&raw(vec![
        json!({"log_type": "build", "build_success": true, "build_duration_seconds": 60, "build_error_count": 1, "timestamp": "2024-03-01T10:00:00Z", "severity_level": "low"}),
        json!({"log_type": "build", "build_success": false, "build_duration_seconds": 120, "build_error_count": 3, "timestamp": "2024-03-01T09:00:00Z", "severity_level": "high"}),
        json!({"log_type": "deployment", "deployment_success": true, "deployment_duration": "1m", "timestamp": "2024-03-01T11:00:00Z"}),
        json!({"log_type": "quality_scan", "bugs": 4, "code_coverage": 70.0, "quality_gate_passed": true}),
        json!({"tool": "ansible", "status": "success", "timestamp": "not a time"}),
    ]));
    let snap = aggregate(&recs);

    assert_eq!(snap.build.total, 2);
    assert_eq!(snap.build.success_rate(), 50.0);
    assert_eq!(snap.build.average_duration(), 90.0);
    assert_eq!(snap.build.errors, vec![1, 3]);
    assert_eq!(snap.deployment.durations, vec![60.0]);
    assert_eq!(snap.quality_scan.bugs, vec![4]);
    assert_eq!(snap.quality_scan.quality_gate_passed, 1);
    assert!((snap.pipeline_success_rate() - 200.0 / 3.0).abs() < 1e-9);
    assert!((snap.error_rate() - 4.0 / 3.0).abs() < 1e-9);

    assert_eq!(snap.category_counts.get("build"), Some(&2));
    assert_eq!(snap.category_counts.get("ansible"), Some(&1));
    assert_eq!(snap.severity_counts.total(), 5);
    assert_eq!(snap.severity_counts.high, 1);

    // records without a parseable timestamp are counted but not plotted
    assert_eq!(snap.timeline.len(), 3);
    let hours: Vec<String> = snap.timeline.iter().map(|e| e.timestamp.format("%H").to_string()).collect();
    assert_eq!(hours, vec!["09", "10", "11"]);
}

#[test]
fn empty_snapshot_rates_are_zero() {
    let snap = aggregate(&[]);
    assert_eq!(snap.build.success_rate(), 0.0);
    assert_eq!(snap.test.average_coverage(), 0.0);
    assert_eq!(snap.pipeline_success_rate(), 0.0);
    assert_eq!(snap.error_rate(), 0.0);
    assert_eq!(rate(3, 0), 0.0);
}

#[test]
fn aggregation_is_deterministic() {
    let recs = normalize(&raw(vec![
        json!({"tool": "jenkins", "executive_summary": "Build successful", "timestamp": "2024-03-01T10:00:00Z"}),
        json!({"tool": "zeta", "status": "success"}),
        json!({"tool": "alpha", "status": "failed"}),
    ]));
    let a = serde_json::to_string(&aggregate(&recs)).unwrap();
    let b = serde_json::to_string(&aggregate(&recs)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn bucket_keys_per_granularity() {
    let utc = FixedOffset::east_opt(0).unwrap();
    // Wednesday
    let ts = Utc.with_ymd_and_hms(2024, 3, 6, 23, 15, 0).unwrap();
    assert_eq!(bucket_key(ts, Granularity::Hour, &utc), "2024-03-06 23:00");
    assert_eq!(bucket_key(ts, Granularity::Day, &utc), "2024-03-06");
    assert_eq!(bucket_key(ts, Granularity::Week, &utc), "2024-03-03");

    let plus2 = FixedOffset::east_opt(2 * 3600).unwrap();
    assert_eq!(bucket_key(ts, Granularity::Day, &plus2), "2024-03-07");

    let sunday = Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap();
    assert_eq!(bucket_key(sunday, Granularity::Week, &utc), "2024-03-03");
}

#[test]
fn buckets_accumulate_in_key_order() {
    let utc = FixedOffset::east_opt(0).unwrap();
    let mut late = entry(0, false);
    late.timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    late.error_count = 2;
    let timeline = vec![late, entry(10, true), entry(20, false)];
    let buckets = bucketize(&timeline, Granularity::Hour, &utc, None);
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].key, "2024-03-01 10:00");
    assert_eq!(buckets[0].total, 2);
    assert_eq!(buckets[0].success_rate(), 50.0);
    assert_eq!(buckets[1].errors, 2);
    assert!(bucketize(&timeline, Granularity::Day, &utc, Some(&Category::Test)).is_empty());
}

#[test]
fn granularity_parses_case_insensitively() {
    assert_eq!("Week".parse::<Granularity>(), Ok(Granularity::Week));
    assert!("month".parse::<Granularity>().is_err());
}

#[test]
fn quality_averages_and_llm_coverage() {
    let recs = normalize(&raw(vec![
        json!({"log_type": "quality_scan", "bugs": 4, "vulnerabilities": 1, "llm_response": "Bugs: 4"}),
        json!({"log_type": "quality_scan", "bugs": 2, "vulnerabilities": 0, "llm_response": "   "}),
        json!({"log_type": "build", "llm_response": "Build successful"}),
        json!({"log_type": "build"}),
    ]));
    let snap = aggregate(&recs);
    assert_eq!(snap.quality_scan.average_bugs(), 3.0);
    assert_eq!(snap.quality_scan.average_vulnerabilities(), 0.5);
    assert_eq!(snap.total_records, 4);
    assert_eq!(snap.llm_responses, 2);
    assert_eq!(snap.llm_coverage(), 50.0);
    assert_eq!(aggregate(&[]).llm_coverage(), 0.0);
}
