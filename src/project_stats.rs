use crate::record::RawRecord;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectStat {
    pub project: String,
    pub tool: String,
    pub count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub success_rate: f64,
    pub latest_timestamp: Option<DateTime<Utc>>,
    pub status: ProjectStatus,
}

/// `Error` on any failure, `Warning` for a rate in `[50, 70)`, else `Success`.
pub fn derive_status(success_rate: f64, failure_count: usize) -> ProjectStatus {
    if failure_count > 0 {
        ProjectStatus::Error
    } else if (50.0..70.0).contains(&success_rate) {
        ProjectStatus::Warning
    } else {
        ProjectStatus::Success
    }
}

fn round1(x: f64) -> f64 { (x * 10.0).round() / 10.0 }

/// One stat per (project, tool) pair, projects in the given order and tools
/// in order of first appearance.
pub fn build_project_stats(project_names: &[String], records: &[RawRecord]) -> Vec<ProjectStat> {
    let mut out = Vec::new();
    for name in project_names {
        let in_project: Vec<&RawRecord> = records
            .iter()
            .filter(|r| r.get_str("project") == Some(name.as_str()))
            .collect();
        let tools: Vec<&str> = in_project.iter().filter_map(|r| r.get_str("tool")).unique().collect();
        for tool in tools {
            let group: Vec<&&RawRecord> = in_project.iter().filter(|r| r.get_str("tool") == Some(tool)).collect();
            let count = group.len();
            let success_count = group.iter().filter(|r| r.get_str("status") == Some("success")).count();
            let failure_count = count - success_count;
            let success_rate = if count == 0 { 0.0 } else { success_count as f64 / count as f64 * 100.0 };
            let latest_timestamp = group.iter().filter_map(|r| r.timestamp()).max();
            out.push(ProjectStat {
                project: name.clone(),
                tool: tool.to_string(),
                count,
                success_count,
                failure_count,
                success_rate: round1(success_rate),
                latest_timestamp,
                status: derive_status(success_rate, failure_count),
            });
        }
    }
    out
}

/// Distinct project names in order of first appearance.
pub fn project_names(records: &[RawRecord]) -> Vec<String> {
    records.iter().filter_map(|r| r.get_str("project")).unique().map(str::to_string).collect()
}

/// Tool name to the sorted, distinct projects that use it.
pub fn group_projects_by_tool(records: &[RawRecord]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for r in records {
        if let (Some(tool), Some(project)) = (r.get_str("tool"), r.get_str("project")) {
            grouped.entry(tool.to_string()).or_default().insert(project.to_string());
        }
    }
    grouped.into_iter().map(|(tool, projects)| (tool, projects.into_iter().collect())).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardTotals {
    pub projects: usize,
    pub runs: usize,
    pub average_success_rate: f64,
}

pub fn dashboard_totals(stats: &[ProjectStat]) -> DashboardTotals {
    let runs: usize = stats.iter().map(|s| s.count).sum();
    let average_success_rate = if stats.is_empty() {
        0.0
    } else {
        stats.iter().map(|s| s.success_rate).sum::<f64>() / stats.len() as f64
    };
    DashboardTotals { projects: stats.len(), runs, average_success_rate }
}
