use crate::classify::Category;
use crate::normalize::NormalizedRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Compound predicate; unset or empty criteria pass everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub environment: Option<String>,
    pub server: Option<String>,
    pub severity: Option<String>,
    pub category: Option<Category>,
}

impl FilterCriteria {
    pub fn matches(&self, rec: &NormalizedRecord) -> bool {
        if let Some(env) = active(&self.environment) {
            if rec.environment() != Some(env) { return false; }
        }
        if let Some(server) = active(&self.server) {
            if rec.server() != Some(server) { return false; }
        }
        if let Some(sev) = active(&self.severity) {
            let text = rec.severity_text().unwrap_or("").to_lowercase();
            if !text.contains(&sev.to_lowercase()) { return false; }
        }
        if let Some(cat) = self.category.as_ref() {
            if &rec.category != cat { return false; }
        }
        true
    }
}

fn active(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

/// Order-preserving AND filter.
pub fn filter(records: &[NormalizedRecord], criteria: &FilterCriteria) -> Vec<NormalizedRecord> {
    records.iter().filter(|r| criteria.matches(r)).cloned().collect()
}

/// Distinct servers, sorted, optionally within one environment.
pub fn available_servers(records: &[NormalizedRecord], environment: Option<&str>) -> Vec<String> {
    let set: BTreeSet<&str> = records
        .iter()
        .filter(|r| environment.map(|e| r.environment() == Some(e)).unwrap_or(true))
        .filter_map(|r| r.server())
        .collect();
    set.into_iter().map(str::to_string).collect()
}

/// High and critical records in input order.
pub fn alerts(records: &[NormalizedRecord]) -> Vec<&NormalizedRecord> {
    records.iter().filter(|r| r.severity.is_alert()).collect()
}
