use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal urgency; variant order gives `Unknown < Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

// Checked in this order; the first keyword contained in the text wins.
const PRIORITY: [(&str, Severity); 4] = [
    ("critical", Severity::Critical),
    ("high", Severity::High),
    ("medium", Severity::Medium),
    ("low", Severity::Low),
];

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unknown => "unknown",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn is_alert(&self) -> bool { *self >= Severity::High }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

pub fn normalize_severity(text: &str) -> Severity {
    let lower = text.to_lowercase();
    PRIORITY
        .iter()
        .find(|(kw, _)| lower.contains(*kw))
        .map(|(_, sev)| *sev)
        .unwrap_or(Severity::Unknown)
}

pub fn normalize_severity_opt(text: Option<&str>) -> Severity {
    text.map(normalize_severity).unwrap_or_default()
}

/// Per-level tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    pub fn add(&mut self, sev: Severity) {
        match sev {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Unknown => self.unknown += 1,
        }
    }

    pub fn total(&self) -> usize { self.critical + self.high + self.medium + self.low + self.unknown }
}
