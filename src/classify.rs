use crate::record::RawRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Canonical pipeline stage of a record, or a pass-through label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Build,
    Deployment,
    Test,
    QualityScan,
    SourceControl,
    Unknown,
    Other(String),
}

impl Category {
    /// Maps a lower-cased label onto the fixed set, keeping anything
    /// unrecognised as `Other`. `sonarqube` and `git` are legacy spellings.
    pub fn from_label(label: &str) -> Category {
        match label {
            "build" => Category::Build,
            "deployment" => Category::Deployment,
            "test" => Category::Test,
            "quality_scan" | "sonarqube" => Category::QualityScan,
            "source_control" | "git" => Category::SourceControl,
            "unknown" | "" => Category::Unknown,
            other => Category::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Build => "build",
            Category::Deployment => "deployment",
            Category::Test => "test",
            Category::QualityScan => "quality_scan",
            Category::SourceControl => "source_control",
            Category::Unknown => "unknown",
            Category::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { s.serialize_str(self.as_str()) }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Ok(Category::from_label(&s.trim().to_lowercase()))
    }
}

pub const LOG_TYPE_KEY: &str = "log_type";
pub const TOOL_KEY: &str = "tool";

pub const CI_RUNNERS: [&str; 8] = [
    "github_actions",
    "jenkins",
    "gitlab_ci",
    "circleci",
    "travis",
    "azure_pipelines",
    "bamboo",
    "teamcity",
];

const TOOL_KEYWORDS: [(&str, Category); 5] = [
    ("sonar", Category::QualityScan),
    ("test", Category::Test),
    ("build", Category::Build),
    ("deploy", Category::Deployment),
    ("git", Category::SourceControl),
];

static SUMMARY_HINTS: Lazy<Vec<(Regex, Category)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"sonarqube|quality gate").unwrap(), Category::QualityScan),
        (Regex::new(r"test(ing|s|ed)").unwrap(), Category::Test),
        (Regex::new(r"build").unwrap(), Category::Build),
        (Regex::new(r"deploy").unwrap(), Category::Deployment),
    ]
});

type Stage = fn(&RawRecord) -> Option<Category>;

// First stage returning Some wins.
const STAGES: [(&str, Stage); 2] = [
    ("explicit_log_type", explicit_log_type),
    ("tool_name", tool_heuristic),
];

pub fn classify(rec: &RawRecord) -> Category {
    for (name, stage) in STAGES.iter() {
        if let Some(cat) = stage(rec) {
            tracing::trace!(stage = *name, category = %cat, "classified record");
            return cat;
        }
    }
    Category::Unknown
}

fn explicit_log_type(rec: &RawRecord) -> Option<Category> {
    rec.get_str(LOG_TYPE_KEY)
        .map(|s| Category::from_label(&s.trim().to_lowercase()))
}

fn tool_heuristic(rec: &RawRecord) -> Option<Category> {
    let tool = rec.get_str(TOOL_KEY)?.trim().to_lowercase();
    Some(classify_tool(&tool, rec.summary().as_deref()))
}

/// Tool-name keywords, then the summary text for CI runners with no keyword;
/// otherwise the tool name itself is the label.
pub fn classify_tool(tool: &str, summary: Option<&str>) -> Category {
    if let Some((_, cat)) = TOOL_KEYWORDS.iter().find(|(kw, _)| tool.contains(*kw)) {
        return cat.clone();
    }
    if CI_RUNNERS.contains(&tool) {
        if let Some(cat) = classify_summary(summary) {
            return cat;
        }
        tracing::debug!(tool, "no summary hint for CI runner; keeping tool label");
    }
    Category::from_label(tool)
}

pub fn classify_summary(summary: Option<&str>) -> Option<Category> {
    let lower = summary?.to_lowercase();
    SUMMARY_HINTS
        .iter()
        .find(|(re, _)| re.is_match(&lower))
        .map(|(_, cat)| cat.clone())
}
