pub mod record;
pub mod duration;
pub mod extract;
pub mod severity;
pub mod classify;
pub mod normalize;
pub mod filter;
pub mod aggregate;
pub mod project_stats;
pub mod input;

pub use aggregate::{aggregate, MetricsSnapshot, TimelineEntry};
pub use classify::Category;
pub use filter::{filter, FilterCriteria};
pub use normalize::{normalize, NormalizedRecord};
pub use project_stats::{build_project_stats, ProjectStat};
pub use record::RawRecord;
pub use severity::Severity;

#[cfg(test)]
mod extract_tests;
