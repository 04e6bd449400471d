use anyhow::Context;
use chrono::FixedOffset;
use clap::Parser;
use pipelens::aggregate::{self, Granularity};
use pipelens::classify::Category;
use pipelens::filter::{self, FilterCriteria};
use pipelens::record::RawRecord;
use pipelens::{input, normalize, project_stats};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

fn init_parallelism(threads: Option<usize>) {
    static START: Once = Once::new();
    START.call_once(|| {
        let n = threads.unwrap_or_else(num_cpus::get).max(1);
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    });
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

#[derive(Parser, Debug)]
#[command(name = "pipelens", version, about = "Normalize and aggregate CI/CD analysis records")]
struct Cli {
    /// Input files (`-` for stdin): a JSON array or one JSON object per line.
    #[arg(required = false)]
    input: Vec<String>,

    #[arg(long = "environment")] environment: Option<String>,
    #[arg(long = "server")] server: Option<String>,
    /// Case-insensitive substring of the raw severity text
    #[arg(long = "severity")] severity: Option<String>,
    /// build | deployment | test | quality_scan | source_control | unknown | <label>
    #[arg(long = "category")] category: Option<String>,

    /// Bucket size for --only buckets: hour | day | week
    #[arg(long = "granularity", default_value = "hour")] granularity: Granularity,
    /// Offset applied before taking calendar fields for bucket keys
    #[arg(long = "utc-offset-minutes", default_value_t = 0, allow_hyphen_values = true)] utc_offset_minutes: i32,

    /// Projects for --only projects (default: every project seen)
    #[arg(long = "project")] project: Vec<String>,

    /// Section to print: snapshot | records | projects | rolling | buckets | alerts
    #[arg(long = "only", default_value = "snapshot")] only: String,
    /// Skip lines that are not JSON objects instead of failing
    #[arg(long = "lossy", default_value_t = false)] lossy: bool,
    #[arg(long = "pretty", default_value_t = false)] pretty: bool,
    /// Worker threads for normalization (default: number of CPUs)
    #[arg(long = "threads")] threads: Option<usize>,
}

fn read_inputs(paths: &[String], lossy: bool) -> anyhow::Result<Vec<RawRecord>> {
    let mut out = Vec::new();
    for p in paths {
        let text = if p == "-" {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            buf
        } else {
            fs::read_to_string(p).with_context(|| format!("reading {p}"))?
        };
        if lossy {
            let (records, skipped) = input::parse_records_lossy(&text);
            if skipped > 0 {
                tracing::warn!(file = %p, skipped, "skipped malformed lines");
            }
            out.extend(records);
        } else {
            out.extend(input::parse_records(&text).with_context(|| format!("parsing {p}"))?);
        }
    }
    Ok(out)
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let s = if pretty { serde_json::to_string_pretty(value)? } else { serde_json::to_string(value)? };
    println!("{s}");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    init_parallelism(cli.threads);

    let input_files = if cli.input.is_empty() { vec!["-".to_string()] } else { cli.input.clone() };
    let raw = read_inputs(&input_files, cli.lossy)?;
    tracing::info!(records = raw.len(), "loaded records");

    if cli.only == "projects" {
        let names = if cli.project.is_empty() { project_stats::project_names(&raw) } else { cli.project.clone() };
        return emit(&project_stats::build_project_stats(&names, &raw), cli.pretty);
    }

    let criteria = FilterCriteria {
        environment: cli.environment.clone(),
        server: cli.server.clone(),
        severity: cli.severity.clone(),
        category: cli.category.as_deref().map(|c| Category::from_label(&c.trim().to_lowercase())),
    };
    let normalized = normalize::normalize_par(&raw);
    let filtered = filter::filter(&normalized, &criteria);

    match cli.only.as_str() {
        "records" => emit(&filtered, cli.pretty),
        "alerts" => emit(&filter::alerts(&filtered), cli.pretty),
        "rolling" | "buckets" | "snapshot" => {
            let snapshot = aggregate::aggregate(&filtered);
            match cli.only.as_str() {
                "rolling" => emit(
                    &aggregate::rolling_success_rate(&snapshot.timeline, criteria.category.as_ref()),
                    cli.pretty,
                ),
                "buckets" => {
                    let offset = FixedOffset::east_opt(cli.utc_offset_minutes * 60)
                        .context("--utc-offset-minutes out of range")?;
                    emit(&aggregate::bucketize(&snapshot.timeline, cli.granularity, &offset, None), cli.pretty)
                }
                _ => emit(&snapshot, cli.pretty),
            }
        }
        other => anyhow::bail!("unknown --only section {other:?}"),
    }
}
