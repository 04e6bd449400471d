use once_cell::sync::Lazy;
use regex::Regex;

/// A named, case-insensitive pattern applied to a Summary Blob.
pub struct Rule {
    pub name: &'static str,
    re: Lazy<Regex>,
}

impl Rule {
    pub fn regex(&self) -> &Regex { &self.re }

    fn capture<'a>(&self, summary: &'a str) -> Option<&'a str> {
        self.re.captures(summary).and_then(|c| c.get(1)).map(|m| m.as_str())
    }

    fn is_match(&self, summary: &str) -> bool { self.re.is_match(summary) }
}

macro_rules! rule {
    ($ident:ident, $name:literal, $pat:literal) => {
        pub static $ident: Rule = Rule { name: $name, re: Lazy::new(|| Regex::new($pat).unwrap()) };
    };
}

rule!(BUILD_SUCCESS, "build_success", r"(?i)build (success|successful)");
rule!(BUILD_TIME, "build_time", r"(?i)build time:?\s*([\dhms :]+)");
rule!(TOTAL_TIME, "total_time", r"(?i)total time:?\s*([\dhms :]+)");
rule!(TEST_COVERAGE, "test_coverage", r"(?i)(?:test coverage|coverage):?\s*(\d+\.?\d*)%");
rule!(TEST_CASES_FOUND, "test_cases_found", r"(?i)found (\d+) test cases");
rule!(TESTS_RUN, "tests_run", r"(?i)tests run:?\s*(\d+)");
rule!(TEST_FAILURES, "test_failures", r"(?i)failures:?\s*(\d+)");
rule!(TEST_FAILED, "test_failed", r"(?i)test.*fail");
rule!(CODE_COVERAGE, "code_coverage", r"(?i)code coverage:?\s*(\d+\.?\d*)%");
rule!(SONAR_BUGS, "bugs", r"(?i)bugs:?\s*(\d+)");
rule!(SONAR_VULNERABILITIES, "vulnerabilities", r"(?i)vulnerabilities:?\s*(\d+)");
rule!(SONAR_CODE_SMELLS, "code_smells", r"(?i)code smells:?\s*(\d+)");
rule!(QUALITY_GATE_FAILED, "quality_gate_failed", r"(?i)quality gate failed");
rule!(TECHNICAL_DEBT, "technical_debt_hours", r"(?i)technical debt:?\s*([\d.]+) hours");
rule!(DUPLICATED_LINES, "duplicated_lines", r"(?i)duplicated lines:?\s*([\d.]+)%");
rule!(DEPLOYMENT_SUCCESS, "deployment_success", r"(?i)deployment completed successfully");
rule!(DEPLOYMENT_DURATION, "deployment_duration", r"(?i)deployment duration:?\s*([\dhms :]+)");
rule!(FATAL, "fatal", r"(?i)FATAL:");
rule!(ROLLBACK, "rollback_initiated", r"(?i)rollback initiated");
rule!(ERROR_LINE, "error_line", r"(?m)^ERROR: (.+)");

pub const ERROR_TOKEN: &str = "ERROR:";
pub const WARNING_TOKEN: &str = "WARNING:";
pub const FALLBACK_TOKENS: [&str; 3] = ["ERROR:", "FAILED:", "FATAL:"];

fn blob(summary: Option<&str>) -> Option<&str> {
    summary.filter(|s| !s.trim().is_empty())
}

fn capture_u64(rule: &Rule, summary: Option<&str>) -> Option<u64> {
    blob(summary).and_then(|s| rule.capture(s)).and_then(|m| m.parse::<u64>().ok())
}

fn capture_f64(rule: &Rule, summary: Option<&str>) -> Option<f64> {
    blob(summary)
        .and_then(|s| rule.capture(s))
        .and_then(|m| m.parse::<f64>().ok())
        .filter(|x| x.is_finite())
}

fn capture_text(rule: &Rule, summary: Option<&str>) -> Option<String> {
    blob(summary)
        .and_then(|s| rule.capture(s))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn presence(rule: &Rule, summary: Option<&str>) -> Option<bool> {
    blob(summary).map(|s| rule.is_match(s))
}

fn count_token(token: &str, summary: Option<&str>) -> Option<u64> {
    let n = blob(summary)?.matches(token).count() as u64;
    if n == 0 { None } else { Some(n) }
}

pub fn build_success(summary: Option<&str>) -> Option<bool> { presence(&BUILD_SUCCESS, summary) }

/// Raw duration text after `build time:`, else after `total time:`.
pub fn build_duration(summary: Option<&str>) -> Option<String> {
    capture_text(&BUILD_TIME, summary).or_else(|| capture_text(&TOTAL_TIME, summary))
}

pub fn error_tokens(summary: Option<&str>) -> Option<u64> { count_token(ERROR_TOKEN, summary) }

pub fn warning_tokens(summary: Option<&str>) -> Option<u64> { count_token(WARNING_TOKEN, summary) }

pub fn test_coverage(summary: Option<&str>) -> Option<f64> { capture_f64(&TEST_COVERAGE, summary) }

pub fn test_cases_found(summary: Option<&str>) -> Option<u64> { capture_u64(&TEST_CASES_FOUND, summary) }

pub fn tests_run(summary: Option<&str>) -> Option<u64> { capture_u64(&TESTS_RUN, summary) }

pub fn test_failures(summary: Option<&str>) -> Option<u64> { capture_u64(&TEST_FAILURES, summary) }

pub fn test_failed(summary: Option<&str>) -> Option<bool> { presence(&TEST_FAILED, summary) }

pub fn code_coverage(summary: Option<&str>) -> Option<f64> { capture_f64(&CODE_COVERAGE, summary) }

pub fn sonar_bugs(summary: Option<&str>) -> Option<u64> { capture_u64(&SONAR_BUGS, summary) }

pub fn sonar_vulnerabilities(summary: Option<&str>) -> Option<u64> { capture_u64(&SONAR_VULNERABILITIES, summary) }

pub fn sonar_code_smells(summary: Option<&str>) -> Option<u64> { capture_u64(&SONAR_CODE_SMELLS, summary) }

pub fn quality_gate_passed(summary: Option<&str>) -> Option<bool> {
    presence(&QUALITY_GATE_FAILED, summary).map(|failed| !failed)
}

pub fn technical_debt_hours(summary: Option<&str>) -> Option<f64> { capture_f64(&TECHNICAL_DEBT, summary) }

pub fn duplicated_lines(summary: Option<&str>) -> Option<f64> { capture_f64(&DUPLICATED_LINES, summary) }

pub fn deployment_success(summary: Option<&str>) -> Option<bool> { presence(&DEPLOYMENT_SUCCESS, summary) }

pub fn deployment_duration(summary: Option<&str>) -> Option<String> { capture_text(&DEPLOYMENT_DURATION, summary) }

pub fn fatal(summary: Option<&str>) -> Option<bool> { presence(&FATAL, summary) }

pub fn rollback_initiated(summary: Option<&str>) -> Option<bool> { presence(&ROLLBACK, summary) }

/// Text after `ERROR: ` on each line that starts with the marker.
pub fn error_lines(summary: Option<&str>) -> Option<Vec<String>> {
    let s = blob(summary)?;
    let items: Vec<String> = ERROR_LINE
        .regex()
        .captures_iter(s)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim_end().to_string()))
        .collect();
    if items.is_empty() { None } else { Some(items) }
}

/// Occurrences of the `ERROR:`, `FAILED:` and `FATAL:` markers combined.
pub fn failure_tokens(summary: Option<&str>) -> u64 {
    FALLBACK_TOKENS
        .iter()
        .map(|t| count_token(t, summary).unwrap_or(0))
        .sum()
}
