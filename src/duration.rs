use once_cell::sync::Lazy;
use regex::Regex;

// One pattern per unit, each taking its first occurrence anywhere in the text.
static UNITS: Lazy<[(Regex, u64); 3]> = Lazy::new(|| {
    [
        (Regex::new(r"(\d+)\s*h").unwrap(), 3600),
        (Regex::new(r"(\d+)\s*m").unwrap(), 60),
        (Regex::new(r"(\d+)\s*s").unwrap(), 1),
    ]
});

/// Converts a `"1h 2m 3s"`-style expression into whole seconds.
///
/// Text around the tokens is ignored and absent components count as zero,
/// so malformed input degrades to a partial total or `0`.
pub fn parse_duration(input: &str) -> u64 {
    UNITS.iter().fold(0u64, |total, (re, scale)| {
        let n = re
            .captures(input)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0);
        total.saturating_add(n.saturating_mul(*scale))
    })
}

pub fn parse_duration_opt(input: Option<&str>) -> u64 {
    input.map(parse_duration).unwrap_or(0)
}
