use std::time::Duration;
use std::str::FromStr;
use anyhow::{Result, Context};

/// Parses human durations such as `"10m"`, `"1h 30m"` or `"45s"`.
pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    humantime::Duration::from_str(duration_str.trim())
        .map(|d| d.into())
        .with_context(|| format!("Invalid duration format: {}", duration_str))
}

pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}
