//! Small text and URL helpers shared by the client components.

use reqwest::Url;

const LOG_TEXT_LIMIT: usize = 180;

/// Trim optional text; blank input becomes `None`.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Collapse whitespace and cap length so response bodies fit on a log line.
pub fn compact_text(value: &str) -> String {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= LOG_TEXT_LIMIT {
        return collapsed;
    }
    let mut clipped = collapsed.chars().take(LOG_TEXT_LIMIT).collect::<String>();
    clipped.push_str("...");
    clipped
}

/// Check that `raw` is an absolute http(s) URL with a host and return it
/// without trailing slashes.
pub fn normalize_base_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("URL is empty".to_string());
    }
    if !is_http_url(trimmed) {
        return Err(format!("`{trimmed}` is not an http:// or https:// URL"));
    }
    let parsed = Url::parse(trimmed).map_err(|error| format!("`{trimmed}`: {error}"))?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(format!("`{trimmed}` has no host"));
    }
    Ok(trimmed.to_string())
}

pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
