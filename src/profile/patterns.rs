//! String value pattern library
//!
//! Checks run in a fixed priority order (IP address, email, URL, UUID,
//! timestamp) and the first hit wins, so every string maps to exactly one
//! pattern or to `Pattern::None`.

use crate::profile::types::Pattern;
use once_cell::sync::Lazy;
use regex::Regex;

static IPV4_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").unwrap()
});

static IPV6_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}|([0-9a-fA-F]{1,4}:){1,7}:|([0-9a-fA-F]{1,4}:){1,6}:[0-9a-fA-F]{1,4})$").unwrap()
});

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(https?|ftp|file|wss?)://[^\s/?#]*[^\s]*$").unwrap()
});

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

// Date, optionally followed by a time with optional fraction and offset
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?$").unwrap()
});

/// Classify a string value against the pattern library
pub fn detect_pattern(value: &str) -> Pattern {
    let len = value.len();
    if len == 0 {
        return Pattern::None;
    }

    if is_ip_address(value) {
        return Pattern::IpAddress;
    }

    if len > 5 && len < 255 && value.contains('@') && EMAIL_REGEX.is_match(value) {
        return Pattern::Email;
    }

    if value.contains("://") && URL_REGEX.is_match(value) {
        return Pattern::Url;
    }

    if len == 36 && value.as_bytes()[8] == b'-' && UUID_REGEX.is_match(value) {
        return Pattern::Uuid;
    }

    if len >= 10 && TIMESTAMP_REGEX.is_match(value) {
        return Pattern::Timestamp;
    }

    Pattern::None
}

fn is_ip_address(s: &str) -> bool {
    if s.len() < 16 && s.contains('.') && IPV4_REGEX.is_match(s) {
        return s.split('.').all(|part| part.parse::<u8>().is_ok());
    }
    s.contains(':') && IPV6_REGEX.is_match(s)
}
