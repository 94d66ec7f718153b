use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Serialize;

/// Unauthenticated quota the API applies when it sends no rate-limit headers.
pub const DEFAULT_LIMIT: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitInfo {
    pub remaining: u32,
    pub limit: u32,
    /// Epoch seconds at which the quota window resets.
    pub reset: i64,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            remaining: header_number(headers, "x-ratelimit-remaining").unwrap_or(DEFAULT_LIMIT),
            limit: header_number(headers, "x-ratelimit-limit").unwrap_or(DEFAULT_LIMIT),
            reset: header_number(headers, "x-ratelimit-reset").unwrap_or(0),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        if self.reset <= 0 {
            return None;
        }
        DateTime::from_timestamp(self.reset, 0)
    }
}

impl Default for RateLimitInfo {
    fn default() -> Self {
        Self {
            remaining: DEFAULT_LIMIT,
            limit: DEFAULT_LIMIT,
            reset: 0,
        }
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
