use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub fork: bool,
    pub language: Option<String>,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub updated_at: DateTime<Utc>,
    /// `null` upstream for repositories that were never pushed to.
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub size: u64,
}

impl Repository {
    /// Push time, or the last update when the repository was never pushed.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.pushed_at.unwrap_or(self.updated_at)
    }
}
