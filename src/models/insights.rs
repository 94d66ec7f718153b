use serde::{Deserialize, Serialize};

use super::Repository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageStat {
    pub name: String,
    pub count: u32,
    pub stars: u64,
}

/// Analytics derived from one snapshot. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileInsights {
    pub top_languages: Vec<LanguageStat>,
    pub most_starred_repo: Option<Repository>,
    pub most_recent_repo: Option<Repository>,
    pub total_stars: u64,
    pub total_forks: u64,
    pub health_score: u8,
}

impl ProfileInsights {
    pub fn top_language(&self) -> Option<&str> {
        self.top_languages.first().map(|l| l.name.as_str())
    }
}
