use std::cmp::Reverse;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Repository;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoSort {
    #[default]
    Updated,
    Stars,
    Forks,
    Name,
}

impl FromStr for RepoSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "updated" => Ok(RepoSort::Updated),
            "stars" => Ok(RepoSort::Stars),
            "forks" => Ok(RepoSort::Forks),
            "name" => Ok(RepoSort::Name),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

impl std::fmt::Display for RepoSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoSort::Updated => write!(f, "updated"),
            RepoSort::Stars => write!(f, "stars"),
            RepoSort::Forks => write!(f, "forks"),
            RepoSort::Name => write!(f, "name"),
        }
    }
}

/// Filter and ordering for a repository listing.
#[derive(Debug, Clone, Default)]
pub struct RepoQuery {
    pub sort: RepoSort,
    /// Exact language match.
    pub language: Option<String>,
    /// Case-insensitive substring of name or description.
    pub search: Option<String>,
}

impl RepoQuery {
    pub fn apply<'a>(&self, repos: &'a [Repository]) -> Vec<&'a Repository> {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut result: Vec<&Repository> = repos
            .iter()
            .filter(|r| match &self.language {
                Some(language) => r.language.as_deref() == Some(language.as_str()),
                None => true,
            })
            .filter(|r| match &needle {
                Some(needle) => {
                    r.name.to_lowercase().contains(needle)
                        || r
                            .description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(needle))
                }
                None => true,
            })
            .collect();

        match self.sort {
            RepoSort::Stars => result.sort_by_key(|r| Reverse(r.stargazers_count)),
            RepoSort::Forks => result.sort_by_key(|r| Reverse(r.forks_count)),
            RepoSort::Name => result.sort_by_key(|r| r.name.to_lowercase()),
            RepoSort::Updated => result.sort_by_key(|r| Reverse(r.last_activity())),
        }

        result
    }
}

/// Distinct languages present in `repos`, alphabetically.
pub fn languages(repos: &[Repository]) -> Vec<String> {
    let mut langs: Vec<String> = repos.iter().filter_map(|r| r.language.clone()).collect();
    langs.sort();
    langs.dedup();
    langs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn repo(id: u64, name: &str, language: Option<&str>, stars: u64, forks: u64, days_ago: i64) -> Repository {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Repository {
            id,
            name: name.to_string(),
            full_name: format!("octocat/{}", name),
            html_url: String::new(),
            description: None,
            fork: false,
            language: language.map(str::to_string),
            stargazers_count: stars,
            forks_count: forks,
            updated_at: base - Duration::days(days_ago),
            pushed_at: Some(base - Duration::days(days_ago)),
            topics: Vec::new(),
            size: 0,
        }
    }

    fn fixture() -> Vec<Repository> {
        let mut cli = repo(1, "cli", Some("Rust"), 10, 1, 30);
        cli.description = Some("A command-line PARSER".to_string());
        let mut stale = repo(4, "archive", None, 0, 0, 1);
        stale.pushed_at = None;
        stale.updated_at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        vec![
            cli,
            repo(2, "Blog", Some("Ruby"), 50, 9, 5),
            repo(3, "parser-kit", Some("Rust"), 50, 2, 10),
            stale,
        ]
    }

    fn ids(repos: Vec<&Repository>) -> Vec<u64> {
        repos.into_iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_default_sort_is_most_recent_first() {
        let repos = fixture();
        assert_eq!(ids(RepoQuery::default().apply(&repos)), vec![2, 3, 1, 4]);
    }

    #[test]
    fn test_sort_keys() {
        let repos = fixture();
        let by = |sort| ids(RepoQuery { sort, ..Default::default() }.apply(&repos));

        // Equal star counts keep input order.
        assert_eq!(by(RepoSort::Stars), vec![2, 3, 1, 4]);
        assert_eq!(by(RepoSort::Forks), vec![2, 3, 1, 4]);
        assert_eq!(by(RepoSort::Name), vec![4, 2, 1, 3]);
    }

    #[test]
    fn test_language_and_search_filters() {
        let repos = fixture();

        let rust = RepoQuery {
            language: Some("Rust".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(rust.apply(&repos)), vec![3, 1]);

        let search = RepoQuery {
            search: Some("  Parser ".to_string()),
            sort: RepoSort::Name,
            ..Default::default()
        };
        assert_eq!(ids(search.apply(&repos)), vec![1, 3]);

        let none = RepoQuery {
            language: Some("Ruby".to_string()),
            search: Some("parser".to_string()),
            ..Default::default()
        };
        assert!(none.apply(&repos).is_empty());
    }

    #[test]
    fn test_languages_are_distinct_and_sorted() {
        assert_eq!(languages(&fixture()), vec!["Ruby".to_string(), "Rust".to_string()]);
        assert!(languages(&[]).is_empty());
    }

    #[test]
    fn test_parse_sort_key() {
        assert_eq!("Stars".parse::<RepoSort>().unwrap(), RepoSort::Stars);
        assert_eq!(RepoSort::Forks.to_string(), "forks");
        assert!("popularity".parse::<RepoSort>().is_err());
    }
}
