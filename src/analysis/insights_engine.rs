use chrono::{DateTime, Utc};

use crate::models::{GitHubUser, LanguageStat, ProfileInsights, Repository};

const TOP_LANGUAGES: usize = 5;
const MS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;
/// Assumed push age when there is no repository at all; earns no activity credit.
const NO_ACTIVITY_DAYS: f64 = 365.0;

pub struct InsightsEngine {
    weights: HealthWeights,
}

/// Each component of the health score is `min(value / target, 1) * weight`,
/// except activity, which decays linearly to zero over `activity_window_days`.
#[derive(Debug, Clone)]
struct HealthWeights {
    follower_weight: f64,
    follower_target: f64,
    repo_weight: f64,
    repo_target: f64,
    star_weight: f64,
    star_target: f64,
    activity_weight: f64,
    activity_window_days: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            follower_weight: 25.0,
            follower_target: 100.0,
            repo_weight: 20.0,
            repo_target: 30.0,
            star_weight: 25.0,
            star_target: 200.0,
            activity_weight: 30.0,
            activity_window_days: 180.0,
        }
    }
}

impl InsightsEngine {
    pub fn new() -> Self {
        Self {
            weights: HealthWeights::default(),
        }
    }

    pub fn compute(&self, user: &GitHubUser, repos: &[Repository]) -> ProfileInsights {
        self.compute_at(user, repos, Utc::now())
    }

    /// Same as [`compute`](Self::compute) with an explicit clock.
    pub fn compute_at(
        &self,
        user: &GitHubUser,
        repos: &[Repository],
        now: DateTime<Utc>,
    ) -> ProfileInsights {
        let total_stars: u64 = repos.iter().map(|r| r.stargazers_count).sum();
        let total_forks: u64 = repos.iter().map(|r| r.forks_count).sum();

        let most_starred_repo = most_starred(repos).cloned();
        let most_recent_repo = most_recent(repos).cloned();

        let days_since_push = most_recent_repo
            .as_ref()
            .and_then(|r| r.pushed_at)
            .map(|pushed| (now - pushed).num_milliseconds() as f64 / MS_PER_DAY)
            .unwrap_or(NO_ACTIVITY_DAYS);

        let health_score = self.health_score(user, total_stars, days_since_push);

        ProfileInsights {
            top_languages: language_histogram(repos),
            most_starred_repo,
            most_recent_repo,
            total_stars,
            total_forks,
            health_score,
        }
    }

    pub fn health_score(&self, user: &GitHubUser, total_stars: u64, days_since_push: f64) -> u8 {
        let w = &self.weights;

        let follower_score = ratio(user.followers as f64, w.follower_target) * w.follower_weight;
        let repo_score = ratio(user.public_repos as f64, w.repo_target) * w.repo_weight;
        let star_score = ratio(total_stars as f64, w.star_target) * w.star_weight;
        let activity_score =
            (1.0 - days_since_push / w.activity_window_days).max(0.0) * w.activity_weight;

        let total = follower_score + repo_score + star_score + activity_score;
        total.round().clamp(0.0, 100.0) as u8
    }
}

impl Default for InsightsEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn ratio(value: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 1.0;
    }
    (value / target).min(1.0)
}

/// Languages by repository count, descending. Ties keep first-seen order.
fn language_histogram(repos: &[Repository]) -> Vec<LanguageStat> {
    let mut stats: Vec<LanguageStat> = Vec::new();

    for repo in repos {
        let Some(language) = repo.language.as_deref() else {
            continue;
        };
        match stats.iter_mut().find(|s| s.name == language) {
            Some(stat) => {
                stat.count += 1;
                stat.stars += repo.stargazers_count;
            }
            None => stats.push(LanguageStat {
                name: language.to_string(),
                count: 1,
                stars: repo.stargazers_count,
            }),
        }
    }

    // Stable sort, so equal counts stay in insertion order.
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats.truncate(TOP_LANGUAGES);
    stats
}

// Both reductions keep the accumulator on ties: the earlier repository wins.

fn most_starred(repos: &[Repository]) -> Option<&Repository> {
    repos
        .iter()
        .reduce(|a, b| if a.stargazers_count >= b.stargazers_count { a } else { b })
}

fn most_recent(repos: &[Repository]) -> Option<&Repository> {
    repos
        .iter()
        .reduce(|a, b| if a.pushed_at >= b.pushed_at { a } else { b })
}
