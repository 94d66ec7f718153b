use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GitHubUser, Repository};

/// A profile together with the repository list fetched in the same resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    pub user: GitHubUser,
    pub repos: Vec<Repository>,
}

/// The last-viewed snapshot as held by the local store.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSnapshot {
    pub user: GitHubUser,
    pub repos: Vec<Repository>,
    pub captured_at: DateTime<Utc>,
}

impl From<CachedSnapshot> for ProfileData {
    fn from(snapshot: CachedSnapshot) -> Self {
        Self {
            user: snapshot.user,
            repos: snapshot.repos,
        }
    }
}
