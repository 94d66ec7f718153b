use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::github::cancel::CancelToken;
use crate::models::{GitHubUser, Repository};

/// Where profile snapshots come from. Implementations must resolve to
/// `Error::Cancelled` once `token` is cancelled.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, handle: &str, token: &CancelToken) -> Result<GitHubUser>;
    async fn fetch_repositories(&self, handle: &str, token: &CancelToken) -> Result<Vec<Repository>>;
}

#[async_trait]
impl<S: ProfileSource + ?Sized> ProfileSource for Arc<S> {
    async fn fetch_profile(&self, handle: &str, token: &CancelToken) -> Result<GitHubUser> {
        (**self).fetch_profile(handle, token).await
    }

    async fn fetch_repositories(&self, handle: &str, token: &CancelToken) -> Result<Vec<Repository>> {
        (**self).fetch_repositories(handle, token).await
    }
}
