use async_trait::async_trait;
use reqwest::{header, Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::github::cancel::CancelToken;
use crate::github::rate_limit::RateLimitInfo;
use crate::github::source::ProfileSource;
use crate::models::{GitHubUser, Repository};

/// Fixed page size; only the first page of repositories is ever fetched.
pub const REPOS_PER_PAGE: u32 = 100;

pub struct GitHubClient {
    client: Client,
    base_url: Url,
}

impl GitHubClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&config.user_agent)?,
        );

        let client = Client::builder().default_headers(headers).build()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("Invalid API URL {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "API URL cannot be used as a base: {}",
                config.base_url
            )));
        }

        Ok(Self { client, base_url })
    }

    pub async fn get_user(&self, username: &str, token: &CancelToken) -> Result<GitHubUser> {
        let url = self.endpoint(&["users", username], &[])?;
        tracing::info!("Fetching user: {}", username);
        self.request(url, username, token).await
    }

    pub async fn get_user_repos(
        &self,
        username: &str,
        token: &CancelToken,
    ) -> Result<Vec<Repository>> {
        let per_page = REPOS_PER_PAGE.to_string();
        let url = self.endpoint(
            &["users", username, "repos"],
            &[("per_page", per_page.as_str()), ("sort", "updated")],
        )?;
        tracing::info!("Fetching repositories for: {}", username);
        self.request(url, username, token).await
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("API URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        url: Url,
        username: &str,
        token: &CancelToken,
    ) -> Result<T> {
        token.run(self.execute(url, username)).await
    }

    async fn execute<T: DeserializeOwned>(&self, url: Url, username: &str) -> Result<T> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let rate_limit = RateLimitInfo::from_headers(response.headers());
        let status = response.status();

        if !status.is_success() {
            return Err(classify_failure(status, rate_limit, username));
        }

        Ok(response.json().await?)
    }
}

/// Maps a non-success response onto the error taxonomy. A 403 is only a rate
/// limit when the quota is actually exhausted.
pub fn classify_failure(status: StatusCode, rate_limit: RateLimitInfo, username: &str) -> Error {
    if status == StatusCode::FORBIDDEN && rate_limit.is_exhausted() {
        tracing::warn!(
            "Rate limit exhausted ({}/{}), resets at {}",
            rate_limit.remaining,
            rate_limit.limit,
            rate_limit.reset
        );
        return Error::RateLimited {
            remaining: rate_limit.remaining,
            limit: rate_limit.limit,
            reset: rate_limit.reset,
        };
    }

    if status == StatusCode::NOT_FOUND {
        return Error::NotFound(username.to_string());
    }

    Error::Upstream {
        status: status.as_u16(),
    }
}

#[async_trait]
impl ProfileSource for GitHubClient {
    async fn fetch_profile(&self, handle: &str, token: &CancelToken) -> Result<GitHubUser> {
        self.get_user(handle, token).await
    }

    async fn fetch_repositories(&self, handle: &str, token: &CancelToken) -> Result<Vec<Repository>> {
        self.get_user_repos(handle, token).await
    }
}
