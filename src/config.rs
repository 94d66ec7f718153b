use crate::error::{Error, Result};
use std::env;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub database_path: String,
    pub user_agent: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_url = env::var("GITSCOPE_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "GITSCOPE_API_URL must be an http(s) URL, got {:?}",
                api_url
            )));
        }

        let database_path = env::var("GITSCOPE_DB_PATH")
            .or_else(|_| env::var("DATABASE_PATH"))
            .unwrap_or_else(|_| "gitscope.db".to_string());

        let user_agent = env::var("GITSCOPE_USER_AGENT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(default_user_agent);

        Ok(Self {
            api_url,
            database_path,
            user_agent,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            database_path: "gitscope.db".to_string(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("gitscope/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
}

impl From<&Config> for ClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.api_url.clone(),
            user_agent: config.user_agent.clone(),
        }
    }
}
