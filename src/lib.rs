pub mod config;
pub mod error;
pub mod models;
pub mod github;
pub mod analysis;
pub mod storage;

pub use config::{ClientConfig, Config};
pub use error::{Error, ErrorKind, Result};
pub use github::{GitHubClient, ProfileSource, RequestCoordinator};
pub use analysis::{InsightsEngine, RepoQuery, RepoSort};
pub use storage::LocalStore;
