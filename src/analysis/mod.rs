pub mod format;
pub mod insights_engine;
pub mod repo_query;

pub use format::format_count;
pub use insights_engine::InsightsEngine;
pub use repo_query::{RepoQuery, RepoSort};
