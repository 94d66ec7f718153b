pub mod cancel;
pub mod client;
pub mod coordinator;
pub mod rate_limit;
pub mod source;

pub use cancel::{CancelScope, CancelToken};
pub use client::GitHubClient;
pub use coordinator::RequestCoordinator;
pub use rate_limit::RateLimitInfo;
pub use source::ProfileSource;
