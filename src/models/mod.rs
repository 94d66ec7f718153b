pub mod user;
pub mod repository;
pub mod snapshot;
pub mod insights;

pub use user::*;
pub use repository::*;
pub use snapshot::*;
pub use insights::*;
