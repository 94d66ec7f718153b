pub mod local_store;

pub use local_store::{LocalStore, CACHE_TTL_MS};
