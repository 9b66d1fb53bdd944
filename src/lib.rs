/// hiproc library
///
/// Command snippet store with contextual recall: save shell commands under
/// a name and namespace, then get the best match back from partial context.

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod intelligence;
pub mod telemetry;

// Re-exports for convenience
pub use config::Config;
pub use db::Database;
pub use error::{RecallError, Result};
