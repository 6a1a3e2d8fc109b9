pub mod config;
pub mod error;

pub use config::{DateWindow, SourceOptions, SourceType, DEFAULT_CLUSTER_SIZE};
pub use error::SiftError;
