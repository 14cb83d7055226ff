#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;

pub use client::{QuestionUpdate, SyncClient};
pub use config::{ApiConfig, DEFAULT_BASE_URL, ProgressKind};
pub use error::{ConfigError, RemoteError};
pub use http::{HttpSyncClient, NO_ANALYTICS_DETAIL};
pub use memory::{InMemorySyncClient, SyncCall};
