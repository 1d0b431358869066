pub mod api;
mod app;
pub mod client;
pub mod config;
pub mod logging;
mod redact;
pub mod session;
pub mod storage;
pub mod types;

pub use client::{ApiClient, ApiError, RequestOptions};
pub use config::ApiConfig;
pub use session::{LoginError, PremiumAccess, SessionManager, SessionState};
pub use storage::{Credentials, KeyringStore, MemoryStore, SecureStore, StorageError};

pub fn run() -> std::process::ExitCode {
    app::run()
}
