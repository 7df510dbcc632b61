//! Smart Traffic AI job client
//!
//! This library submits traffic videos to the Smart Traffic AI backend for a
//! selected detection case, polls the resulting job until it finishes, and
//! keeps a live copy of the partial violation report while the job runs.

pub mod config;
pub mod models;
pub mod services;

pub use config::AppConfig;
pub use models::case::CaseType;
pub use models::session::{ClientState, Phase};
pub use services::lifecycle::JobLifecycle;
