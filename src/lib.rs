//! City Library
//!
//! Keeps a library's book catalog and readers consistent while readers
//! borrow and return books, persisting through either JSON files or
//! PostgreSQL. The lending rules live in [`services::LendingCore`]; the
//! console menu and the REST API are thin front ends over it.

use std::sync::Arc;

use tokio::sync::Mutex;

pub mod api;
pub mod config;
pub mod console;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers.
///
/// The lock is held for a whole lending operation, save included, so two
/// requests can never both take the last copy of a book.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub lending: Arc<Mutex<services::LendingCore>>,
}

impl AppState {
    pub fn new(config: AppConfig, core: services::LendingCore) -> Self {
        Self {
            config: Arc::new(config),
            lending: Arc::new(Mutex::new(core)),
        }
    }
}
