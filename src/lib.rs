//! Library Circulation Server
//!
//! Lending of counted book copies to registered borrowers: borrow, renew and
//! return, with eligibility rules, borrower blocking and a single atomic commit
//! per transition, exposed as a REST JSON API.

use std::sync::Arc;

pub mod api;
pub mod circulation;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
