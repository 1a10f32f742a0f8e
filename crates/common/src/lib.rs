//! Shared utilities, configuration, and error handling for Crewup
//!
//! This crate provides common functionality used across the Crewup application:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - Keyset pagination primitives
//! - Request extractors

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod page;
pub mod state;

pub use config::Config;
pub use db::RepositoryError;
pub use error::{Error, Result};
pub use extractors::{Pagination, ValidatedJson};
pub use page::{Page, PageRequest};
pub use state::StateError;
