//! Shared building blocks for the MySQL viewer service.
//!
//! - `config`: environment-driven settings
//! - `errors`: the error taxonomy and its HTTP mapping
//! - `extract`: body and query extractors reporting errors as JSON
//! - `models`: wire types for data sources, relationships and queries
//! - `response`: response bodies shared by several endpoints
//! - `middleware`: request id tagging
//! - `utils`: SQL validation, quoting and log formatting

pub mod config;
pub mod errors;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;

pub use errors::{AppError, AppResult};
