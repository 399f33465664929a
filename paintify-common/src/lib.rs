//! # Paintify Common Library
//!
//! Shared code for the Paintify service:
//! - Database initialization, models and queries
//! - Password hashing and session-token signing
//! - Configuration loading
//! - Common error type

pub mod auth;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
