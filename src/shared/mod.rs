//! Shared components - common types, errors, and utilities

pub mod cache;
pub mod errors;
pub mod types;
pub mod utils;
