//! # relay-core
//!
//! Core crate for the presence relay. Contains configuration schemas,
//! typed identifiers, the credential verifier contract, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other relay crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
