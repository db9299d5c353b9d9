//! # Clinic Core
//!
//! Core types, errors, and utilities for the clinic API.
//!
//! This crate provides foundational types used throughout the clinic backend:
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`password`]: Password hashing and verification (bcrypt)
//! - [`clock`]: Wall-clock abstraction used for token expiry and lockout windows
//!
//! # Example
//!
//! ```ignore
//! use clinic_core::errors::AppError;
//! use clinic_core::password::{hash_password, verify_password};
//!
//! // Create an error
//! let error = AppError::unauthorized("Invalid username or password".to_string());
//!
//! // Hash and verify a password
//! let hash = hash_password("secure_password")?;
//! assert!(verify_password("secure_password", &hash)?);
//! ```

pub mod clock;
pub mod errors;
pub mod password;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use errors::AppError;
pub use password::{hash_password, hash_password_with_cost, verify_password};
