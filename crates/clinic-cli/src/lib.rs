//! # Clinic CLI
//!
//! Account administration for the clinic API.
//!
//! Principals are never created over HTTP; operators create them here.
//!
//! ## Usage
//!
//! ```ignore
//! use clinic_cli::accounts::NewPrincipal;
//!
//! let new = NewPrincipal::new(PrincipalKind::Doctor, "D7654321", "Passw0rd@")?;
//! let account = new.create(&store, cost).await?;
//! ```

pub mod accounts;
