//! # badge-core — Foundational Types for Badge Credentials
//!
//! Leaf crate of the workspace. Everything that gets signed flows through
//! [`CanonicalBytes`], and every instant that ends up inside a signed payload
//! is a [`Timestamp`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `badge-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod error;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use error::{BadgeError, CanonicalizationError};
pub use temporal::Timestamp;
