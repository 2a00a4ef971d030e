//! # RowGate Testkit
//!
//! Test utilities for RowGate.
//!
//! This crate provides:
//! - Sample entities and in-memory factory fixtures
//! - Spy engines counting releases and injecting mid-stream faults
//! - Property-based test generators using proptest
//! - Golden-text helpers for diff markup verification
//! - Cross-crate integration test helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rowgate_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_store() {
//!     with_store(|store| {
//!         let ids = seed_accounts(store, &["anna", "beth"]);
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod golden;
pub mod integration;
pub mod spies;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::golden::*;
    pub use crate::integration::*;
    pub use crate::spies::*;
}

pub use fixtures::*;
pub use generators::*;
pub use golden::*;
pub use integration::*;
pub use spies::*;
