//! # RowGate Core
//!
//! Persistence-access layer between application code and a relational store
//! reached through a pluggable engine.
//!
//! This crate provides:
//! - The [`Broker`] contract and its default [`SessionBroker`] adapter
//! - [`TrackedIterator`] - iteration that releases its broker exactly once
//! - [`ScopedResultSet`] - a statement/cursor pair released exactly once
//! - [`ResourceTracker`] - open/close accounting for leak diagnostics
//! - The [`Entity`] descriptor model and the [`Auditor`] render/diff engine
//!
//! # Example
//!
//! ```rust,ignore
//! use rowgate_core::{BrokerExt, BrokerFactory, Config};
//! use rowgate_engine::MemoryEngine;
//! use std::sync::Arc;
//!
//! let factory = BrokerFactory::new(Arc::new(MemoryEngine::new()), Config::default());
//!
//! let mut broker = factory.broker()?;
//! let mut account = Account { id: 0, name: "anna".into() };
//! broker.store(&mut account, false)?; // generated key written back
//! broker.release(true)?;
//!
//! for account in factory.iterator::<Account>(Some("ORDER BY ACC_ID"))? {
//!     println!("{}", account?.name);
//! } // broker released on exhaustion
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod audit;
mod broker;
mod config;
mod entity;
mod error;
mod iterator;
mod scoped;
mod session_broker;
mod tracker;

pub use audit::{
    diff_words, Auditor, ChangeLog, LineDiff, DELETE_CLOSE, DELETE_OPEN, INSERT_CLOSE, INSERT_OPEN,
};
pub use broker::{Broker, BrokerExt};
pub use config::{Config, RedactionList, DEFAULT_VOLATILE_PARAMETER};
pub use entity::{
    is_persisted, require_bool, require_int, require_text, Entity, EntityDescriptor,
    FieldDescriptor,
};
pub use error::{CoreError, CoreResult};
pub use iterator::TrackedIterator;
pub use scoped::ScopedResultSet;
pub use session_broker::{BrokerFactory, SessionBroker};
pub use tracker::{ResourceTracker, TrackerSnapshot};
