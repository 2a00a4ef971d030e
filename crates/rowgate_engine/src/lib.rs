//! # RowGate Engine
//!
//! Persistence-engine boundary for RowGate.
//!
//! This crate provides:
//! - The dynamic [`Value`] / [`Row`] / [`Key`] data model shared by all adapters
//! - The [`Engine`] / [`Session`] / [`Statement`] / [`Cursor`] capability traits
//! - A minimal query dialect for adapters without a native parser
//! - [`MemoryEngine`], the default in-memory adapter

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dialect;
mod engine;
mod error;
mod memory;
mod value;

pub use dialect::{
    parse_command, parse_predicate, Command, DeleteCommand, Filter, OrderBy, Predicate,
    SelectCommand, UpdateCommand,
};
pub use engine::{Cursor, Engine, Session, Statement};
pub use error::{EngineError, EngineResult};
pub use memory::MemoryEngine;
pub use value::{Key, Row, Value};
