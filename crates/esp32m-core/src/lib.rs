//! # esp32m-core
//!
//! Schema-driven record codec and shared utilities for esp32m device
//! configuration.
//!
//! This crate provides:
//! - Schemas and the map-form / array-form record codec (unfold, fold,
//!   diff, apply)
//! - Diff wire encoding and record hashing
//! - Path handling and string matchers
//! - Time values, plugin registry and function combinators
//! - Configuration storage abstraction
//!
//! This crate is intentionally runtime-agnostic and contains no async code.

pub mod codec;
pub mod config;
pub mod diff;
pub mod equal;
pub mod error;
pub mod func;
pub mod hash;
pub mod matcher;
pub mod path;
pub mod plugin;
pub mod record;
pub mod schema;
pub mod time;

pub use codec::StructCodec;
pub use config::{ConfigError, ConfigStorage, MemoryConfigStorage};
pub use diff::{Diff, DiffEntry, DELETE_SENTINEL};
pub use equal::deep_equal;
pub use error::StructError;
pub use hash::murmur3_32;
pub use record::{AsRecord, FieldState, Folded, RecordForm};
pub use schema::{Field, FieldOptions, Schema, MAX_DEPTH};
