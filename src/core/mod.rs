//! core
//!
//! Core domain types and data structures for the translator.
//!
//! # Modules
//!
//! - [`types`] - Strong types: OperationPath, ArgumentSet
//! - [`snapshot`] - Argument snapshots and the asymmetric diff
//! - [`tree`] - The command resolution tree
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid paths at construction time
//! - Argument values are plain data, so copies are always deep
//! - All traversal is iterative and deterministic

pub mod config;
pub mod snapshot;
pub mod tree;
pub mod types;
