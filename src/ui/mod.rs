//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All console output of the binary goes through this module so quiet mode
//! and colour handling stay consistent. Diagnostic logging goes through
//! `tracing` instead.

pub mod output;
