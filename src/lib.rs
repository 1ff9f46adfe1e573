//! Translator Module - dispatch and lifecycle framework for translator functions
//!
//! Translator functions are discrete operations that drive instrument and
//! telescope subsystems. This crate resolves them from command-line tokens
//! and runs each one through a checked three-phase lifecycle.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, routes tokens)
//! - [`engine`] - Runs the Precondition → Perform → Postcondition lifecycle
//! - [`core`] - Domain types, snapshots, the command tree and configuration
//! - [`ob`] - Flattens Observing Blocks into argument sets
//! - [`keywords`] - Keyword-service collaborator
//! - [`builtin`] - Generic operations shipped with the binary
//! - [`ui`] - User-facing output
//!
//! # Correctness Invariants
//!
//! 1. A phase runs only after every earlier phase succeeded
//! 2. Caller-supplied arguments are never altered or removed by a run
//! 3. Only leaves with a registered implementation are ever invoked
//! 4. No process-wide state: logger and configuration are passed explicitly

pub mod builtin;
pub mod cli;
pub mod core;
pub mod engine;
pub mod keywords;
pub mod ob;
pub mod ui;
