//! # Repoprint CLI
//!
//! Command line front end for the repoprint indexer.
//!
//! This crate provides:
//! - **Indexing**: index a manifest of prepared repositories on a worker pool
//! - **Inspection**: existence checks and per-document summaries
//! - **Maintenance**: single-repository deletion and throttled bulk removal
//!
//! The index lives in a [`repoprint_store::MemoryIndexStore`] that is loaded
//! from and saved back to a snapshot file on every run.

pub mod commands;
pub mod config;
pub mod error;

pub use crate::commands::{run, Command};
pub use crate::config::CliConfig;
pub use crate::error::{CliError, Result};
