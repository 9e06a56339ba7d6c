//! ormsync CLI - Command-line interface for ormsync.
//!
//! This crate provides the `ormsync` binary, which detects the ORMs in a
//! project and reports how its models and migrations compare to a live
//! database.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
#[cfg(feature = "postgres")]
pub mod postgres;
