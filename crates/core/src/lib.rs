//! Core utilities for Nymbus development tools
//!
//! This crate provides shared functionality used by the platform tools:
//!
//! - **Error handling**: Structured errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML-based configuration with validation
//! - **Process execution**: Running external build tools with captured or streamed output
//!
//! # Example
//!
//! ```rust,no_run
//! use nymbus_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid configuration");
//! println!("Signing module: {}", config.schema.signing.module);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod process;

pub use error::{Error, ErrorCode, Result};
