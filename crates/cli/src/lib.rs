//! CLI utilities for Nymbus development tools
//!
//! Provides shared CLI functionality:
//! - Status messages
//! - Human-readable durations, sizes, and counts

#![warn(missing_docs)]

pub mod output;
