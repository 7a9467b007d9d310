//! Android release signing tools for Nymbus
//!
//! This crate provides Android-specific functionality:
//! - `key.properties` descriptor parsing
//! - Release signing-credential resolution with debug keystore fallback
//! - Keystore inspection and readiness checks
//! - Exporting the signing identity for Gradle, CI environments, or JSON consumers
//! - Gradle wrapper integration for signed release builds

#![warn(missing_docs)]

pub mod error;
pub mod export;
pub mod gradle;
pub mod keystore;
pub mod properties;
pub mod signing;

pub use error::{Result, SigningError};
pub use properties::{Properties, PropertiesError};
pub use signing::{
    resolve, CredentialsDescriptor, ResolvedSigningConfig, SigningResolver, SigningSource,
};
