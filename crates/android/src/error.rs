//! Signing resolution errors

use crate::properties::PropertiesError;
use nymbus_core::error::{Error, ErrorCode};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for signing resolution
pub type Result<T> = std::result::Result<T, SigningError>;

/// Fatal failures while resolving the release signing identity
#[derive(Error, Debug)]
pub enum SigningError {
    /// A descriptor exists (or may exist) but could not be read
    #[error("Cannot read signing descriptor {path}: {source}")]
    UnreadableDescriptor {
        /// Descriptor path
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// A descriptor was read but is not valid properties syntax
    #[error("Malformed signing descriptor {path}: {source}")]
    MalformedDescriptor {
        /// Descriptor path
        path: PathBuf,
        /// Parse failure
        #[source]
        source: PropertiesError,
    },

    /// The debug fallback is needed but no home directory is known
    #[error("No signing descriptor found and the home directory for the debug keystore is unknown")]
    HomeDirUnavailable,
}

impl SigningError {
    /// Error code used when surfacing this failure through `nymbus_core`
    pub fn code(&self) -> ErrorCode {
        match self {
            SigningError::UnreadableDescriptor { .. } => ErrorCode::SigningDescriptorUnreadable,
            SigningError::MalformedDescriptor { .. } => ErrorCode::SigningDescriptorMalformed,
            SigningError::HomeDirUnavailable => ErrorCode::SigningHomeUnavailable,
        }
    }
}

impl From<SigningError> for Error {
    fn from(err: SigningError) -> Self {
        let suggestion = match &err {
            SigningError::UnreadableDescriptor { .. } => {
                "Check the descriptor's permissions, or remove it to build with the debug keystore"
            }
            SigningError::MalformedDescriptor { .. } => {
                "Fix the key.properties syntax; a broken descriptor never falls back to debug signing"
            }
            SigningError::HomeDirUnavailable => "Set HOME or provide a key.properties descriptor",
        };
        Error::signing(err.code(), err.to_string())
            .with_suggestion(suggestion)
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_descriptor_maps_to_signing_exit_code() {
        let err = SigningError::MalformedDescriptor {
            path: PathBuf::from("/work/android/key.properties"),
            source: PropertiesError::InvalidUnicodeEscape {
                line: 3,
                sequence: "\\u12G4".to_string(),
            },
        };
        let core: Error = err.into();

        assert_eq!(core.code, ErrorCode::SigningDescriptorMalformed);
        assert_eq!(core.exit_code(), 5);
        assert!(core.message.contains("key.properties"));
        assert!(core.message.contains("line 3"));
        assert!(core.suggestion.is_some());
    }

    #[test]
    fn test_codes() {
        assert_eq!(
            SigningError::HomeDirUnavailable.code(),
            ErrorCode::SigningHomeUnavailable
        );
        let unreadable = SigningError::UnreadableDescriptor {
            path: PathBuf::from("key.properties"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(unreadable.code(), ErrorCode::SigningDescriptorUnreadable);
    }
}
