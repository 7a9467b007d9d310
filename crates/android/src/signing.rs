//! Release signing-credential resolution
//!
//! Picks the first `key.properties` descriptor that exists, loads the store
//! and key credentials from it, and anchors a relative `storeFile` either at
//! the Gradle root (when prefixed with the module directory name, as CI
//! pipelines write it) or at the application module. Without any descriptor
//! the well-known local debug keystore identity is used instead.
//!
//! A descriptor that exists but cannot be read or parsed is fatal: it must
//! never degrade into a debug-signed release.

use crate::error::{Result, SigningError};
use crate::properties::Properties;
use nymbus_core::config::SigningConfig;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Debug keystore location relative to the user's home directory
pub const DEBUG_KEYSTORE: &str = ".android/debug.keystore";
/// Store password of the debug keystore
pub const DEBUG_STORE_PASSWORD: &str = "android";
/// Key alias of the debug keystore
pub const DEBUG_KEY_ALIAS: &str = "AndroidDebugKey";
/// Key password of the debug keystore
pub const DEBUG_KEY_PASSWORD: &str = "android";
/// Application module directory name
pub const DEFAULT_MODULE: &str = "app";

/// Descriptor property names
pub mod keys {
    /// Keystore path, relative to the module or to the Gradle root
    pub const STORE_FILE: &str = "storeFile";
    /// Keystore password
    pub const STORE_PASSWORD: &str = "storePassword";
    /// Signing key alias
    pub const KEY_ALIAS: &str = "keyAlias";
    /// Signing key password
    pub const KEY_PASSWORD: &str = "keyPassword";
}

/// Credentials as written in a descriptor file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialsDescriptor {
    /// Raw `storeFile` value, not yet anchored
    pub store_file_path: String,
    /// `storePassword`
    pub store_password: String,
    /// `keyAlias`
    pub key_alias: String,
    /// `keyPassword`
    pub key_password: String,
}

impl CredentialsDescriptor {
    /// Extract the signing keys; absent keys read as empty strings
    pub fn from_properties(props: &Properties) -> Self {
        Self {
            store_file_path: props.get_or(keys::STORE_FILE, "").to_string(),
            store_password: props.get_or(keys::STORE_PASSWORD, "").to_string(),
            key_alias: props.get_or(keys::KEY_ALIAS, "").to_string(),
            key_password: props.get_or(keys::KEY_PASSWORD, "").to_string(),
        }
    }

    /// Read and parse a descriptor file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| SigningError::UnreadableDescriptor {
            path: path.to_path_buf(),
            source,
        })?;
        let props =
            Properties::from_bytes(&bytes).map_err(|source| SigningError::MalformedDescriptor {
                path: path.to_path_buf(),
                source,
            })?;

        for key in [keys::STORE_FILE, keys::STORE_PASSWORD, keys::KEY_ALIAS, keys::KEY_PASSWORD] {
            if props.get(key).is_none() {
                warn!(descriptor = %path.display(), key, "Signing descriptor does not define key");
            }
        }

        Ok(Self::from_properties(&props))
    }
}

/// Where a resolved identity came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum SigningSource {
    /// Loaded from this descriptor file
    Descriptor(PathBuf),
    /// No descriptor existed; the local debug keystore identity is used
    DebugFallback,
}

impl fmt::Display for SigningSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningSource::Descriptor(path) => write!(f, "descriptor {}", path.display()),
            SigningSource::DebugFallback => write!(f, "debug keystore fallback"),
        }
    }
}

/// Signing identity ready for the packaging step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSigningConfig {
    /// Anchored keystore path
    pub store_file: PathBuf,
    /// Keystore password
    pub store_password: String,
    /// Signing key alias
    pub key_alias: String,
    /// Signing key password
    pub key_password: String,
    /// Where these credentials came from
    pub source: SigningSource,
}

impl ResolvedSigningConfig {
    /// The local debug keystore identity under `home_dir`
    pub fn debug_fallback(home_dir: &Path) -> Self {
        Self {
            store_file: home_dir.join(DEBUG_KEYSTORE),
            store_password: DEBUG_STORE_PASSWORD.to_string(),
            key_alias: DEBUG_KEY_ALIAS.to_string(),
            key_password: DEBUG_KEY_PASSWORD.to_string(),
            source: SigningSource::DebugFallback,
        }
    }

    /// Whether artifacts signed with this identity are unfit for distribution
    pub fn is_debug_fallback(&self) -> bool {
        self.source == SigningSource::DebugFallback
    }
}

/// First candidate that exists on disk.
///
/// A candidate whose existence cannot be determined is an error, not a miss.
pub fn select_descriptor(candidates: &[PathBuf]) -> Result<Option<&Path>> {
    for candidate in candidates {
        debug!(candidate = %candidate.display(), "Probing signing descriptor");
        let exists = candidate
            .try_exists()
            .map_err(|source| SigningError::UnreadableDescriptor {
                path: candidate.clone(),
                source,
            })?;
        if exists {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Anchor a descriptor's `storeFile` value.
///
/// Values starting with `<module>/` or `<module>\` are relative to `root_dir`;
/// everything else is relative to `module_dir`. Absolute values stay absolute.
pub fn resolve_store_file(
    store_path: &str,
    module: &str,
    module_dir: &Path,
    root_dir: &Path,
) -> PathBuf {
    let root_relative = store_path
        .strip_prefix(module)
        .is_some_and(|rest| rest.starts_with(['/', '\\']));

    if root_relative {
        root_dir.join(store_path)
    } else {
        module_dir.join(store_path)
    }
}

/// Resolve the release signing identity.
///
/// `candidates` are probed in order; the first existing one is the only
/// descriptor read. Without any, the debug keystore under `home_dir` is used.
pub fn resolve(
    candidates: &[PathBuf],
    module_dir: &Path,
    root_dir: &Path,
    home_dir: &Path,
) -> Result<ResolvedSigningConfig> {
    resolve_with(candidates, DEFAULT_MODULE, module_dir, root_dir, || {
        Ok(home_dir.to_path_buf())
    })
}

fn resolve_with<F>(
    candidates: &[PathBuf],
    module: &str,
    module_dir: &Path,
    root_dir: &Path,
    home_dir: F,
) -> Result<ResolvedSigningConfig>
where
    F: FnOnce() -> Result<PathBuf>,
{
    let Some(descriptor_path) = select_descriptor(candidates)? else {
        let config = ResolvedSigningConfig::debug_fallback(&home_dir()?);
        warn!(
            keystore = %config.store_file.display(),
            "No signing descriptor found; release will be signed with the debug keystore"
        );
        return Ok(config);
    };

    let descriptor = CredentialsDescriptor::load(descriptor_path)?;
    let store_file =
        resolve_store_file(&descriptor.store_file_path, module, module_dir, root_dir);

    info!(
        descriptor = %descriptor_path.display(),
        store_file = %store_file.display(),
        key_alias = %descriptor.key_alias,
        "Resolved release signing config"
    );

    Ok(ResolvedSigningConfig {
        store_file,
        store_password: descriptor.store_password,
        key_alias: descriptor.key_alias,
        key_password: descriptor.key_password,
        source: SigningSource::Descriptor(descriptor_path.to_path_buf()),
    })
}

/// User home directory, needed only for the debug fallback
pub fn default_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(SigningError::HomeDirUnavailable)
}

/// Resolver bound to one Gradle project layout
#[derive(Debug, Clone)]
pub struct SigningResolver {
    candidates: Vec<PathBuf>,
    module: String,
    module_dir: PathBuf,
    root_dir: PathBuf,
    home_dir: Option<PathBuf>,
}

impl SigningResolver {
    /// Resolver using the built-in layout: `key.properties`, then
    /// `android/key.properties`, module `app`
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        Self {
            candidates: vec![
                root_dir.join("key.properties"),
                root_dir.join("android").join("key.properties"),
            ],
            module: DEFAULT_MODULE.to_string(),
            module_dir: root_dir.join(DEFAULT_MODULE),
            root_dir,
            home_dir: None,
        }
    }

    /// Resolver for the Gradle root `root_dir` using configured candidates and module
    pub fn for_project(root_dir: &Path, config: &SigningConfig) -> nymbus_core::Result<Self> {
        Ok(Self {
            candidates: config.descriptor_paths(root_dir)?,
            module: config.module.clone(),
            module_dir: root_dir.join(&config.module),
            root_dir: root_dir.to_path_buf(),
            home_dir: None,
        })
    }

    /// Use `home_dir` for the debug fallback instead of the user's home
    #[must_use]
    pub fn with_home_dir(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home_dir.into());
        self
    }

    /// Descriptor candidates in priority order
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Base directory for plain `storeFile` values
    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Base directory for module-prefixed `storeFile` values
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Resolve the release signing identity for this layout
    pub fn resolve(&self) -> Result<ResolvedSigningConfig> {
        resolve_with(
            &self.candidates,
            &self.module,
            &self.module_dir,
            &self.root_dir,
            || match &self.home_dir {
                Some(home) => Ok(home.clone()),
                None => default_home_dir(),
            },
        )
    }
}
