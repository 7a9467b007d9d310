//! Keystore inspection and signing readiness checks
//!
//! Looks at the resolved keystore file without decrypting it: container
//! format from the leading magic bytes, size, and whether the credentials in
//! the signing config are plausible. When a JDK `keytool` is available the
//! store password and alias can be verified for real.

use crate::signing::ResolvedSigningConfig;
use nymbus_core::error::{Error, ErrorCode, Result};
use nymbus_core::process;
use serde::Serialize;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const JKS_MAGIC: [u8; 4] = [0xFE, 0xED, 0xFE, 0xED];
const JCEKS_MAGIC: [u8; 4] = [0xCE, 0xCE, 0xCE, 0xCE];
const DER_SEQUENCE: u8 = 0x30;

/// Environment variable carrying the store password to `keytool -storepass:env`
pub const KEYTOOL_PASSWORD_VAR: &str = "NYMBUS_KEYTOOL_STOREPASS";

/// Keystore container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeystoreFormat {
    /// Sun JKS
    Jks,
    /// Sun JCEKS
    Jceks,
    /// PKCS#12 (the JDK default since 9)
    Pkcs12,
    /// Anything else, including empty or unreadable files
    Unknown,
}

impl KeystoreFormat {
    /// Detect the format from the first bytes of the file
    pub fn detect(header: &[u8]) -> Self {
        if header.starts_with(&JKS_MAGIC) {
            KeystoreFormat::Jks
        } else if header.starts_with(&JCEKS_MAGIC) {
            KeystoreFormat::Jceks
        } else if header.first() == Some(&DER_SEQUENCE) {
            KeystoreFormat::Pkcs12
        } else {
            KeystoreFormat::Unknown
        }
    }
}

impl fmt::Display for KeystoreFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeystoreFormat::Jks => "JKS",
            KeystoreFormat::Jceks => "JCEKS",
            KeystoreFormat::Pkcs12 => "PKCS12",
            KeystoreFormat::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// What was found at a keystore path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeystoreReport {
    /// Inspected path
    pub path: PathBuf,
    /// Whether a regular file is present
    pub exists: bool,
    /// Detected container format
    pub format: KeystoreFormat,
    /// File size, 0 when missing
    pub size_bytes: u64,
}

/// Inspect a keystore file. Missing or unreadable files are reported, not raised.
pub fn inspect(path: &Path) -> KeystoreReport {
    let mut report = KeystoreReport {
        path: path.to_path_buf(),
        exists: false,
        format: KeystoreFormat::Unknown,
        size_bytes: 0,
    };

    let Ok(metadata) = std::fs::metadata(path) else {
        return report;
    };
    if !metadata.is_file() {
        return report;
    }
    report.exists = true;
    report.size_bytes = metadata.len();

    let mut header = Vec::with_capacity(4);
    match std::fs::File::open(path).and_then(|f| f.take(4).read_to_end(&mut header)) {
        Ok(_) => report.format = KeystoreFormat::detect(&header),
        Err(e) => debug!(path = %path.display(), error = %e, "Could not read keystore header"),
    }

    report
}

/// Severity of a readiness finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Signing works but the result needs attention
    Warning,
    /// Signing cannot succeed
    Error,
}

/// A readiness finding for a signing config
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningIssue {
    /// How serious the finding is
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
}

impl SigningIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Check whether a signing config can produce a signed release
pub fn check(config: &ResolvedSigningConfig) -> Vec<SigningIssue> {
    let mut issues = Vec::new();

    if config.is_debug_fallback() {
        issues.push(SigningIssue::warning(
            "Using the debug keystore; the release artifact is not fit for distribution",
        ));
    }

    let report = inspect(&config.store_file);
    if !report.exists {
        issues.push(SigningIssue::error(format!(
            "Keystore not found: {}",
            config.store_file.display()
        )));
    } else if report.format == KeystoreFormat::Unknown {
        issues.push(SigningIssue::warning(format!(
            "Unrecognized keystore format: {}",
            config.store_file.display()
        )));
    }

    for (name, value) in [
        ("storePassword", &config.store_password),
        ("keyAlias", &config.key_alias),
        ("keyPassword", &config.key_password),
    ] {
        if value.is_empty() {
            issues.push(SigningIssue::error(format!("{} is empty", name)));
        }
    }

    issues
}

/// Whether any finding blocks signing
pub fn has_errors(issues: &[SigningIssue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Error)
}

/// Verify the store password and key alias against the keystore with the
/// `keytool` found on PATH.
///
/// The password is passed through the environment, never on the command line.
pub fn verify_with_keytool(config: &ResolvedSigningConfig) -> Result<()> {
    let keytool =
        process::which_command("keytool").ok_or_else(|| Error::command_not_found("keytool"))?;
    keytool_list(&keytool, config)
}

fn keytool_list(keytool: &Path, config: &ResolvedSigningConfig) -> Result<()> {
    let store_file = config.store_file.to_string_lossy();
    let dir = config
        .store_file
        .parent()
        .filter(|p| p.is_dir())
        .unwrap_or_else(|| Path::new("."));
    let args = [
        "-list",
        "-keystore",
        &*store_file,
        "-storepass:env",
        KEYTOOL_PASSWORD_VAR,
        "-alias",
        config.key_alias.as_str(),
    ];

    debug!(keytool = %keytool.display(), store = %store_file, "Verifying keystore credentials");
    let result = process::run_command_in_dir_with_env(
        keytool,
        &args,
        dir,
        &[(KEYTOOL_PASSWORD_VAR, config.store_password.as_str())],
    )?;

    if result.success {
        Ok(())
    } else {
        Err(Error::new(
            ErrorCode::SigningNotReady,
            format!(
                "keytool rejected the keystore credentials for alias '{}'",
                config.key_alias
            ),
        )
        .with_context(result.combined_output().trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::SigningSource;
    use tempfile::TempDir;

    fn config_for(store_file: PathBuf) -> ResolvedSigningConfig {
        ResolvedSigningConfig {
            store_file,
            store_password: "store-pw".to_string(),
            key_alias: "upload".to_string(),
            key_password: "key-pw".to_string(),
            source: SigningSource::Descriptor(PathBuf::from("key.properties")),
        }
    }

    #[test]
    fn test_detect_formats() {
        assert_eq!(KeystoreFormat::detect(&[0xFE, 0xED, 0xFE, 0xED, 0, 0]), KeystoreFormat::Jks);
        assert_eq!(KeystoreFormat::detect(&[0xCE, 0xCE, 0xCE, 0xCE]), KeystoreFormat::Jceks);
        assert_eq!(KeystoreFormat::detect(&[0x30, 0x82, 0x0A, 0x12]), KeystoreFormat::Pkcs12);
        assert_eq!(KeystoreFormat::detect(b"text"), KeystoreFormat::Unknown);
        assert_eq!(KeystoreFormat::detect(&[]), KeystoreFormat::Unknown);
    }

    #[test]
    fn test_inspect_missing_file() {
        let dir = TempDir::new().unwrap();
        let report = inspect(&dir.path().join("missing.jks"));
        assert!(!report.exists);
        assert_eq!(report.format, KeystoreFormat::Unknown);
        assert_eq!(report.size_bytes, 0);
    }

    #[test]
    fn test_inspect_directory_is_not_a_keystore() {
        let dir = TempDir::new().unwrap();
        assert!(!inspect(dir.path()).exists);
    }

    #[test]
    fn test_inspect_jks_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("release.jks");
        std::fs::write(&path, [0xFE, 0xED, 0xFE, 0xED, 0x00, 0x00, 0x00, 0x02]).unwrap();

        let report = inspect(&path);
        assert!(report.exists);
        assert_eq!(report.format, KeystoreFormat::Jks);
        assert_eq!(report.size_bytes, 8);
    }

    #[test]
    fn test_check_ready_config_has_no_issues() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("release.p12");
        std::fs::write(&path, [0x30, 0x82, 0x01, 0x00]).unwrap();

        let issues = check(&config_for(path));
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn test_check_missing_keystore_is_error() {
        let dir = TempDir::new().unwrap();
        let issues = check(&config_for(dir.path().join("missing.jks")));
        assert!(has_errors(&issues));
        assert!(issues[0].message.contains("Keystore not found"));
    }

    #[test]
    fn test_check_empty_fields_are_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("release.jks");
        std::fs::write(&path, JKS_MAGIC).unwrap();

        let mut config = config_for(path);
        config.key_alias.clear();
        config.key_password.clear();

        let issues = check(&config);
        let errors: Vec<_> = issues.iter().filter(|i| i.severity == Severity::Error).collect();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|i| i.message == "keyAlias is empty"));
    }

    #[test]
    fn test_check_debug_fallback_warns() {
        let home = TempDir::new().unwrap();
        let keystore = home.path().join(".android/debug.keystore");
        std::fs::create_dir_all(keystore.parent().unwrap()).unwrap();
        std::fs::write(&keystore, JKS_MAGIC).unwrap();

        let issues = check(&ResolvedSigningConfig::debug_fallback(home.path()));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(!has_errors(&issues));
    }

    #[test]
    fn test_check_unknown_format_warns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("release.jks");
        std::fs::write(&path, b"not a keystore").unwrap();

        let issues = check(&config_for(path));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[cfg(unix)]
    fn fake_keytool(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let keytool = dir.join("keytool");
        std::fs::write(
            &keytool,
            "#!/bin/sh\n\
             printf '%s\\n' \"$@\" > keytool-args.txt\n\
             printf '%s' \"$NYMBUS_KEYTOOL_STOREPASS\" > keytool-env.txt\n\
             [ \"$NYMBUS_KEYTOOL_STOREPASS\" = store-pw ] && exit 0\n\
             echo 'keytool error: password was incorrect' >&2\n\
             exit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&keytool, std::fs::Permissions::from_mode(0o755)).unwrap();
        keytool
    }

    #[cfg(unix)]
    #[test]
    fn test_keytool_gets_password_from_environment() {
        let dir = TempDir::new().unwrap();
        let keytool = fake_keytool(dir.path());
        let store = dir.path().join("release.jks");
        std::fs::write(&store, JKS_MAGIC).unwrap();

        keytool_list(&keytool, &config_for(store.clone())).unwrap();

        let args = std::fs::read_to_string(dir.path().join("keytool-args.txt")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(
            args,
            vec![
                "-list",
                "-keystore",
                store.to_str().unwrap(),
                "-storepass:env",
                KEYTOOL_PASSWORD_VAR,
                "-alias",
                "upload",
            ]
        );
        assert!(!args.contains(&"store-pw"));

        let env = std::fs::read_to_string(dir.path().join("keytool-env.txt")).unwrap();
        assert_eq!(env, "store-pw");
    }

    #[cfg(unix)]
    #[test]
    fn test_keytool_rejection_is_signing_not_ready() {
        let dir = TempDir::new().unwrap();
        let keytool = fake_keytool(dir.path());
        let store = dir.path().join("release.jks");
        std::fs::write(&store, JKS_MAGIC).unwrap();

        let mut config = config_for(store);
        config.store_password = "wrong".to_string();

        let err = keytool_list(&keytool, &config).unwrap_err();
        assert_eq!(err.code, ErrorCode::SigningNotReady);
        assert_eq!(err.exit_code(), 5);
        assert!(err.context.unwrap().contains("password was incorrect"));
    }
}
