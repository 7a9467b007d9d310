//! Rendering a resolved signing identity for the packaging step

use crate::signing::{ResolvedSigningConfig, SigningSource};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Output format for a signing identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON object
    Json,
    /// Android Gradle Plugin injected signing properties, one per line
    Gradle,
    /// Shell-quoted `NYMBUS_*` environment assignments
    Env,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "gradle" => Ok(ExportFormat::Gradle),
            "env" => Ok(ExportFormat::Env),
            other => Err(format!("Unknown format: {} (expected json, gradle or env)", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Json => "json",
            ExportFormat::Gradle => "gradle",
            ExportFormat::Env => "env",
        };
        f.write_str(name)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedSigning<'a> {
    store_file: String,
    store_password: String,
    key_alias: &'a str,
    key_password: String,
    source: &'a SigningSource,
    debug_fallback: bool,
}

/// Mask a secret for display (show first/last few chars)
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

fn secret(value: &str, reveal: bool) -> String {
    if reveal {
        value.to_string()
    } else {
        mask_secret(value)
    }
}

/// `-P` arguments that make the Android Gradle Plugin sign with `config`.
///
/// These carry the real secrets and are meant for the Gradle command line.
pub fn injected_properties(config: &ResolvedSigningConfig) -> Vec<String> {
    injected_properties_masked(config, true)
}

fn injected_properties_masked(config: &ResolvedSigningConfig, reveal: bool) -> Vec<String> {
    vec![
        format!(
            "-Pandroid.injected.signing.store.file={}",
            config.store_file.display()
        ),
        format!(
            "-Pandroid.injected.signing.store.password={}",
            secret(&config.store_password, reveal)
        ),
        format!("-Pandroid.injected.signing.key.alias={}", config.key_alias),
        format!(
            "-Pandroid.injected.signing.key.password={}",
            secret(&config.key_password, reveal)
        ),
    ]
}

/// Quote a value for POSIX shells
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Render `config` in `format`. Passwords are masked unless `reveal_secrets`.
pub fn render(
    config: &ResolvedSigningConfig,
    format: ExportFormat,
    reveal_secrets: bool,
) -> serde_json::Result<String> {
    let rendered = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&ExportedSigning {
            store_file: config.store_file.display().to_string(),
            store_password: secret(&config.store_password, reveal_secrets),
            key_alias: &config.key_alias,
            key_password: secret(&config.key_password, reveal_secrets),
            source: &config.source,
            debug_fallback: config.is_debug_fallback(),
        })?,
        ExportFormat::Gradle => injected_properties_masked(config, reveal_secrets).join("\n"),
        ExportFormat::Env => [
            ("NYMBUS_STORE_FILE", config.store_file.display().to_string()),
            (
                "NYMBUS_STORE_PASSWORD",
                secret(&config.store_password, reveal_secrets),
            ),
            ("NYMBUS_KEY_ALIAS", config.key_alias.clone()),
            (
                "NYMBUS_KEY_PASSWORD",
                secret(&config.key_password, reveal_secrets),
            ),
        ]
        .iter()
        .map(|(name, value)| format!("{}={}", name, shell_quote(value)))
        .collect::<Vec<_>>()
        .join("\n"),
    };
    Ok(rendered)
}
