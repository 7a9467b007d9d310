//! Configuration schema definitions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub signing: SigningConfig,
}

impl ConfigSchema {
    /// Validate values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        self.general.validate()?;
        self.signing.validate()
    }
}

/// General project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Project name
    #[serde(default = "default_project_name")]
    pub project_name: String,

    /// Gradle root project directory, relative to the repository root
    #[serde(default = "default_android_dir")]
    pub android_dir: String,
}

impl GeneralConfig {
    fn validate(&self) -> Result<()> {
        if self.android_dir.trim().is_empty() {
            return Err(Error::config_validation("general.android_dir must not be empty"));
        }
        Ok(())
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            android_dir: default_android_dir(),
        }
    }
}

fn default_project_name() -> String {
    "Nymbus Coletor".to_string()
}

fn default_android_dir() -> String {
    "android".to_string()
}

/// Release signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Credential descriptor candidates in priority order, relative to the Gradle root
    #[serde(default = "default_descriptors")]
    pub descriptors: Vec<String>,

    /// Application module directory name. Also the prefix marking a
    /// root-relative `storeFile`.
    #[serde(default = "default_module")]
    pub module: String,
}

impl SigningConfig {
    /// Expand and anchor the descriptor candidates under `root_dir`.
    ///
    /// `~` and `$VAR` references are expanded; absolute entries are kept as-is.
    pub fn descriptor_paths(&self, root_dir: &Path) -> Result<Vec<PathBuf>> {
        self.descriptors
            .iter()
            .map(|raw| {
                let expanded = shellexpand::full(raw).map_err(|e| {
                    Error::config(format!("Cannot expand signing descriptor '{}': {}", raw, e))
                })?;
                Ok(root_dir.join(&*expanded))
            })
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.descriptors.is_empty() {
            return Err(Error::config_validation(
                "signing.descriptors must list at least one candidate",
            ));
        }

        let module = self.module.trim();
        if module.is_empty() || module.contains(['/', '\\']) || module == "." || module == ".." {
            return Err(Error::config_validation(format!(
                "signing.module must be a single directory name, got '{}'",
                self.module
            ))
            .with_suggestion("Use the module folder name, e.g. module = \"app\""));
        }
        Ok(())
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            descriptors: default_descriptors(),
            module: default_module(),
        }
    }
}

fn default_descriptors() -> Vec<String> {
    vec!["key.properties", "android/key.properties"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_module() -> String {
    "app".to_string()
}
