//! Gradle build system integration
//!
//! Runs Gradle wrapper tasks, injecting the resolved release signing identity
//! as Android Gradle Plugin command-line properties.

use crate::export::injected_properties;
use crate::signing::ResolvedSigningConfig;
use nymbus_core::error::{Error, ErrorCode, Result};
use nymbus_core::process::run_command_streaming_in_dir;
use std::path::{Path, PathBuf};
use tracing::info;

/// Gradle wrapper script name for this platform
pub fn wrapper_name() -> &'static str {
    if cfg!(windows) {
        "gradlew.bat"
    } else {
        "gradlew"
    }
}

/// Path of the Gradle wrapper in `project_dir`, if present
pub fn find_wrapper(project_dir: &Path) -> Option<PathBuf> {
    let wrapper = project_dir.join(wrapper_name());
    wrapper.is_file().then_some(wrapper)
}

/// Whether `dir` looks like a Gradle root project
pub fn is_gradle_root(dir: &Path) -> bool {
    ["settings.gradle", "settings.gradle.kts"]
        .iter()
        .any(|name| dir.join(name).is_file())
}

/// Run a Gradle task through the wrapper, streaming its output
pub fn run_task(project_dir: &Path, task: &str, extra_args: &[String]) -> Result<i32> {
    let wrapper = find_wrapper(project_dir).ok_or_else(|| {
        Error::command_not_found(wrapper_name())
            .with_context(format!("Looked in {}", project_dir.display()))
    })?;
    let wrapper = std::fs::canonicalize(&wrapper)?;

    let mut args = Vec::with_capacity(extra_args.len() + 1);
    args.push(task.to_string());
    args.extend(extra_args.iter().cloned());

    info!(task, project = %project_dir.display(), "Running Gradle task");
    run_command_streaming_in_dir(&wrapper, &args, project_dir)
}

fn run_signed(project_dir: &Path, task: &str, signing: &ResolvedSigningConfig) -> Result<()> {
    let code = run_task(project_dir, task, &injected_properties(signing))?;
    if code == 0 {
        Ok(())
    } else {
        Err(Error::new(
            ErrorCode::GradleError,
            format!("Gradle task {} failed with exit code {}", task, code),
        ))
    }
}

/// Build a signed release APK
pub fn assemble_release_signed(project_dir: &Path, signing: &ResolvedSigningConfig) -> Result<()> {
    run_signed(project_dir, "assembleRelease", signing)
}

/// Build a signed release bundle (AAB)
pub fn bundle_release_signed(project_dir: &Path, signing: &ResolvedSigningConfig) -> Result<()> {
    run_signed(project_dir, "bundleRelease", signing)
}
