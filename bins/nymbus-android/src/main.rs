//! Nymbus Android CLI
//!
//! Release signing tools for the Nymbus Android build.

use anyhow::Result;
use clap::{Parser, Subcommand};
use nymbus_android::export::{self, ExportFormat};
use nymbus_android::keystore::{self, Severity};
use nymbus_android::{gradle, ResolvedSigningConfig, SigningResolver};
use nymbus_cli::output::{format_count, format_duration, format_size, Status};
use nymbus_core::config::Config;
use nymbus_core::error::{exit_codes, Error};
use nymbus_telemetry::{TelemetryConfig, Timer};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "nymbus-android")]
#[command(about = "Release signing tools for Nymbus Android")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error log output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the release signing identity and show where it came from
    Resolve {
        /// Gradle root project directory
        #[arg(long)]
        root: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Print passwords instead of masking them
        #[arg(long)]
        reveal_secrets: bool,
    },

    /// Check that the resolved identity can sign a release
    Check {
        /// Gradle root project directory
        #[arg(long)]
        root: Option<PathBuf>,
        /// Also fail when the debug keystore fallback is in use
        #[arg(long)]
        strict: bool,
        /// Verify store password and alias with keytool
        #[arg(long)]
        verify: bool,
    },

    /// Export the signing identity for another tool
    Export {
        /// Gradle root project directory
        #[arg(long)]
        root: Option<PathBuf>,
        /// Format: json, gradle, env
        #[arg(long, default_value = "json")]
        format: String,
        /// Print passwords instead of masking them
        #[arg(long)]
        reveal_secrets: bool,
    },

    /// Build a signed release with Gradle
    Build {
        /// Gradle root project directory
        #[arg(long)]
        root: Option<PathBuf>,
        /// Build bundle (AAB) instead of APK
        #[arg(long)]
        bundle: bool,
        /// Allow signing the release with the debug keystore
        #[arg(long)]
        allow_debug_signing: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    nymbus_telemetry::init_with_config(TelemetryConfig::for_cli(
        cli.verbose,
        cli.quiet,
        cli.log_json,
    ))?;

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => std::process::exit(report_error(&e, false)),
    };

    let exit_code = match cli.command {
        Commands::Resolve { root, json, reveal_secrets } => {
            run_resolve(&gradle_root(root, &config), &config, json, reveal_secrets)
        }
        Commands::Check { root, strict, verify } => {
            run_check(&gradle_root(root, &config), &config, strict, verify)
        }
        Commands::Export { root, format, reveal_secrets } => {
            run_export(&gradle_root(root, &config), &config, &format, reveal_secrets)
        }
        Commands::Build { root, bundle, allow_debug_signing } => {
            run_build(&gradle_root(root, &config), &config, bundle, allow_debug_signing)
        }
    };

    std::process::exit(exit_code);
}

/// `--root`, else the configured Android directory when present, else the working directory
fn gradle_root(root: Option<PathBuf>, config: &Config) -> PathBuf {
    root.unwrap_or_else(|| {
        let android_dir = PathBuf::from(&config.schema.general.android_dir);
        if android_dir.is_dir() {
            android_dir
        } else {
            PathBuf::from(".")
        }
    })
}

fn resolve_signing(root: &Path, config: &Config) -> nymbus_core::Result<ResolvedSigningConfig> {
    if !root.is_dir() {
        return Err(Error::directory_not_found(root)
            .with_suggestion("Pass the directory containing settings.gradle with --root"));
    }
    if !gradle::is_gradle_root(root) {
        tracing::debug!(root = %root.display(), "No settings.gradle found in root");
    }

    let timer = Timer::start("signing.resolve");
    let resolved = SigningResolver::for_project(root, &config.schema.signing)?.resolve()?;
    timer.stop();

    Ok(resolved)
}

/// Print `err` and return its exit code. With `json`, an `ErrorReport` also goes to stdout.
fn report_error(err: &Error, json: bool) -> i32 {
    Status::error(&err.to_string());
    if json {
        match err.to_report().to_json() {
            Ok(report) => println!("{}", report),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize error report"),
        }
    }
    err.exit_code()
}

fn print_signing(resolved: &ResolvedSigningConfig, reveal_secrets: bool) {
    let secret = |value: &str| {
        if reveal_secrets {
            value.to_string()
        } else {
            export::mask_secret(value)
        }
    };

    Status::header("Release signing");
    Status::detail("Source", &resolved.source.to_string());
    Status::detail("storeFile", &resolved.store_file.display().to_string());
    Status::detail("storePassword", &secret(&resolved.store_password));
    Status::detail("keyAlias", &resolved.key_alias);
    Status::detail("keyPassword", &secret(&resolved.key_password));
    println!();
}

fn run_resolve(root: &Path, config: &Config, json: bool, reveal_secrets: bool) -> i32 {
    let resolved = match resolve_signing(root, config) {
        Ok(resolved) => resolved,
        Err(e) => return report_error(&e, json),
    };

    if json {
        return print_export(&resolved, ExportFormat::Json, reveal_secrets);
    }

    print_signing(&resolved, reveal_secrets);
    if resolved.is_debug_fallback() {
        Status::warning("No key.properties found; releases will be signed with the debug keystore");
    }

    exit_codes::SUCCESS
}

fn run_check(root: &Path, config: &Config, strict: bool, verify: bool) -> i32 {
    let resolved = match resolve_signing(root, config) {
        Ok(resolved) => resolved,
        Err(e) => return report_error(&e, false),
    };

    print_signing(&resolved, false);

    let report = keystore::inspect(&resolved.store_file);
    if report.exists {
        Status::info(&format!(
            "Keystore: {} ({})",
            report.format,
            format_size(report.size_bytes)
        ));
    }

    let issues = keystore::check(&resolved);
    for issue in &issues {
        match issue.severity {
            Severity::Error => Status::error(&issue.message),
            Severity::Warning => Status::warning(&issue.message),
        }
    }

    if keystore::has_errors(&issues) {
        Status::error(&format!(
            "Signing not ready: {}",
            format_count(issues.len(), "issue", "issues")
        ));
        return exit_codes::FAILURE;
    }

    if verify {
        match keystore::verify_with_keytool(&resolved) {
            Ok(()) => Status::success("keytool accepted the store password and alias"),
            Err(e) => return report_error(&e, false),
        }
    }

    if strict && resolved.is_debug_fallback() {
        Status::error("Strict mode: the debug keystore cannot sign a release");
        return exit_codes::FAILURE;
    }

    Status::success("Release signing is ready");
    exit_codes::SUCCESS
}

fn print_export(
    resolved: &ResolvedSigningConfig,
    format: ExportFormat,
    reveal_secrets: bool,
) -> i32 {
    match export::render(resolved, format, reveal_secrets) {
        Ok(rendered) => {
            println!("{}", rendered);
            exit_codes::SUCCESS
        }
        Err(e) => report_error(&Error::from(e), format == ExportFormat::Json),
    }
}

fn run_export(root: &Path, config: &Config, format: &str, reveal_secrets: bool) -> i32 {
    let format: ExportFormat = match format.parse() {
        Ok(format) => format,
        Err(message) => {
            Status::error(&message);
            return exit_codes::VALIDATION_ERROR;
        }
    };

    match resolve_signing(root, config) {
        Ok(resolved) => print_export(&resolved, format, reveal_secrets),
        Err(e) => report_error(&e, format == ExportFormat::Json),
    }
}

fn run_build(root: &Path, config: &Config, bundle: bool, allow_debug_signing: bool) -> i32 {
    let resolved = match resolve_signing(root, config) {
        Ok(resolved) => resolved,
        Err(e) => return report_error(&e, false),
    };

    if resolved.is_debug_fallback() {
        if !allow_debug_signing {
            let err = Error::signing_not_ready(
                "No signing descriptor found; refusing to sign a release with the debug keystore",
            );
            return report_error(&err, false);
        }
        Status::warning("Signing release with the debug keystore; do not distribute this build");
    }

    let issues = keystore::check(&resolved);
    if keystore::has_errors(&issues) {
        for issue in issues.iter().filter(|i| i.severity == Severity::Error) {
            Status::error(&issue.message);
        }
        return exit_codes::FAILURE;
    }

    let artifact = if bundle { "bundle" } else { "APK" };
    Status::info(&format!("Building signed release {}...", artifact));

    let started = Instant::now();
    let result = if bundle {
        gradle::bundle_release_signed(root, &resolved)
    } else {
        gradle::assemble_release_signed(root, &resolved)
    };

    match result {
        Ok(()) => {
            Status::success(&format!(
                "Signed release {} built in {}",
                artifact,
                format_duration(started.elapsed())
            ));
            exit_codes::SUCCESS
        }
        Err(e) => report_error(&e, false),
    }
}
