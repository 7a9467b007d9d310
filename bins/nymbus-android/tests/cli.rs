use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Project {
    tmp: TempDir,
}

impl Project {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("android/app")).unwrap();
        std::fs::create_dir_all(tmp.path().join("home")).unwrap();
        std::fs::write(tmp.path().join("android/settings.gradle.kts"), "").unwrap();
        Self { tmp }
    }

    fn root(&self) -> PathBuf {
        self.tmp.path().join("android")
    }

    fn home(&self) -> PathBuf {
        self.tmp.path().join("home")
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.tmp.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("nymbus-android").unwrap();
        cmd.current_dir(self.tmp.path())
            .env("HOME", self.home())
            .env_remove("RUST_LOG")
            .arg("--no-color");
        cmd
    }

    fn resolve_json(&self) -> serde_json::Value {
        let output = self
            .cmd()
            .args(["resolve", "--json", "--root"])
            .arg(self.root())
            .output()
            .unwrap();
        assert!(output.status.success(), "resolve failed: {:?}", output);
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn resolve_falls_back_to_debug_keystore() {
    let project = Project::new();
    let value = project.resolve_json();

    assert_eq!(
        value["storeFile"],
        display(&project.home().join(".android/debug.keystore"))
    );
    assert_eq!(value["keyAlias"], "AndroidDebugKey");
    assert_eq!(value["storePassword"], "*******");
    assert_eq!(value["source"]["kind"], "debug_fallback");
}

#[test]
fn resolve_reads_root_descriptor_with_module_prefix() {
    let project = Project::new();
    project.write(
        "android/key.properties",
        "storePassword=store-password\nkeyPassword=key-password\nkeyAlias=upload\nstoreFile=app/release.jks\n",
    );

    let value = project.resolve_json();
    assert_eq!(value["storeFile"], display(&project.root().join("app/release.jks")));
    assert_eq!(value["keyAlias"], "upload");
    assert_eq!(value["storePassword"], "stor...word");
    assert_eq!(value["debugFallback"], false);
}

#[test]
fn resolve_plain_store_file_is_module_relative() {
    let project = Project::new();
    project.write("android/android/key.properties", "keyAlias=upload\nstoreFile=release.jks\n");

    let value = project.resolve_json();
    assert_eq!(value["storeFile"], display(&project.root().join("app/release.jks")));
}

#[test]
fn resolve_defaults_root_to_android_dir() {
    let project = Project::new();
    project.write("android/key.properties", "keyAlias=from-default-root\n");

    project
        .cmd()
        .args(["resolve", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from-default-root"));
}

#[test]
fn malformed_descriptor_is_fatal() {
    let project = Project::new();
    project.write("android/key.properties", "storePassword=\\u12G4\n");
    project.write("android/android/key.properties", "keyAlias=upload\n");

    project
        .cmd()
        .args(["resolve", "--root"])
        .arg(project.root())
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Malformed signing descriptor"))
        .stdout(predicate::str::contains("upload").not());
}

#[test]
fn json_failure_prints_error_report() {
    let project = Project::new();
    project.write("android/key.properties", "storePassword=\\u12G4\n");

    for args in [
        &["resolve", "--json", "--root"][..],
        &["export", "--format", "json", "--root"][..],
    ] {
        let output = project.cmd().args(args).arg(project.root()).output().unwrap();
        assert_eq!(output.status.code(), Some(5));

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(report["code"], "SIGNING_DESCRIPTOR_MALFORMED");
        assert_eq!(report["code_str"], "E7002");
        assert_eq!(report["category"], "Signing");
        assert!(report["suggestion"].is_string());
    }
}

#[test]
fn text_failure_keeps_stdout_empty() {
    let project = Project::new();
    project.write("android/key.properties", "storePassword=\\u12G4\n");

    project
        .cmd()
        .args(["export", "--format", "gradle", "--root"])
        .arg(project.root())
        .assert()
        .code(5)
        .stdout(predicate::str::is_empty());
}

#[test]
fn config_file_changes_module() {
    let project = Project::new();
    project.write(".nymbus.toml", "[signing]\nmodule = \"mobile\"\n");
    project.write("android/key.properties", "storeFile=mobile/upload.jks\n");

    let value = project.resolve_json();
    assert_eq!(value["storeFile"], display(&project.root().join("mobile/upload.jks")));
}

#[test]
fn invalid_config_exits_with_config_error() {
    let project = Project::new();
    project.write(".nymbus.toml", "[signing]\ndescriptors = []\n");

    project
        .cmd()
        .args(["resolve"])
        .assert()
        .code(3);
}

#[test]
fn export_gradle_reveals_injected_properties() {
    let project = Project::new();
    project.write(
        "android/key.properties",
        "storePassword=pw\nkeyPassword=pw\nkeyAlias=upload\nstoreFile=release.jks\n",
    );

    project
        .cmd()
        .args(["export", "--format", "gradle", "--reveal-secrets", "--root"])
        .arg(project.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("-Pandroid.injected.signing.key.alias=upload"))
        .stdout(predicate::str::contains("-Pandroid.injected.signing.store.password=pw"));
}

#[test]
fn export_rejects_unknown_format() {
    let project = Project::new();

    project
        .cmd()
        .args(["export", "--format", "yaml", "--root"])
        .arg(project.root())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unknown format"));
}

#[test]
fn check_passes_with_real_keystore() {
    let project = Project::new();
    project.write(
        "android/key.properties",
        "storePassword=pw\nkeyPassword=pw\nkeyAlias=upload\nstoreFile=release.jks\n",
    );
    std::fs::write(
        project.root().join("app/release.jks"),
        [0xFE, 0xED, 0xFE, 0xED, 0x00, 0x00, 0x00, 0x02],
    )
    .unwrap();

    project
        .cmd()
        .args(["check", "--strict", "--root"])
        .arg(project.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("JKS"));
}

#[test]
fn check_strict_rejects_debug_fallback() {
    let project = Project::new();
    let keystore = project.home().join(".android/debug.keystore");
    std::fs::create_dir_all(keystore.parent().unwrap()).unwrap();
    std::fs::write(&keystore, [0xFE, 0xED, 0xFE, 0xED]).unwrap();

    project
        .cmd()
        .args(["check", "--root"])
        .arg(project.root())
        .assert()
        .success();

    project
        .cmd()
        .args(["check", "--strict", "--root"])
        .arg(project.root())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Strict mode"));
}

#[test]
fn check_reports_missing_keystore() {
    let project = Project::new();
    project.write(
        "android/key.properties",
        "storePassword=pw\nkeyPassword=pw\nkeyAlias=upload\nstoreFile=missing.jks\n",
    );

    project
        .cmd()
        .args(["check", "--root"])
        .arg(project.root())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Keystore not found"));
}

#[test]
fn build_refuses_debug_signing_by_default() {
    let project = Project::new();

    project
        .cmd()
        .args(["build", "--root"])
        .arg(project.root())
        .assert()
        .code(5)
        .stderr(predicate::str::contains("debug keystore"));
}

#[test]
fn missing_root_is_reported() {
    let project = Project::new();

    project
        .cmd()
        .args(["resolve", "--root"])
        .arg(project.tmp.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Directory not found"));
}

#[cfg(unix)]
#[test]
fn check_verify_runs_keytool_from_path() {
    use std::os::unix::fs::PermissionsExt;

    let project = Project::new();
    project.write(
        "android/key.properties",
        "storePassword=good\nkeyPassword=pw\nkeyAlias=upload\nstoreFile=release.jks\n",
    );
    std::fs::write(project.root().join("app/release.jks"), [0xFE, 0xED, 0xFE, 0xED]).unwrap();

    let bin = project.tmp.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let keytool = bin.join("keytool");
    std::fs::write(
        &keytool,
        "#!/bin/sh\n[ \"$NYMBUS_KEYTOOL_STOREPASS\" = good ] && exit 0\necho 'password was incorrect' >&2\nexit 1\n",
    )
    .unwrap();
    std::fs::set_permissions(&keytool, std::fs::Permissions::from_mode(0o755)).unwrap();

    let path = format!("{}:{}", bin.display(), std::env::var("PATH").unwrap_or_default());

    project
        .cmd()
        .env("PATH", &path)
        .args(["check", "--verify", "--root"])
        .arg(project.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("keytool accepted"));

    project.write(
        "android/key.properties",
        "storePassword=bad\nkeyPassword=pw\nkeyAlias=upload\nstoreFile=release.jks\n",
    );

    project
        .cmd()
        .env("PATH", &path)
        .args(["check", "--verify", "--root"])
        .arg(project.root())
        .assert()
        .code(5)
        .stderr(predicate::str::contains("keytool rejected"));
}
