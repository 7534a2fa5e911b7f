use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serial_test::serial;
use tfassert::{FixtureConfig, HarnessError, PlanSource, Recorder, setup, setup_with};

const PLAN_JSON: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/plan.json");

/// Stand-in for the terraform binary: logs every call, creates the plan
/// file on `plan -out` and prints the canned JSON on `show -json`.
fn fake_terraform(dir: &Path, init_body: &str) -> PathBuf {
    let script = format!(
        r#"#!/bin/sh
echo "TF_IN_AUTOMATION=$TF_IN_AUTOMATION $*" >> calls.log
case "$1" in
  init)
    {init_body}
    ;;
  plan)
    [ "$2" = "-out" ] && : > "$3"
    echo "Plan: 2 to add, 0 to change, 0 to destroy."
    ;;
  show)
    cat "{PLAN_JSON}"
    ;;
  *)
    echo "unknown command $1" >&2
    exit 1
    ;;
esac
"#
    );
    let path = dir.join("terraform");
    std::fs::write(&path, script).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

fn config(bin: PathBuf, workdir: &Path) -> FixtureConfig {
    FixtureConfig {
        terraform_bin: bin,
        timeout: Duration::from_secs(30),
        ..FixtureConfig::default()
    }
    .with_working_dir(workdir)
    .with_var("component", "mycomponent")
    .with_var("environment", "test")
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_setup_runs_init_plan_and_loads() {
    let bin_dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    let bin = fake_terraform(bin_dir.path(), r#"echo "Terraform has been successfully initialized!""#);

    let testing = setup(&config(bin, workdir.path())).await.unwrap();

    let provider = std::fs::read_to_string(workdir.path().join("provider.tf")).unwrap();
    assert!(provider.contains(r#"provider "aws""#));
    assert!(workdir.path().join("plan").exists());

    let calls = std::fs::read_to_string(workdir.path().join("calls.log")).unwrap();
    let calls: Vec<&str> = calls.lines().collect();
    assert_eq!(
        calls,
        vec![
            "TF_IN_AUTOMATION=1 init",
            "TF_IN_AUTOMATION=1 plan -out plan -var component=mycomponent -var environment=test",
            "TF_IN_AUTOMATION=1 show -json plan",
        ]
    );

    let mut recorder = Recorder::new();
    testing.assert_resource(&mut recorder, "aws_iam_policy.secrets_policy");
    testing.assert_resource_attribute(
        &mut recorder,
        "aws_iam_policy.secrets_policy",
        "name",
        "test-mycomponent-secrets",
    );
    recorder.finish().unwrap();
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_failed_command_surfaces_output() {
    let bin_dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    let bin = fake_terraform(
        bin_dir.path(),
        r#"echo "Initializing provider plugins..."; echo "Error: Failed to query available provider packages" >&2; exit 1"#,
    );

    let err = setup(&config(bin, workdir.path())).await.unwrap_err();

    match err {
        HarnessError::CommandFailed {
            command,
            stdout,
            stderr,
            ..
        } => {
            assert!(command.ends_with("terraform init"));
            assert!(stdout.contains("Initializing provider plugins..."));
            assert!(stderr.contains("Failed to query available provider packages"));
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
    assert!(!workdir.path().join("plan").exists());
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_hung_command_is_killed_after_timeout() {
    let bin_dir = tempfile::tempdir().unwrap();
    let workdir = tempfile::tempdir().unwrap();
    let bin = fake_terraform(bin_dir.path(), "exec sleep 30");

    let mut config = config(bin, workdir.path());
    config.timeout = Duration::from_millis(300);

    let started = Instant::now();
    let err = setup(&config).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(10));
    match err {
        HarnessError::Timeout { command, timeout } => {
            assert!(command.ends_with("terraform init"));
            assert_eq!(timeout, Duration::from_millis(300));
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
}

#[derive(Default)]
struct StubSource {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl PlanSource for StubSource {
    fn name(&self) -> &str {
        "stub"
    }

    async fn init(&self) -> Result<(), HarnessError> {
        self.calls.lock().unwrap().push("init".to_string());
        Ok(())
    }

    async fn plan(&self, out: &Path, vars: &[(String, String)]) -> Result<(), HarnessError> {
        let vars: Vec<String> = vars.iter().map(|(k, v)| format!("{k}={v}")).collect();
        self.calls
            .lock()
            .unwrap()
            .push(format!("plan {} {}", out.display(), vars.join(" ")));
        Ok(())
    }

    async fn show_json(&self, plan: &Path) -> Result<String, HarnessError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("show {}", plan.display()));
        Ok(std::fs::read_to_string(PLAN_JSON).unwrap())
    }
}

#[tokio::test]
async fn test_setup_with_custom_source() {
    let workdir = tempfile::tempdir().unwrap();
    let source = StubSource::default();
    let mut config = FixtureConfig::default()
        .with_working_dir(workdir.path())
        .with_var("environment", "test");
    config.plan_file = PathBuf::from("out.tfplan");

    let testing = setup_with(&source, &config).await.unwrap();

    assert_eq!(
        *source.calls.lock().unwrap(),
        vec!["init", "plan out.tfplan environment=test", "show out.tfplan"]
    );
    assert!(workdir.path().join("provider.tf").exists());
    assert_eq!(testing.plan.resource_count(), 4);
}

#[tokio::test]
async fn test_setup_fails_fast_when_config_cannot_be_written() {
    let workdir = tempfile::tempdir().unwrap();
    let source = StubSource::default();
    let config = FixtureConfig::default().with_working_dir(workdir.path().join("missing"));

    let err = setup_with(&source, &config).await.unwrap_err();

    assert!(matches!(err, HarnessError::ConfigWrite { .. }));
    assert!(source.calls.lock().unwrap().is_empty());
}
