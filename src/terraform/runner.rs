use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::HarnessError;

pub const DEFAULT_TERRAFORM_BIN: &str = "terraform";
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);
pub const AUTOMATION_ENV: &str = "TF_IN_AUTOMATION";

/// Anything that can produce a plan and render it as JSON.
#[async_trait]
pub trait PlanSource: Send + Sync {
    fn name(&self) -> &str;
    async fn init(&self) -> Result<(), HarnessError>;
    async fn plan(&self, out: &Path, vars: &[(String, String)]) -> Result<(), HarnessError>;
    async fn show_json(&self, plan: &Path) -> Result<String, HarnessError>;
}

/// Runs the `terraform` binary inside a working directory.
///
/// Each invocation gets `TF_IN_AUTOMATION=1` on top of the inherited
/// environment and is killed once `timeout` elapses.
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: PathBuf,
    working_dir: PathBuf,
    timeout: Duration,
}

impl TerraformCli {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_TERRAFORM_BIN),
            working_dir: working_dir.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    async fn run(&self, args: Vec<OsString>) -> Result<Output, HarnessError> {
        let description = std::iter::once(self.binary.as_os_str())
            .chain(args.iter().map(OsString::as_os_str))
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args)
            .current_dir(&self.working_dir)
            .env(AUTOMATION_ENV, "1")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::info!(command = %description, dir = %self.working_dir.display(), "running");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                tracing::warn!(command = %description, timeout = ?self.timeout, "command timed out");
                HarnessError::Timeout {
                    command: description.clone(),
                    timeout: self.timeout,
                }
            })?
            .map_err(|source| HarnessError::Spawn {
                command: description.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(HarnessError::CommandFailed {
                command: description,
                status: output.status.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        tracing::debug!(command = %description, "command succeeded");
        Ok(output)
    }
}

#[async_trait]
impl PlanSource for TerraformCli {
    fn name(&self) -> &str {
        "terraform"
    }

    async fn init(&self) -> Result<(), HarnessError> {
        self.run(vec!["init".into()]).await.map(|_| ())
    }

    async fn plan(&self, out: &Path, vars: &[(String, String)]) -> Result<(), HarnessError> {
        self.run(plan_args(out, vars)).await.map(|_| ())
    }

    async fn show_json(&self, plan: &Path) -> Result<String, HarnessError> {
        let output = self
            .run(vec!["show".into(), "-json".into(), plan.into()])
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn plan_args(out: &Path, vars: &[(String, String)]) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["plan".into(), "-out".into(), out.into()];
    for (key, value) in vars {
        args.push("-var".into());
        args.push(format!("{key}={value}").into());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_plan_args() {
        let vars = vec![
            ("component".to_string(), "a".to_string()),
            ("environment".to_string(), "b".to_string()),
        ];
        let args = plan_args(Path::new("plan"), &vars);
        assert_eq!(
            args,
            os(&["plan", "-out", "plan", "-var", "component=a", "-var", "environment=b"])
        );
    }

    #[test]
    fn test_plan_args_without_vars() {
        assert_eq!(plan_args(Path::new("out.tfplan"), &[]), os(&["plan", "-out", "out.tfplan"]));
    }

    #[test]
    fn test_builder_defaults() {
        let cli = TerraformCli::new("/tmp/work");
        assert_eq!(cli.working_dir(), Path::new("/tmp/work"));
        assert_eq!(cli.binary, PathBuf::from("terraform"));
        assert_eq!(cli.timeout, DEFAULT_COMMAND_TIMEOUT);

        let cli = cli
            .with_binary("/opt/tf/bin/terraform")
            .with_timeout(Duration::from_secs(3));
        assert_eq!(cli.binary, PathBuf::from("/opt/tf/bin/terraform"));
        assert_eq!(cli.timeout, Duration::from_secs(3));
        assert_eq!(cli.name(), "terraform");
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let cli = TerraformCli::new(dir.path()).with_binary(dir.path().join("no-such-terraform"));
        let result = cli.init().await;
        assert!(matches!(result, Err(HarnessError::Spawn { .. })));
    }
}
