//! Fixture that turns a Terraform module directory into a [`TestingPlan`]:
//! write provider config, `init`, `plan -out`, load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::HarnessError;
use crate::harness::TestingPlan;
use crate::plan::{Plan, parse_plan_json};
use crate::terraform::{
    DEFAULT_COMMAND_TIMEOUT, DEFAULT_TERRAFORM_BIN, PROVIDER_CONFIG_FILE, PlanSource,
    TerraformCli, write_provider_config,
};

pub const DEFAULT_PLAN_FILE: &str = "plan";

pub const TERRAFORM_BIN_ENV: &str = "TFASSERT_TERRAFORM_BIN";
pub const TIMEOUT_ENV: &str = "TFASSERT_TIMEOUT_SECS";
pub const WORKDIR_ENV: &str = "TFASSERT_WORKDIR";

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureConfig {
    pub terraform_bin: PathBuf,
    pub working_dir: PathBuf,
    /// Relative paths resolve against `working_dir`.
    pub plan_file: PathBuf,
    pub config_file: String,
    pub timeout: Duration,
    pub vars: Vec<(String, String)>,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            terraform_bin: PathBuf::from(DEFAULT_TERRAFORM_BIN),
            working_dir: PathBuf::from("."),
            plan_file: PathBuf::from(DEFAULT_PLAN_FILE),
            config_file: PROVIDER_CONFIG_FILE.to_string(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            vars: Vec::new(),
        }
    }
}

impl FixtureConfig {
    /// Defaults overridden by `TFASSERT_TERRAFORM_BIN`, `TFASSERT_WORKDIR`
    /// and `TFASSERT_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, HarnessError> {
        let mut config = Self::default();
        if let Ok(bin) = std::env::var(TERRAFORM_BIN_ENV) {
            config.terraform_bin = PathBuf::from(bin);
        }
        if let Ok(dir) = std::env::var(WORKDIR_ENV) {
            config.working_dir = PathBuf::from(dir);
        }
        if let Ok(secs) = std::env::var(TIMEOUT_ENV) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                HarnessError::Config(format!("{TIMEOUT_ENV} must be a number of seconds, got '{secs}'"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.push((key.into(), value.into()));
        self
    }

    pub fn plan_path(&self) -> PathBuf {
        self.working_dir.join(&self.plan_file)
    }

    pub fn terraform(&self) -> TerraformCli {
        TerraformCli::new(&self.working_dir)
            .with_binary(&self.terraform_bin)
            .with_timeout(self.timeout)
    }
}

/// Parses a `key=value` assignment as accepted by `terraform -var`.
pub fn parse_var(raw: &str) -> Result<(String, String), HarnessError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(HarnessError::Config(format!(
            "invalid variable '{raw}', expected key=value"
        ))),
    }
}

/// Runs the whole fixture against the real `terraform` binary.
pub async fn setup(config: &FixtureConfig) -> Result<TestingPlan, HarnessError> {
    setup_with(&config.terraform(), config).await
}

pub async fn setup_with(
    source: &dyn PlanSource,
    config: &FixtureConfig,
) -> Result<TestingPlan, HarnessError> {
    write_provider_config(&config.working_dir, &config.config_file)?;
    source.init().await?;
    source.plan(&config.plan_file, &config.vars).await?;
    let plan = read_plan(source, &config.plan_file).await?;

    tracing::info!(
        source = source.name(),
        modules = plan.modules.len(),
        resources = plan.resource_count(),
        "plan loaded"
    );
    Ok(TestingPlan::new(plan))
}

/// Renders a saved plan through the source and parses it.
pub async fn read_plan(source: &dyn PlanSource, plan_file: &Path) -> Result<Plan, HarnessError> {
    let rendered = source.show_json(plan_file).await?;
    let plan = parse_plan_json(&rendered)?;
    let duplicates = plan.duplicate_resource_paths();
    if !duplicates.is_empty() {
        tracing::warn!(?duplicates, "resource paths repeated across modules");
    }
    Ok(plan)
}
