use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::fixture::{FixtureConfig, parse_var};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write provider config, run init and plan, then print the plan
    Run(RunArgs),
    /// Assert that a resource (and optionally an attribute value) is planned
    Check(CheckArgs),
    /// Print an existing plan
    Show(ShowArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct TerraformArgs {
    #[arg(long, env = "TFASSERT_WORKDIR", default_value = ".")]
    pub workdir: PathBuf,

    #[arg(long, env = "TFASSERT_TERRAFORM_BIN", default_value = "terraform")]
    pub terraform: PathBuf,

    /// Seconds before a terraform command is killed
    #[arg(long, env = "TFASSERT_TIMEOUT_SECS", default_value_t = 600)]
    pub timeout: u64,

    #[arg(long, default_value = "plan")]
    pub plan_file: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct PlanInput {
    #[command(flatten)]
    pub terraform: TerraformArgs,

    /// Read an already rendered `terraform show -json` file instead
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Tree,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub terraform: TerraformArgs,

    /// Variable assignment passed through as `-var key=value`
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: PlanInput,

    #[arg(long)]
    pub resource: String,

    #[arg(long, requires = "equals")]
    pub attribute: Option<String>,

    /// Expected planned value of `--attribute`
    #[arg(long, requires = "attribute")]
    pub equals: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub input: PlanInput,

    #[arg(long, value_enum, default_value_t = OutputFormat::Tree)]
    pub format: OutputFormat,
}

impl TerraformArgs {
    pub fn fixture_config(&self, vars: Vec<(String, String)>) -> FixtureConfig {
        FixtureConfig {
            terraform_bin: self.terraform.clone(),
            working_dir: self.workdir.clone(),
            plan_file: self.plan_file.clone(),
            timeout: std::time::Duration::from_secs(self.timeout),
            vars,
            ..FixtureConfig::default()
        }
    }
}
