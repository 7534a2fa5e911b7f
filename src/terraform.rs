mod provider;
mod runner;

pub use provider::{PROVIDER_CONFIG_FILE, write_provider_config};
pub use runner::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_TERRAFORM_BIN, PlanSource, TerraformCli};
