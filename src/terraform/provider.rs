use std::path::{Path, PathBuf};

use crate::error::HarnessError;

pub const PROVIDER_CONFIG_FILE: &str = "provider.tf";

/// AWS provider that never talks to AWS: credential, metadata and region
/// checks are skipped so `terraform plan` runs offline. Only the STS
/// endpoint is left to the caller through `-var sts_endpoint=...`.
pub const PROVIDER_CONFIG: &str = r#"
variable "sts_endpoint" {}

provider "aws" {
  skip_credentials_validation = true
  skip_metadata_api_check     = true
  skip_get_ec2_platforms      = true
  skip_region_validation      = true
  skip_requesting_account_id  = true
  max_retries                 = 1
  access_key                  = "a"
  secret_key                  = "a"
  region                      = "eu-west-1"

  endpoints {
    sts = "${var.sts_endpoint}"
  }
}
"#;

/// Writes the dummy provider configuration, replacing any previous copy.
pub fn write_provider_config(dir: &Path, file_name: &str) -> Result<PathBuf, HarnessError> {
    let path = dir.join(file_name);
    std::fs::write(&path, PROVIDER_CONFIG).map_err(|source| HarnessError::ConfigWrite {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "wrote provider config");
    Ok(path)
}
