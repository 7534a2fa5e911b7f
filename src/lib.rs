//! tfassert - Terraform plan assertions
//!
//! Runs `terraform plan` for a module under test and checks that resources
//! and attribute values show up in the plan as expected.

pub mod fixture;
pub mod harness;
pub mod plan;
pub mod terraform;

mod error;
mod output;

pub use error::HarnessError;
pub use fixture::{FixtureConfig, read_plan, setup, setup_with};
pub use harness::{Recorder, Reporter, TestingPlan};
pub use output::{render_table, render_tree};
pub use plan::{
    AttributeDiff, ChangeAction, InstanceDiff, ModuleDiff, Plan, locate_attribute,
    locate_resource,
};
pub use terraform::{PlanSource, TerraformCli};
