mod args;

pub use args::{Cli, Command, OutputFormat, PlanInput};
