mod cli;
mod error;
mod fixture;
mod harness;
mod output;
mod plan;
mod terraform;

use clap::Parser;
use color_eyre::eyre::{Result, bail};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, OutputFormat, PlanInput};
use harness::{Recorder, TestingPlan};
use plan::Plan;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let config = args.terraform.fixture_config(args.vars);
            let testing = fixture::setup(&config).await?;
            print_plan(&testing.plan, args.format);
        }
        Command::Check(args) => {
            let testing = TestingPlan::new(load(&args.input).await?);
            let mut recorder = Recorder::new();
            match (&args.attribute, &args.equals) {
                (Some(attribute), Some(expected)) => {
                    testing.assert_resource_attribute(
                        &mut recorder,
                        &args.resource,
                        attribute,
                        expected,
                    );
                }
                _ => {
                    testing.assert_resource(&mut recorder, &args.resource);
                }
            }
            recorder.finish()?;
        }
        Command::Show(args) => {
            let plan = load(&args.input).await?;
            print_plan(&plan, args.format);
        }
    }

    Ok(())
}

async fn load(input: &PlanInput) -> Result<Plan> {
    if let Some(path) = &input.json {
        return Ok(plan::load_plan_json(path)?);
    }
    let config = input.terraform.fixture_config(Vec::new());
    if !config.plan_path().exists() {
        bail!(
            "no plan at {}; run `tfassert run` first or pass --json",
            config.plan_path().display()
        );
    }
    Ok(fixture::read_plan(&config.terraform(), &config.plan_file).await?)
}

fn print_plan(plan: &Plan, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{}", output::render_table(plan)),
        OutputFormat::Tree => println!("{}", output::render_tree(plan)),
    }
}
