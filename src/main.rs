use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use maker_core::cli::Commands;
use maker_core::{build_project, BuildOptions, Builder, Cli, Config, Logger};

fn init_config(cli: &Cli, name: Option<&str>) -> Result<i32> {
    let config_path = cli.recipe_path();

    if config_path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            config_path.display()
        );
    }

    Config::starter(name)
        .save_to_file(&config_path)
        .context("Failed to save maker.toml")?;

    println!("Created {}", config_path.display());

    Ok(0)
}

fn list_targets(config: &Config) -> i32 {
    let registry = config.registry();

    if registry.is_empty() {
        println!("No rules defined.");
        return 0;
    }

    for rule in registry.rules() {
        let marker = if Some(&rule.target) == config.build.default_target.as_ref() {
            " [default]"
        } else {
            ""
        };
        println!("  {}{}", rule, marker);
    }

    0
}

async fn run_project(cli: &Cli, config: &Config, logger: Arc<Logger>) -> Result<i32> {
    let section = config
        .project
        .as_ref()
        .context("No [project] section in recipe file")?;

    let mut project = section.to_project_config(&std::env::current_dir()?);
    if let Some(jobs) = cli.jobs {
        project.max_threads = jobs;
    }
    project.force |= cli.always_make;

    match build_project(&project, Arc::clone(&logger)).await {
        Ok(outcome) => Ok(outcome.exit_code()),
        Err(err) => {
            logger.error(&err.to_string());
            Ok(err.exit_code())
        }
    }
}

async fn run_target(cli: &Cli, config: &Config, logger: Arc<Logger>) -> Result<i32> {
    let target = cli
        .requested_target()
        .map(str::to_string)
        .or_else(|| config.build.default_target.clone())
        .context("No target given and no build.default_target in recipe file")?;

    let builder = Builder::new(config.registry(), Arc::clone(&logger))
        .with_jobs(cli.jobs.unwrap_or(config.build.jobs))
        .with_options(BuildOptions {
            force: cli.always_make,
        });

    match builder.build(&target).await {
        Ok(outcome) => Ok(outcome.exit_code()),
        Err(err) => {
            logger.error(&err.to_string());
            Ok(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Failed to change directory to {}", dir.display()))?;
    }

    if let Some(Commands::Init { name }) = &cli.command {
        return init_config(&cli, name.as_deref());
    }

    let logger = Arc::new(Logger::new().with_min_level(cli.log_level()));
    let config = Config::load_from_file(cli.recipe_path())?;

    match &cli.command {
        Some(Commands::List) => Ok(list_targets(&config)),
        Some(Commands::Project) => run_project(&cli, &config, logger).await,
        Some(Commands::Init { .. }) | None => run_target(&cli, &config, logger).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let code = run(cli).await?;
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
