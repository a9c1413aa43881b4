use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use kira_deadlineqc::checkpoint::{CHECKPOINT_FILE, load_run_state};
use kira_deadlineqc::cli::{Cli, Commands, ConfigCommand, RunArgs};
use kira_deadlineqc::config::{self, DeadlineConfig};
use kira_deadlineqc::ctx::{Ctx, OutputPaths};
use kira_deadlineqc::fetch::LookupOutcome;
use kira_deadlineqc::io;
use kira_deadlineqc::pipeline::Pipeline;
use kira_deadlineqc::session::Credentials;
use kira_deadlineqc::session::replay::ReplayConnector;
use kira_deadlineqc::session::webdriver::WebDriverConnector;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => handle_run(args)?,
        Commands::Validate(args) => {
            let config = config::load(args.config.as_deref())?;
            let mut ctx = Ctx::new(
                Some(args.input),
                PathBuf::from("."),
                config,
                today(),
                false,
                false,
                env!("CARGO_PKG_VERSION"),
            );
            Pipeline::validate().run(&mut ctx)?;
            print_validate_summary(&ctx)?;
        }
        Commands::Recover(args) => handle_recover(&args.out, args.config.as_deref())?,
        Commands::Config(args) => match args.command {
            ConfigCommand::Show(show) => {
                let config = config::load(show.config.as_deref())?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        },
    }

    Ok(())
}

fn handle_run(args: RunArgs) -> Result<()> {
    let mut config = config::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;

    let reference_date = args.reference_date.unwrap_or_else(today);
    let mut ctx = Ctx::new(
        Some(args.input),
        args.out,
        config,
        reference_date,
        args.json,
        args.tsv,
        env!("CARGO_PKG_VERSION"),
    );
    ctx.resume = args.resume;

    match args.replay {
        Some(path) => {
            tracing::info!(fixture = %path.display(), "using replay session");
            ctx.connector = Some(Box::new(ReplayConnector::new(path)));
        }
        None => {
            ctx.connector = Some(Box::new(WebDriverConnector::new(
                ctx.config.session.clone(),
            )));
            ctx.credentials = Some(Credentials::from_env()?);
        }
    }

    Pipeline::full_run().run(&mut ctx)?;

    print_summary(&ctx)
}

fn apply_overrides(config: &mut DeadlineConfig, args: &RunArgs) -> Result<()> {
    if let Some(url) = &args.webdriver_url {
        config.session.webdriver_url = url.clone();
    }
    if let Some(url) = &args.system_url {
        config.session.system_url = url.clone();
    }
    if let Some(days) = args.day_threshold {
        config.day_threshold = days;
    }
    if let Some(interval) = args.checkpoint_interval {
        config.checkpoint_interval = interval;
    }
    config.validate()?;
    Ok(())
}

fn handle_recover(out: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = config::load(config_path)?;
    let paths = OutputPaths::new(out.to_path_buf(), true);
    let checkpoint = paths.checkpoint_dir.join(CHECKPOINT_FILE);
    let Some(state) = load_run_state(&checkpoint)? else {
        bail!("no checkpoint found at {}", checkpoint.display());
    };

    let mut ctx = Ctx::new(
        None,
        out.to_path_buf(),
        config,
        state.reference_date,
        false,
        false,
        env!("CARGO_PKG_VERSION"),
    );
    ctx.output = paths;
    ctx.recover = true;
    ctx.counters.resumed_from = state.cursor();
    ctx.counters.not_found = state.outcome_count(LookupOutcome::NotFound);
    ctx.counters.fetch_failures = state.outcome_count(LookupOutcome::Failed);
    ctx.run_state = Some(state);

    Pipeline::recover().run(&mut ctx)?;

    print_summary(&ctx)
}

fn print_summary(ctx: &Ctx) -> Result<()> {
    let summary = io::summary::format_summary(ctx)?;
    print!("{}", summary);
    if !ctx.warnings.is_empty() {
        println!("warnings:");
        for warning in &ctx.warnings {
            println!("- {}", warning);
        }
    }
    Ok(())
}

fn print_validate_summary(ctx: &Ctx) -> Result<()> {
    let source = ctx.source.as_ref().context("source identifiers missing")?;
    println!("kira-deadlineqc validate ok");
    println!("rows: {}", source.rows);
    println!("contracts: {}", source.ids.len());
    println!("malformed: {}", source.malformed);
    println!("duplicates: {}", source.duplicates);
    println!("strategy: {}", source.strategy.as_str());
    if !ctx.warnings.is_empty() {
        println!("warnings:");
        for warning in &ctx.warnings {
            println!("- {}", warning);
        }
    }
    Ok(())
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}
