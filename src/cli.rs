//! The command line interface for the program.
use crate::log;
use crate::output::Report;
use crate::scenario::Scenario;
use crate::settings::Settings;
use crate::simulation;
use ::log::info;
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the program.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Write the report to this file instead of the console
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Include hourly price and load curves in the report
    #[arg(long)]
    pub curves: bool,
    /// Directory in which to write log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Appraise a scenario.
    Run {
        /// Path to the scenario directory.
        scenario_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate a scenario without running it.
    Validate {
        /// Path to the scenario directory.
        scenario_dir: PathBuf,
    },
    /// Print the tariff price for each hour of the day.
    Tariff {
        /// Path to the scenario directory.
        scenario_dir: PathBuf,
    },
    /// Manage example scenarios.
    Example {
        /// The available subcommands for managing example scenarios.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Manage the program settings file.
    Settings {
        /// The available subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { scenario_dir, opts } => handle_run_command(&scenario_dir, &opts, None),
            Self::Validate { scenario_dir } => handle_validate_command(&scenario_dir, None),
            Self::Tariff { scenario_dir } => handle_tariff_command(&scenario_dir, None),
            Self::Example { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ bess-appraise --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    if let Some(settings) = settings {
        return Ok(settings);
    }

    Settings::load().context("Failed to load settings.")
}

/// Handle the `run` command.
///
/// The report is printed to stdout unless an output file is given.
pub fn handle_run_command(
    scenario_dir: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    log::init(settings.log_level.as_deref(), opts.log_dir.as_deref())
        .context("Failed to initialise logging.")?;

    let scenario = Scenario::from_path(scenario_dir).context("Failed to load scenario.")?;
    info!("Loaded scenario from {}", scenario_dir.display());

    let appraisal = simulation::run(&scenario);
    let report = Report::new(&appraisal, opts.curves || settings.include_curves);

    if let Some(output) = &opts.output {
        report.write_to_file(output)?;
        info!("Report written to {}", output.display());
    } else {
        print!("{}", report.to_toml()?);
    }
    info!("Appraisal complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(scenario_dir: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;
    log::init(settings.log_level.as_deref(), None).context("Failed to initialise logging.")?;

    Scenario::from_path(scenario_dir).context("Failed to validate scenario.")?;
    info!("Scenario validation successful!");

    Ok(())
}

/// Handle the `tariff` command.
pub fn handle_tariff_command(scenario_dir: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;
    log::init(settings.log_level.as_deref(), None).context("Failed to initialise logging.")?;

    let scenario = Scenario::from_path(scenario_dir).context("Failed to load scenario.")?;
    for hourly in scenario.tariff.day_curve().iter() {
        let tier = hourly
            .tier
            .map_or_else(|| "uncovered".to_string(), |tier| tier.to_string());
        println!("{:02}:00  {tier:<12} {}", hourly.hour, hourly.price);
    }

    Ok(())
}
