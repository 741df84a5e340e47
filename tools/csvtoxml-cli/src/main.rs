//! csvtoxml CLI — Command-line interface for CSV to NLE timeline conversion.
//!
//! Usage:
//!   csvtoxml convert <CSV> <TEMPLATE>   Write a timeline into a template
//!   csvtoxml plan <CSV> <TEMPLATE>      Show the clips a conversion would place
//!   csvtoxml validate <CSV>             Check the rows of an edit CSV
//!   csvtoxml inspect <TEMPLATE>         Show a template's rate, media and lanes

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use csvtoxml_common::config::AppConfig;

mod commands;

use commands::SettingsArgs;

#[derive(Parser)]
#[command(
    name = "csvtoxml",
    about = "Cut Premiere Pro and DaVinci Resolve timelines from edit-decision CSVs",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a CSV into a timeline inside a template project
    Convert {
        /// Edit-decision CSV
        csv: PathBuf,

        /// Template project (XMEML for premiere, FCPXML for davinci)
        template: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Lay out the timeline without writing anything
    Plan {
        /// Edit-decision CSV
        csv: PathBuf,

        /// Template project
        template: PathBuf,

        /// Print the planned timeline as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Parse and check the rows of a CSV
    Validate {
        /// Edit-decision CSV
        csv: PathBuf,

        /// Frame rate the CSV timecodes are written at
        #[arg(long)]
        frame_rate: Option<String>,
    },

    /// Show what a template declares
    Inspect {
        /// Template project
        template: PathBuf,

        /// Template dialect: premiere|davinci
        #[arg(short, long)]
        format: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    csvtoxml_common::logging::init_logging(&config.logging);
    tracing::debug!(defaults = ?config.defaults, "Loaded configuration");

    match cli.command {
        Commands::Convert {
            csv,
            template,
            output,
            settings,
        } => commands::convert::run(csv, template, output, &settings, &config),
        Commands::Plan {
            csv,
            template,
            json,
            settings,
        } => commands::plan::run(csv, template, json, &settings, &config),
        Commands::Validate { csv, frame_rate } => {
            commands::validate::run(csv, frame_rate, &config)
        }
        Commands::Inspect { template, format } => commands::inspect::run(template, format, &config),
    }
}
