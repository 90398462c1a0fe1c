//! hl7conv command-line interface

use anyhow::Result;
use clap::{Parser, Subcommand};
use octofhir_hl7::cli::{check, convert, output};
use std::path::PathBuf;

/// HL7 v2 to FHIR conversion tool
#[derive(Parser)]
#[command(name = "hl7conv")]
#[command(author, version, about = "Convert HL7 v2 messages into FHIR bundles", long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Write JSON on a single line
    #[arg(long, global = true)]
    compact: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an HL7 v2 message file into a FHIR Bundle
    Convert {
        /// Message file
        file: PathBuf,

        /// Template directory layered over the built-in templates
        #[arg(short, long = "templates")]
        templates: Vec<PathBuf>,

        /// Code table file (YAML) merged over the built-in tables
        #[arg(long)]
        terminology: Vec<PathBuf>,

        /// Offset for date-times sent without one (e.g. +02:00)
        #[arg(long, allow_hyphen_values = true)]
        default_offset: Option<String>,
    },

    /// Load and validate template directories
    CheckTemplates {
        /// Template directories
        dirs: Vec<PathBuf>,

        /// Do not resolve references against the built-in templates
        #[arg(long)]
        no_builtins: bool,
    },
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(&cli.color);

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let result: Result<()> = match cli.command {
        Commands::Convert {
            file,
            templates,
            terminology,
            default_offset,
        } => convert::convert(convert::ConvertConfig {
            file,
            templates,
            terminology,
            default_offset,
            compact: cli.compact,
            output_file: cli.output,
        }),

        Commands::CheckTemplates { dirs, no_builtins } => check::check(check::CheckConfig {
            dirs,
            with_builtins: !no_builtins,
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
