//! learnmetric CLI: baseline/endline assessment impact analysis.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "learnmetric",
    version,
    about = "Baseline/endline assessment scoring and learning impact reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a workbook and write impact reports
    Analyze {
        /// Workbook file (.xlsx, .xlsm, .xls, .xlsb, .ods) or directory of .csv sheets
        #[arg(long)]
        workbook: PathBuf,

        /// Restrict to states (comma-separated)
        #[arg(long)]
        state: Option<String>,

        /// Restrict to grades (comma-separated, e.g. "3,4")
        #[arg(long)]
        grade: Option<String>,

        /// Output directory (default: from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, csv, markdown, all (default: from config)
        #[arg(long)]
        format: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show per-question accuracy for one assessment phase
    Questions {
        /// Workbook file or directory of .csv sheets
        #[arg(long)]
        workbook: PathBuf,

        /// Assessment phase: baseline or endline
        #[arg(long, default_value = "endline")]
        phase: String,

        /// Restrict to grades (comma-separated)
        #[arg(long)]
        grade: Option<String>,

        /// Restrict to states (comma-separated)
        #[arg(long)]
        state: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List matched students with their growth
    Students {
        /// Workbook file or directory of .csv sheets
        #[arg(long)]
        workbook: PathBuf,

        /// Match Student ID, or Centre ignoring case
        #[arg(long)]
        search: Option<String>,

        /// Maximum rows to print
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Restrict to states (comma-separated)
        #[arg(long)]
        state: Option<String>,

        /// Restrict to grades (comma-separated)
        #[arg(long)]
        grade: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check a workbook's sheets, columns and answer key
    Validate {
        /// Workbook file or directory of .csv sheets
        #[arg(long)]
        workbook: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and a sample CSV workbook
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("learnmetric=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            workbook,
            state,
            grade,
            output,
            format,
            config,
        } => commands::analyze::execute(workbook, state, grade, output, format, config),
        Commands::Questions {
            workbook,
            phase,
            grade,
            state,
            config,
        } => commands::questions::execute(workbook, phase, grade, state, config),
        Commands::Students {
            workbook,
            search,
            limit,
            state,
            grade,
            config,
        } => commands::students::execute(workbook, search, limit, state, grade, config),
        Commands::Validate { workbook, config } => commands::validate::execute(workbook, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
