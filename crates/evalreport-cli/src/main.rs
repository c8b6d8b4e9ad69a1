//! evalreport CLI: re-render, inspect and preflight evaluation reports.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "evalreport", version, about = "Test evaluation report compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a saved JSON summary into a report document
    Render {
        /// Path to the JSON summary
        #[arg(long)]
        summary: PathBuf,

        /// Output directory (default: the summary's directory)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the results of a saved JSON summary
    Show {
        /// Path to the JSON summary
        #[arg(long)]
        summary: PathBuf,
    },

    /// Check that the report toolchain dependencies are available
    Preflight {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("evalreport=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            summary,
            output,
            config,
        } => commands::render::execute(summary, output, config).await,
        Commands::Show { summary } => commands::show::execute(summary),
        Commands::Preflight { config } => commands::preflight::execute(config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
