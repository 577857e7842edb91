//! quizrun CLI: take timed quizzes in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "quizrun", version, about = "Timed quiz sessions in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a quiz interactively
    Take {
        /// Quiz id (defaults to `default_quiz` from the config)
        quiz_id: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the service base URL
        #[arg(long)]
        base_url: Option<String>,

        /// Use the built-in offline sample quiz
        #[arg(long)]
        demo: bool,
    },

    /// Create a starter config file
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizrun=warn".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            quiz_id,
            config,
            base_url,
            demo,
        } => commands::take::execute(quiz_id, config, base_url, demo).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
