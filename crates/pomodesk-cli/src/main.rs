use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pomodesk", version, about = "Pomodesk CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        /// Config file to operate on (defaults to ~/.config/pomodesk/config.toml)
        #[arg(long, global = true)]
        file: Option<PathBuf>,
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Inspect canteen menu documents
    Menu {
        #[command(subcommand)]
        action: commands::menu::MenuAction,
    },
    /// Run the controller against a scripted scenario
    Simulate(commands::simulate::SimulateArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Config { file, action } => commands::config::run(action, file),
        Commands::Menu { action } => commands::menu::run(action),
        Commands::Simulate(args) => commands::simulate::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
