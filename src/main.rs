use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

mod commands;

/// addonpm - Install addons declared in addons.json, flattened into one directory
#[derive(Parser)]
#[command(name = "addonpm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter addons.jsonc manifest
    Init {
        /// Project directory (defaults to current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Resolve and install every addon required by the project
    Install {
        /// Project directory (defaults to current directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Maximum number of manifests to visit
        #[arg(short = 'd', long)]
        max_depth: Option<usize>,

        /// Manifest file name to use instead of addons.json / addons.jsonc
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Manage the project's addon cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Delete the cache directory
    Clean {
        /// Project directory (defaults to current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Show the cache directory
    Path {
        /// Project directory (defaults to current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Init { path } => commands::init::run(path).map(|_| 0),
        Commands::Install {
            path,
            max_depth,
            file,
        } => commands::install::run(path, max_depth, file).map(commands::install::exit_code),
        Commands::Cache { action } => match action {
            CacheAction::Clean { path } => commands::cache::run_clean(path).map(|_| 0),
            CacheAction::Path { path } => commands::cache::run_path(path).map(|_| 0),
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "addonpm", &mut std::io::stdout());
            Ok(0)
        }
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
