mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nohr")]
#[command(version, about = "NOHR CLI - file-system routing and hot-reload dev loop", long_about = None)]
struct Cli {
    /// Path to nohr.toml
    #[arg(short, long, global = true, default_value = "nohr.toml")]
    config: PathBuf,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover routes once and write the route manifest
    Generate {
        /// Output path (defaults to routing.manifest_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the page and API route tables
    Routes {
        /// Print the manifest as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Match a request path against a freshly built table
    Match {
        /// Request path, e.g. /users/42
        path: String,

        /// Match against API routes instead of pages
        #[arg(long)]
        api: bool,
    },

    /// Start the hot-reload development loop
    Dev {
        /// Port of the HMR WebSocket server
        #[arg(short, long)]
        port: Option<u16>,

        /// Do not build, start or restart the application server
        #[arg(long)]
        no_server: bool,
    },

    /// Connect to a running dev loop and print updates
    Listen {
        /// WebSocket URL (defaults to ws://<dev.host>:<dev.hmr_port>)
        #[arg(short, long)]
        url: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project = commands::Project::load(&cli.config)?;

    match cli.command {
        Commands::Generate { output } => commands::generate::execute(&project, output)?,
        Commands::Routes { json } => commands::routes::execute(&project, json)?,
        Commands::Match { path, api } => commands::r#match::execute(&project, &path, api)?,
        Commands::Dev { port, no_server } => commands::dev::execute(project, port, no_server)?,
        Commands::Listen { url } => commands::listen::execute(&project, url)?,
    }

    Ok(())
}
