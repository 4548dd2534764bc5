//! Dockhand CLI - Main Entry Point

use clap::{Parser, Subcommand};
use colored::Colorize;

use dockhand_cli::client::WebClient;
use dockhand_cli::commands::{containers, fs, serve};
use dockhand_cli::output::{self, print_error};

/// Dockhand CLI - container filesystems from the command line
#[derive(Parser)]
#[command(name = "dockhand")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Dashboard address
    #[arg(long, env = "DOCKHAND_SERVER", default_value = "http://127.0.0.1:8080", global = true)]
    server: String,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check dashboard and container runtime status
    Status,

    /// List containers
    Containers(containers::ContainersArgs),

    /// Browse and edit container filesystems
    #[command(subcommand)]
    Fs(fs::FsCommands),

    /// Run the dashboard server in this process
    Serve(serve::ServeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let client = WebClient::new(&cli.server)?;

    match cli.command {
        Commands::Containers(args) => containers::execute(args, client, cli.format).await?,
        Commands::Fs(cmd) => fs::execute(cmd, client, cli.format).await?,
        Commands::Serve(args) => serve::execute(args).await?,
        Commands::Status => match client.health().await {
            Ok(health) => {
                println!(
                    "{} Dashboard v{} is running at {} ({} open sessions)",
                    "●".green(),
                    health.version,
                    cli.server,
                    health.sessions
                );
                match client.runtime().await {
                    Ok(rt) if rt.reachable => {
                        println!("{} Container runtime reachable", "●".green())
                    }
                    Ok(rt) => {
                        print_error(&format!(
                            "Container runtime unreachable: {}",
                            rt.error.unwrap_or_default()
                        ));
                        std::process::exit(1);
                    }
                    Err(e) => {
                        print_error(&format!("Cannot query container runtime: {}", e));
                        std::process::exit(1);
                    }
                }
            }
            Err(e) => {
                print_error(&format!("Dashboard is not responding at {}: {}", cli.server, e));
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
