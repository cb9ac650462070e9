use clap::{Parser, Subcommand};
use logship::config::resolve_config_path;
use logship::shipper::LogLevel;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "logship")]
#[command(about = "Batched log shipper for attribute stores", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ship lines read from stdin
    Stdin {
        #[arg(long, value_enum, default_value_t = LogLevel::Info)]
        level: LogLevel,

        /// Logger name written with every line
        #[arg(long)]
        logger: Option<String>,
    },
    /// Run a command and ship its output (stdout at INFO, stderr at ERROR)
    Exec {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never mix with shipped or printed output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logship=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command {
        Commands::Stdin { level, logger } => {
            logship::cli::run::run_stdin(config_path, level, logger).await?;
            // A pending blocking read on stdin would hold up runtime shutdown
            std::process::exit(0);
        }
        Commands::Exec { command } => {
            let code = logship::cli::run::run_exec(config_path, command).await?;
            std::process::exit(code);
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => {
                logship::cli::config::init(stdout)?;
            }
            ConfigAction::Validate => {
                logship::cli::config::validate(config_path)?;
            }
        },
    }

    Ok(())
}
