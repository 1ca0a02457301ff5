use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{ConfigCommand, DocCommand, RtdbCommand};
use config::Config;

#[derive(Parser)]
#[command(name = "fbkit")]
#[command(version)]
#[command(about = "Read and write Firebase realtime and document stores", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and write the realtime tree
    Rtdb(RtdbCommand),

    /// Read and write documents
    Doc(DocCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fbkit=info,fbkit_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Rtdb(cmd)) => {
            cmd.run(&config).await?;
        }
        Some(Commands::Doc(cmd)) => {
            cmd.run(&config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use commands::RtdbSubcommand;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rtdb_update() {
        let cli = Cli::try_parse_from([
            "fbkit",
            "rtdb",
            "update",
            r#"{"a":1}"#,
            "--child",
            "node",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Rtdb(RtdbCommand {
                command: RtdbSubcommand::Update { data, child, path },
            })) => {
                assert_eq!(data, r#"{"a":1}"#);
                assert_eq!(child.as_deref(), Some("node"));
                assert_eq!(path, None);
            }
            _ => panic!("expected rtdb update"),
        }
    }

    #[test]
    fn test_parse_doc_get_with_config() {
        let cli =
            Cli::try_parse_from(["fbkit", "doc", "get", "sample", "test", "-c", "/tmp/c.yaml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yaml")));
        assert!(matches!(cli.command, Some(Commands::Doc(_))));
    }
}
