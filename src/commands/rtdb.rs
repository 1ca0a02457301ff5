//! Realtime tree store commands.

use clap::{Args, Subcommand};
use fbkit_core::RealtimeClient;

use super::{open_session, parse_payload, print_value, CommandError};
use crate::config::Config;

/// Read and write the realtime tree
#[derive(Debug, Args)]
pub struct RtdbCommand {
    #[command(subcommand)]
    pub command: RtdbSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum RtdbSubcommand {
    /// Read a location (defaults to the configured root)
    Get {
        /// Absolute path to read from
        path: Option<String>,

        /// Child below the path
        #[arg(long)]
        child: Option<String>,
    },

    /// Merge a JSON object into a location
    Update {
        /// JSON object to merge
        data: String,

        /// Child below the path
        #[arg(long)]
        child: Option<String>,

        /// Absolute path to write under (defaults to the configured root)
        #[arg(long)]
        path: Option<String>,
    },

    /// Replace a location with a JSON value
    Set {
        /// Absolute path
        path: String,

        /// JSON value
        data: String,
    },

    /// Append a JSON value under a generated key
    Push {
        /// Absolute path of the list
        path: String,

        /// JSON value
        data: String,
    },

    /// Remove a location
    Delete {
        /// Absolute path
        path: String,
    },
}

impl RtdbCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        if config.database_url.value.is_none() {
            return Err(CommandError::NotConfigured("database_url"));
        }
        let session = open_session(config)?;
        let client = RealtimeClient::new(session, &config.root_path.value)?;

        match &self.command {
            RtdbSubcommand::Get { path, child } => {
                let value = client.read(path.as_deref(), child.as_deref()).await?;
                print_value(value.as_ref())
            }
            RtdbSubcommand::Update { data, child, path } => {
                let data = parse_payload(data)?;
                client
                    .write(&data, child.as_deref(), path.as_deref())
                    .await?;
                println!("Updated.");
                Ok(())
            }
            RtdbSubcommand::Set { path, data } => {
                let data = parse_payload(data)?;
                client.connect(Some(path.as_str()))?.set(&data).await?;
                println!("Set {}", path);
                Ok(())
            }
            RtdbSubcommand::Push { path, data } => {
                let data = parse_payload(data)?;
                let reference = client.connect(Some(path.as_str()))?.push(&data).await?;
                println!("{}", reference.path());
                Ok(())
            }
            RtdbSubcommand::Delete { path } => {
                client.connect(Some(path.as_str()))?.delete().await?;
                println!("Deleted {}", path);
                Ok(())
            }
        }
    }
}
