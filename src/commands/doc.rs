//! Document store commands.

use clap::{Args, Subcommand};
use fbkit_core::DocumentClient;
use serde_json::Value;

use super::{open_session, parse_payload, print_value, CommandError};
use crate::config::Config;

/// Read and write documents
#[derive(Debug, Args)]
pub struct DocCommand {
    #[command(subcommand)]
    pub command: DocSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum DocSubcommand {
    /// Show a document
    Get { collection: String, document: String },

    /// Replace a document with a JSON object
    Set {
        collection: String,
        document: String,
        /// JSON object
        data: String,
    },

    /// Merge top-level fields of a JSON object into a document
    Merge {
        collection: String,
        document: String,
        /// JSON object
        data: String,
    },

    /// Delete a document
    Delete { collection: String, document: String },
}

impl DocCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        let client = DocumentClient::new(open_session(config)?);

        match &self.command {
            DocSubcommand::Get {
                collection,
                document,
            } => {
                let record = client.read(collection, document).await?;
                print_value(record.map(Value::Object).as_ref())
            }
            DocSubcommand::Set {
                collection,
                document,
                data,
            } => {
                client
                    .write(collection, document, &parse_payload(data)?)
                    .await?;
                println!("Wrote /{}/{}", collection, document);
                Ok(())
            }
            DocSubcommand::Merge {
                collection,
                document,
                data,
            } => {
                client
                    .merge(collection, document, &parse_payload(data)?)
                    .await?;
                println!("Merged into /{}/{}", collection, document);
                Ok(())
            }
            DocSubcommand::Delete {
                collection,
                document,
            } => {
                client.delete(collection, document).await?;
                println!("Deleted /{}/{}", collection, document);
                Ok(())
            }
        }
    }
}
