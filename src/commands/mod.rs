mod config_cmd;
mod doc;
mod rtdb;

pub use config_cmd::ConfigCommand;
pub use doc::DocCommand;
pub use rtdb::RtdbCommand;
#[cfg(test)]
pub use rtdb::RtdbSubcommand;

use fbkit_core::session::{DATABASE_EMULATOR_HOST_VAR, FIRESTORE_EMULATOR_HOST_VAR};
use fbkit_core::{Credentials, Session};
use serde_json::Value;

use crate::config::Config;

/// Errors from store commands
#[derive(Debug)]
pub enum CommandError {
    /// A required setting is missing
    NotConfigured(&'static str),
    /// A payload argument is not valid JSON
    InvalidJson(serde_json::Error),
    /// The backend call failed
    Store(fbkit_core::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::NotConfigured(setting) => write!(
                f,
                "{} is not configured. Add it to the config file or set the environment variable.",
                setting
            ),
            CommandError::InvalidJson(e) => write!(f, "Invalid JSON payload: {}", e),
            CommandError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::NotConfigured(_) => None,
            CommandError::InvalidJson(e) => Some(e),
            CommandError::Store(e) => Some(e),
        }
    }
}

impl From<fbkit_core::Error> for CommandError {
    fn from(e: fbkit_core::Error) -> Self {
        CommandError::Store(e)
    }
}

/// Opens a session from the configured credentials.
///
/// Without a key file, a session is still possible when an emulator host
/// is set in the environment.
pub fn open_session(config: &Config) -> Result<Session, CommandError> {
    let credentials = match &config.credentials_path.value {
        Some(path) => {
            tracing::info!("Loading credentials from {}", path.display());
            Credentials::from_file(path)?
        }
        None if emulator_configured() => Credentials::Emulator,
        None => return Err(CommandError::NotConfigured("credentials_path")),
    };

    let mut builder = Session::builder(credentials)
        .firestore_database(config.firestore_database.value.clone())
        .emulators_from_env();
    if let Some(url) = &config.database_url.value {
        builder = builder.database_url(url.clone());
    }
    if let Some(project_id) = &config.project_id.value {
        builder = builder.project_id(project_id.clone());
    }

    let session = builder.build()?;
    tracing::info!("Connection established");
    Ok(session)
}

fn emulator_configured() -> bool {
    std::env::var(DATABASE_EMULATOR_HOST_VAR).is_ok()
        || std::env::var(FIRESTORE_EMULATOR_HOST_VAR).is_ok()
}

/// Parses a JSON payload argument.
pub fn parse_payload(data: &str) -> Result<Value, CommandError> {
    serde_json::from_str(data).map_err(CommandError::InvalidJson)
}

/// Prints a read result as pretty JSON, or `null` when there is no data.
pub fn print_value(value: Option<&Value>) -> Result<(), CommandError> {
    match value {
        Some(value) => println!(
            "{}",
            serde_json::to_string_pretty(value).map_err(CommandError::InvalidJson)?
        ),
        None => println!("null"),
    }
    Ok(())
}
