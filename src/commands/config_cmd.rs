use clap::{Args, Subcommand, ValueEnum};

use crate::config::{Config, ConfigValue};

#[derive(Debug, Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        println!("{}", describe_config_file(config));
                        println!();

                        let credentials = ConfigValue::new(
                            config
                                .credentials_path
                                .value
                                .as_ref()
                                .map(|p| p.display().to_string()),
                            config.credentials_path.source.clone(),
                        );
                        print_optional("credentials_path", &credentials);
                        print_optional("database_url", &config.database_url);

                        println!("root_path: {}", config.root_path.value);
                        println!("  source: {}", config.root_path.source);
                        println!();

                        print_optional("project_id", &config.project_id);

                        println!("firestore_database: {}", config.firestore_database.value);
                        println!("  source: {}", config.firestore_database.source);
                    }
                }
                Ok(())
            }
        }
    }
}

fn describe_config_file(config: &Config) -> String {
    match &config.config_file {
        Some(path) => format!("Config file: {}", path.display()),
        None => format!("Config file: {} (not found)", config.searched_path.display()),
    }
}

fn print_optional(name: &str, value: &ConfigValue<Option<String>>) {
    println!(
        "{}: {}",
        name,
        value.value.as_deref().unwrap_or("(not set)")
    );
    println!("  source: {}", value.source);
    println!();
}
