//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `start` (default) -- run the bot
//! - `config show|path` -- inspect configuration
//! - `version` -- print build/version info

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

/// Reaction-counting vote bot for Slack.
#[derive(Parser, Debug)]
#[command(
    name = "tallybot",
    version = env!("CARGO_PKG_VERSION"),
    about = "Tallybot, a reaction-counting vote bot for Slack"
)]
pub struct Cli {
    /// Path to the config file (default: tallybot.json5).
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bot (default when no subcommand is given).
    Start,

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration (secrets redacted) as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

use crate::config;
use serde_json::Value;

/// Secrets that should be redacted when printing config.
const SECRET_KEYS: &[&str] = &["token", "secret", "password", "apikey", "api_key"];

/// Run the `config show` subcommand.
pub fn handle_config_show(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load(path)?;
    let redacted = redact_secrets(serde_json::to_value(&cfg)?);
    let pretty = serde_json::to_string_pretty(&redacted)?;
    println!("{}", pretty);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path(path: Option<&Path>) {
    println!("{}", config::config_path(path).display());
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("tallybot {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("TALLYBOT_BUILD_DATE"));
    println!("  Git commit: {}", env!("TALLYBOT_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

/// Redact known secret keys in a JSON value (recursive).
fn redact_secrets(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                let lower = key.to_lowercase();
                if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                    map.insert(key, Value::String("[REDACTED]".to_string()));
                } else if let Some(child) = map.remove(&key) {
                    map.insert(key, redact_secrets(child));
                }
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                *item = redact_secrets(item.clone());
            }
        }
        _ => {}
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    #[test]
    fn test_cli_no_args_defaults_to_none() {
        let cli = Cli::try_parse_from(["tallybot"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_start_subcommand() {
        let cli = Cli::try_parse_from(["tallybot", "start"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Start)));
    }

    #[test]
    fn test_cli_version_subcommand() {
        let cli = Cli::try_parse_from(["tallybot", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }

    #[test]
    fn test_cli_config_show() {
        let cli = Cli::try_parse_from(["tallybot", "config", "show"]).unwrap();
        match cli.command {
            Some(Command::Config(ConfigCommand::Show)) => {}
            other => panic!("Expected Config(Show), got {:?}", other),
        }
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::try_parse_from(["tallybot", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config(ConfigCommand::Path))
        ));
    }

    #[test]
    fn test_cli_config_flag_is_global() {
        let cli =
            Cli::try_parse_from(["tallybot", "config", "show", "--config", "alt.json5"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.json5")));
    }

    #[test]
    fn test_redact_secrets_masks_credentials() {
        let value = json!({
            "slack": {
                "botToken": "xoxb-1234",
                "signingSecret": "hush",
                "apiBase": "https://slack.com/api",
            },
            "server": { "bind": "127.0.0.1:7890" },
        });
        let redacted = redact_secrets(value);
        assert_eq!(redacted["slack"]["botToken"], "[REDACTED]");
        assert_eq!(redacted["slack"]["signingSecret"], "[REDACTED]");
        assert_eq!(redacted["slack"]["apiBase"], "https://slack.com/api");
        assert_eq!(redacted["server"]["bind"], "127.0.0.1:7890");
    }

    #[test]
    fn test_redact_secrets_walks_arrays() {
        let value = json!([{ "token": "t" }, { "plain": "p" }]);
        let redacted = redact_secrets(value);
        assert_eq!(redacted[0]["token"], "[REDACTED]");
        assert_eq!(redacted[1]["plain"], "p");
    }
}
