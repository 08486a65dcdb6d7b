//! Configuration management for the ABAP format server.
//!
//! Handles:
//! - Command-line argument parsing
//! - The `Settings` snapshot read per formatting call
//! - Project/user config files and live reload on change

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::{RwLock, mpsc};
use tower_lsp::Client;
use tower_lsp::lsp_types::MessageType;

/// Name of the project-level config file, looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = ".abap-format.toml";

/// Command-line arguments for the ABAP format server
#[derive(Debug, Parser)]
#[command(name = "abap-format-server")]
#[command(about = "Language server providing ABAP formatting")]
#[command(version)]
pub struct Args {
    /// Explicit config file, checked before the project and user locations
    #[arg(long, help = "Path to a settings TOML file")]
    pub config_file: Option<PathBuf>,

    /// Override the external fixer command
    #[arg(long, help = "External fixer command (e.g., 'abap-cs-fixer')")]
    pub fixer_command: Option<String>,

    /// Log level for the server
    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

/// Settings snapshot handed to each formatting call.
///
/// Never read through a live closure: handlers clone one consistent snapshot
/// per request, and the watcher/`didChangeConfiguration` replace the shared
/// value wholesale.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Case Mode: true rewrites keywords to lowercase, false to uppercase
    pub keywords_to_lower_case: bool,
    /// Additional language ids accepted by the external-fix bridge
    pub additional_extensions: Vec<String>,
    /// Surface failures and completions as editor notifications
    pub notifications: bool,
    /// External fixer command name or path
    pub fixer_command: String,
    /// Wall-clock limit for one fixer run
    pub fixer_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keywords_to_lower_case: false,
            additional_extensions: Vec::new(),
            notifications: false,
            fixer_command: "abap-cs-fixer".to_string(),
            fixer_timeout_secs: 30,
        }
    }
}

/// Partial settings as sent by the client in `workspace/didChangeConfiguration`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClientSettings {
    keywords_to_lower_case: Option<bool>,
    additional_extensions: Option<Vec<String>>,
    notifications: Option<bool>,
    fixer_command: Option<String>,
    fixer_timeout_secs: Option<u64>,
}

/// Shared, reloadable settings
pub type SettingsHandle = Arc<RwLock<Settings>>;

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    /// Config file paths in precedence order; the first existing one wins
    pub config_paths: Vec<PathBuf>,
    /// Fixer command override from the command line
    pub cli_fixer_command: Option<String>,
    /// Log level
    pub log_level: String,
}

impl Config {
    /// Create configuration from command-line arguments
    pub fn from_args_and_env() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Create configuration from explicit arguments (useful for testing)
    pub fn from_args(args: Args) -> Result<Self> {
        let mut config_paths = Vec::new();

        // Explicit file first, then project file, then user config directory
        if let Some(explicit) = args.config_file {
            config_paths.push(explicit);
        }
        config_paths.push(PathBuf::from(PROJECT_CONFIG_FILE));
        if let Some(config_dir) = dirs::config_dir() {
            config_paths.push(config_dir.join("abap-format-ls").join("config.toml"));
        }

        Ok(Config {
            config_paths,
            cli_fixer_command: args.fixer_command,
            log_level: args.log_level,
        })
    }

    /// Load the effective settings: first existing config file, with the
    /// command-line fixer override applied on top.
    pub fn load_settings(&self) -> Settings {
        let mut settings = self
            .config_paths
            .iter()
            .find(|p| p.exists())
            .and_then(|path| match read_settings_file(path) {
                Ok(s) => Some(s),
                Err(e) => {
                    log::warn!("Ignoring unreadable config {}: {e:#}", path.display());
                    None
                }
            })
            .unwrap_or_default();

        if let Some(cmd) = &self.cli_fixer_command {
            settings.fixer_command = cmd.clone();
        }
        settings
    }
}

/// Parse a settings TOML file
fn read_settings_file(path: &std::path::Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config TOML: {}", path.display()))
}

/// Merge a `workspace/didChangeConfiguration` payload into `settings`.
///
/// The payload is the client's `settings` object; our section lives under the
/// `abapFormat` key, but a bare top-level object is accepted too. A malformed
/// payload is logged and ignored wholesale.
pub fn apply_client_settings(settings: &mut Settings, payload: &serde_json::Value) {
    let section = payload.get("abapFormat").unwrap_or(payload);
    let client: ClientSettings = match serde_json::from_value(section.clone()) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Ignoring malformed configuration payload: {e}");
            return;
        }
    };

    if let Some(v) = client.keywords_to_lower_case {
        settings.keywords_to_lower_case = v;
    }
    if let Some(v) = client.additional_extensions {
        settings.additional_extensions = v;
    }
    if let Some(v) = client.notifications {
        settings.notifications = v;
    }
    if let Some(v) = client.fixer_command {
        settings.fixer_command = v;
    }
    if let Some(v) = client.fixer_timeout_secs {
        settings.fixer_timeout_secs = v;
    }
}

/// Events from the config file watcher
#[derive(Debug)]
enum WatcherEvent {
    ConfigFileChanged(PathBuf),
    WatcherError(notify::Error),
}

/// Watch the config file locations and reconstruct the shared `Settings`
/// snapshot whenever one changes.
///
/// Returns the watcher; dropping it stops the watch.
pub fn spawn_settings_watcher(
    config: Config,
    handle: SettingsHandle,
    client: Option<Client>,
) -> Result<RecommendedWatcher> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                if let EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) =
                    event.kind
                {
                    for path in event.paths {
                        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
                            let _ = tx.send(WatcherEvent::ConfigFileChanged(path));
                        }
                    }
                }
            }
            Err(e) => {
                let _ = tx.send(WatcherEvent::WatcherError(e));
            }
        },
        notify::Config::default().with_poll_interval(Duration::from_secs(1)),
    )?;

    // Watch the parent directory of each candidate config file; the files
    // themselves may not exist yet.
    for path in &config.config_paths {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let dir = dir.unwrap_or_else(|| std::path::Path::new("."));
        if dir.exists() {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }
    }

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                WatcherEvent::ConfigFileChanged(path) => {
                    if let Some(client) = &client {
                        client
                            .log_message(
                                MessageType::INFO,
                                format!("Config file changed: {}", path.display()),
                            )
                            .await;
                    }

                    // Reload from all sources rather than patching the one
                    // changed file, so precedence stays correct.
                    let new_settings = config.load_settings();
                    *handle.write().await = new_settings;
                }
                WatcherEvent::WatcherError(e) => {
                    if let Some(client) = &client {
                        client
                            .log_message(
                                MessageType::ERROR,
                                format!("Config file watcher error: {e}"),
                            )
                            .await;
                    }
                }
            }
        }
    });

    Ok(watcher)
}
