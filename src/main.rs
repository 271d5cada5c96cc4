//! Controller Tools companion - Entry Point
//!
//! Runs the live-state pieces of the panel from a terminal: the
//! notification listener, a one-shot controller listing, and settings
//! access.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use controller_tools::{
    core::settings::{read_bool, write_bool},
    notifications::{ChannelToastSink, LogToastSink},
    plugin::{open_panel, open_settings},
    AppEvent, Config, EventSender, ListState, Plugin, SettingKey,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "controller-tools", about = "Controller Tools companion")]
struct Cli {
    /// Backend host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Backend port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep the notification channel open and print toasts until Ctrl-C
    Listen,
    /// Fetch the controller list once and print it
    Controllers {
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read or change a setting
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print a setting (debug, notifications)
    Get { key: SettingKey },
    /// Change a setting and commit it
    Set {
        key: SettingKey,
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load()?;
    if let Some(host) = cli.host {
        config.backend.host = host;
    }
    if let Some(port) = cli.port {
        config.backend.port = port;
    }

    // The persisted debug toggle raises the default log level. A broken
    // settings file only costs the persisted values.
    let settings = open_settings(&config);
    let (debug, notifications) = match &settings {
        Ok(store) => (
            read_bool(store, SettingKey::Debug).await.unwrap_or(false),
            read_bool(store, SettingKey::Notifications).await.unwrap_or(true),
        ),
        Err(_) => (SettingKey::Debug.default_value(), SettingKey::Notifications.default_value()),
    };
    let default_filter = if debug { "debug" } else { "info" };

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = &settings {
        warn!("{:#}, using default settings", e);
    }

    match cli.command {
        Commands::Listen => listen(config, notifications).await,
        Commands::Controllers { json } => list_controllers(&config, json).await,
        Commands::Settings { action } => {
            let settings = settings?;
            match action {
                SettingsAction::Get { key } => {
                    let value = read_bool(&settings, key).await?;
                    println!("{} = {}", key, value);
                    Ok(())
                }
                SettingsAction::Set { key, value } => {
                    write_bool(&settings, key, value)
                        .await
                        .with_context(|| format!("Failed to save {}", key))?;
                    println!("{} = {}", key, value);
                    Ok(())
                }
            }
        }
    }
}

/// Keep the channel up until Ctrl-C. With notifications turned off the
/// toasts only go to the log.
async fn listen(config: Config, notifications: bool) -> Result<()> {
    let (events, mut event_rx) = EventSender::channel();
    let plugin = if notifications {
        Plugin::load(config, ChannelToastSink::new(events.clone()), Some(events))
    } else {
        info!("Notifications are off, toasts will only be logged");
        Plugin::load(config, LogToastSink, Some(events))
    };

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => match event {
                AppEvent::Toast(toast) => println!("[{}] {}", toast.title, toast.body),
                AppEvent::ChannelConnected => info!("Listening for notifications"),
                AppEvent::ChannelClosed { reason } => info!("Notification channel down: {}", reason),
                other => info!("{:?}", other),
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let status = plugin.channel_status();
    info!(
        "Shutting down after {} connection attempts, {} notifications",
        status.attempts, status.delivered
    );
    plugin.unload().await;
    Ok(())
}

async fn list_controllers(config: &Config, json: bool) -> Result<()> {
    let mut panel = open_panel(config)?;
    panel.show().await;

    let list = panel.controllers();
    if let Some(error) = list.last_error() {
        eprintln!("warning: {}", error);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(list.rows())?);
        return Ok(());
    }

    match list.state() {
        ListState::Populated(rows) => {
            for row in rows {
                println!("{}", row);
            }
        }
        state => println!("{}", state.placeholder().unwrap_or_default()),
    }
    Ok(())
}
