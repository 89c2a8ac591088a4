use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wallfit_common::{
    aspect_mismatch_permille, filter, format_duration, Catalog, ErrorReporting, IpcClient, IpcCommand, IpcResponse, Slot,
};
use wallfit_config::{Config, SettingKey};

#[derive(Parser)]
#[command(name = "wallfit-cli")]
#[command(about = "wallfit-cli (aspect-aware wallpaper daemon control)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pick new wallpapers now and restart the auto-change timer
    Change,

    /// Re-check every output, changing only wallpapers that no longer fit
    Apply,

    /// Rescan the image directory
    Rescan,

    /// Reload configuration
    Reload,

    /// Show current status
    Status,

    /// List the images that fit an output of the given size
    Candidates {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Directory to scan instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Inspect or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print every setting
    List,
    /// Print one setting
    Get { key: String },
    /// Change one setting, save it and tell a running daemon to reload
    Set { key: String, value: String },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Change => send(IpcCommand::Change),
        Commands::Apply => send(IpcCommand::Apply),
        Commands::Rescan => send(IpcCommand::Rescan),
        Commands::Reload => send(IpcCommand::Reload),
        Commands::Status => send(IpcCommand::Status),
        Commands::Candidates { width, height, dir } => candidates(width, height, dir),
        Commands::Config { action } => config(action),
    }
}

fn send(command: IpcCommand) -> Result<()> {
    let response = IpcClient::new()
        .send_command(command)
        .context("Is wallfit-daemon running?")?;
    print_response(response)
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        log::warn!("{}; using defaults", e.user_friendly_message());
        Config::default()
    })
}

fn candidates(width: u32, height: u32, dir: Option<PathBuf>) -> Result<()> {
    if width == 0 || height == 0 {
        anyhow::bail!("Output size must be non-zero, got {}x{}", width, height);
    }

    let config = load_config();
    let directory = dir.unwrap_or_else(|| config.image_directory());
    let catalog = Catalog::scan(&directory, config.general.recursive)
        .map_err(|e| anyhow::anyhow!(e.user_friendly_message()))?;

    let slot = Slot::new("preview", width, height);
    let policy = config.policy();
    let fitting = filter(&catalog, &slot, &policy);

    println!(
        "{} of {} image(s) in {} fit {}x{} (upscaling {}, max mismatch {}\u{2030}):",
        fitting.len(),
        catalog.len(),
        directory.display(),
        width,
        height,
        if policy.allow_upscaling { "allowed" } else { "forbidden" },
        policy.max_aspect_mismatch
    );
    for path in fitting {
        if let Some(dimensions) = catalog.get(path) {
            println!(
                "  {} ({}, {}\u{2030} off)",
                path.display(),
                dimensions,
                aspect_mismatch_permille(dimensions, slot.dimensions())
            );
        }
    }
    Ok(())
}

fn config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::List => {
            let config = load_config();
            for (key, value) in config.entries() {
                println!("{} = {}", key, value);
            }
            Ok(())
        }
        ConfigAction::Get { key } => {
            let key: SettingKey = key.parse().map_err(user_error)?;
            println!("{}", load_config().get(key));
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let key: SettingKey = key.parse().map_err(user_error)?;
            let mut config = Config::load_or_missing().map_err(user_error)?;
            config.set_from_str(key, &value).map_err(user_error)?;
            config.save().map_err(user_error)?;
            println!("✓ {} = {}", key, config.get(key));

            let client = IpcClient::new();
            if client.is_daemon_running() {
                print_response(client.send_command(IpcCommand::Reload)?)?;
            }
            Ok(())
        }
    }
}

fn user_error(e: wallfit_common::WallfitError) -> anyhow::Error {
    anyhow::anyhow!(e.user_friendly_message())
}

fn print_response(response: IpcResponse) -> Result<()> {
    match response {
        IpcResponse::Success { message } => {
            println!("✓ {}", message);
        }

        IpcResponse::Error { message } => {
            anyhow::bail!("{}", message);
        }

        IpcResponse::Status { outputs, catalog_size, auto_change_remaining } => {
            println!("wallfit Status:");
            println!("===============");
            println!("Catalog: {} image(s)", catalog_size);
            let timer = match auto_change_remaining {
                Some(0) => "due".to_string(),
                Some(remaining) => format!("in {}", format_duration(Duration::from_secs(remaining))),
                None => "off".to_string(),
            };
            println!("Auto-change: {}", timer);
            println!();

            if outputs.is_empty() {
                println!("No outputs assigned yet");
            }
            for output in outputs {
                let current_image = output.current_image.as_deref().map(file_name).unwrap_or("None");
                println!(
                    "{}: {}x{} | {} | {} eligible | {}",
                    output.name, output.width, output.height, current_image, output.eligible, output.last_outcome
                );
            }
        }
    }
    Ok(())
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}
