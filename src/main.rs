//! pocketprog - A button-driven radio programmer
//!
//! Runs on a small single-board computer with three push buttons and a
//! serial programming cable. Select cycles through radio profiles, Write
//! uploads the selected profile's image to the radio, Read downloads the
//! radio into a new numbered image, and holding Read powers the box off.
//!
//! # Architecture
//!
//! - `pocketprog-core`: profiles, the button state machine, input delivery
//!   strategies, the tool runner and the action handlers
//! - GPIO backends (`pocketprog-linux-gpio`, `pocketprog-dummy`) provide
//!   button lines, with or without edge notifications
//! - `pocketprog-ssd1306` draws the status screens on an I2C OLED
//! - this binary wires them together behind a small CLI

mod backends;
mod cli;
mod commands;
mod console;
mod display;

use clap::Parser;
use cli::{Cli, Commands};
use commands::run::RunOptions;
use commands::transfer::Direction;
use pocketprog_core::config;
use pocketprog_core::profile::{self, ProfileSelector};
use pocketprog_core::tool::ToolConfig;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let dry_run = cli.dry_run || config::dry_run_from_env();
    if dry_run {
        log::warn!("Dry run: tool commands are logged, not executed");
    }

    let tool = ToolConfig {
        program: cli.tool.clone(),
        serial_port: cli.serial.clone(),
        image_root: cli.mmap_root.clone(),
        ..ToolConfig::default()
    };

    match cli.command {
        Commands::ListBackends => {
            commands::list_backends();
            Ok(())
        }
        Commands::Profiles => {
            let selector = load_profiles(cli.profiles.as_deref(), &tool)?;
            commands::list_profiles(&selector, &tool);
            Ok(())
        }
        Commands::Upload { profile } => {
            let selector = load_profiles(cli.profiles.as_deref(), &tool)?;
            commands::transfer::run_transfer(
                selector,
                &profile,
                Direction::Upload,
                tool,
                dry_run,
                cli.live_progress,
            )
        }
        Commands::Download { profile } => {
            let selector = load_profiles(cli.profiles.as_deref(), &tool)?;
            commands::transfer::run_transfer(
                selector,
                &profile,
                Direction::Download,
                tool,
                dry_run,
                cli.live_progress,
            )
        }
        Commands::Run {
            gpio,
            timing,
            shutdown_command,
        } => {
            let selector = match load_profiles(cli.profiles.as_deref(), &tool) {
                Ok(selector) => selector,
                Err(e) => {
                    eprintln!("Failed to load profiles: {}", e);
                    std::process::exit(1);
                }
            };
            commands::run::run(
                selector,
                RunOptions {
                    gpio,
                    timing: (&timing).into(),
                    shutdown_command,
                    tool,
                    dry_run,
                    live_progress: cli.live_progress,
                    display: cli.display.clone(),
                },
            )
        }
    }
}

/// Load profiles from a file, or scan the image root when none is given
fn load_profiles(
    path: Option<&Path>,
    tool: &ToolConfig,
) -> Result<ProfileSelector, Box<dyn std::error::Error>> {
    let profiles = match path {
        Some(path) => {
            let profiles = profile::load_file(path)?;
            log::info!("Loaded {} profiles from {}", profiles.len(), path.display());
            if let Err(e) = tool.check_image_root() {
                log::warn!("{}", e);
            }
            profiles
        }
        None => {
            tool.check_image_root()?;
            let profiles = profile::scan_image_root(&tool.image_root)?;
            log::info!(
                "Found {} images under {}",
                profiles.len(),
                tool.image_root.display()
            );
            profiles
        }
    };

    Ok(ProfileSelector::new(profiles)?)
}
