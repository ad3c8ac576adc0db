//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pocketprog")]
#[command(author, version, about = "Button-driven radio programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Profile list (RON or TOML). Without it, the image root is scanned
    /// for <model>/<file>.img
    #[arg(long, global = true)]
    pub profiles: Option<PathBuf>,

    /// Directory holding one folder of images per radio model
    #[arg(long, global = true, default_value = "/home/pi/Radios")]
    pub mmap_root: PathBuf,

    /// Programmer tool executable
    #[arg(long, global = true, default_value = "chirpc")]
    pub tool: String,

    /// Serial port of the programming cable
    #[arg(long, global = true, default_value = "/dev/ttyUSB0")]
    pub serial: String,

    /// Log tool invocations instead of running them (also POCKET_DRY_RUN=1)
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Stream tool output and progress to the display while it runs
    #[arg(long, global = true)]
    pub live_progress: bool,

    /// Status display: auto, ssd1306[:bus=/dev/i2c-1,address=0x3c], console or log
    #[arg(long, global = true, default_value = "auto")]
    pub display: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Edge that fires Select and Write
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FireOn {
    /// When the button goes down
    #[default]
    Press,
    /// When the button comes back up
    Release,
}

/// Button timing options
#[derive(clap::Args, Debug, Clone)]
pub struct TimingArgs {
    /// Hold time of the Read button that powers the host off
    #[arg(long, default_value_t = 2000)]
    pub long_press_ms: u64,

    /// Minimum time between accepted transitions of a button
    #[arg(long, default_value_t = 50)]
    pub debounce_ms: u64,

    /// Sampling period when edge notifications are unavailable
    #[arg(long, default_value_t = 50)]
    pub poll_ms: u64,

    /// Edge that fires Select and Write
    #[arg(long, value_enum, default_value_t = FireOn::Press)]
    pub fire_on: FireOn,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Wait for button presses and run uploads/downloads
    Run {
        /// GPIO backend, e.g. linux_gpio:gpiochip=0,select=13,write=19,read=26
        #[arg(short, long, default_value = "linux_gpio")]
        gpio: String,

        #[command(flatten)]
        timing: TimingArgs,

        /// Command run on a long press of Read
        #[arg(long, default_value = "sudo shutdown -h now")]
        shutdown_command: String,
    },

    /// List the loaded profiles
    Profiles,

    /// Upload one profile's image without buttons
    Upload {
        /// Profile number (from `profiles`) or name
        profile: String,
    },

    /// Download the radio into the next numbered image without buttons
    Download {
        /// Profile number (from `profiles`) or name
        profile: String,
    },

    /// List supported GPIO backends
    ListBackends,
}
