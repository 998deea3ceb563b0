//! CLI command definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Talk to an EConBadge over its Wi-Fi socket
#[derive(Debug, Parser)]
#[command(name = "ecb", version, about)]
pub struct CliArgs {
    /// YAML configuration file
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Badge address (HOST:PORT), overriding the configuration
    #[arg(long, short = 'a')]
    pub address: Option<String>,

    /// Log protocol traffic
    #[arg(long, short = 'v')]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print the effective configuration as YAML
    Config,

    /// Show owner, versions and display state
    Info,

    /// Check the badge answers
    Ping,

    /// Change the owner text
    SetOwner {
        owner: String,
    },

    /// Change the contact text
    SetContact {
        contact: String,
    },

    /// Change the Bluetooth name and PIN
    SetBluetooth {
        /// Advertised name (up to 20 characters)
        name: String,

        /// Pairing PIN (4 digits)
        pin: String,
    },

    /// Restore factory settings
    FactoryReset,

    /// Blank the e-ink display
    ClearDisplay,

    /// Upload a 600x448 8bpp palette bitmap and show it
    PushImage {
        /// Bitmap file
        file: PathBuf,

        /// Name to store it under (default: file stem)
        #[arg(long)]
        name: Option<String>,
    },

    /// Download a stored image as a bitmap
    FetchImage {
        /// Image name on the badge
        name: String,

        /// Output bitmap file
        #[arg(long, short = 'o')]
        output: PathBuf,
    },

    /// List stored images
    ListImages {
        /// First image to list
        #[arg(long, default_value = "0")]
        start: u32,

        /// Maximum number of names
        #[arg(long, default_value = "20")]
        count: u32,
    },

    /// Show a stored image
    SelectImage {
        name: String,
    },

    /// Delete a stored image
    RemoveImage {
        name: String,
    },

    /// LED border control
    Led {
        #[command(subcommand)]
        action: LedAction,
    },

    /// Install the latest firmware from the update server
    Update {
        /// Only report whether an update is available
        #[arg(long)]
        check_only: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum LedAction {
    /// Show the border state
    Info,

    /// Turn the border on
    Enable,

    /// Turn the border off
    Disable,

    /// Set brightness in percent
    Brightness {
        percent: u8,
    },

    /// Set the color pattern
    Pattern {
        /// One color for the whole border (RRGGBB)
        #[arg(long, conflicts_with = "segment")]
        plain: Option<String>,

        /// Gradient segment START:END:SIZE, repeated for up to four segments
        #[arg(long, value_name = "START:END:SIZE")]
        segment: Vec<String>,
    },

    /// Add an animation
    AddAnimation {
        /// Animation type
        anim_type: u8,

        /// Speed or type-specific parameter
        param: u8,
    },

    /// Remove the animation at an index
    RemoveAnimation {
        index: u8,
    },

    /// Remove all animations
    ClearAnimations,
}
