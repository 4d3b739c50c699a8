//! Command line interface

use std::{ffi::OsString, path::PathBuf, str::FromStr};

use clap::{Parser, Subcommand};

use crate::{
    fan::Position,
    notify::Sink,
    poller::DEFAULT_INTERVAL,
    procfs::{DEFAULT_FAN_PATH, DEFAULT_THERMAL_PATH},
    settings::Key,
};

/// Fan level to set, as named by the driver
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct LevelArg(pub Position);

impl FromStr for LevelArg {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self(Position::AUTO)),
            "full-speed" | "disengaged" => Err("Level is unsafe and can not be set"),
            s => s
                .parse::<u8>()
                .ok()
                .filter(|_| s.bytes().all(|b| b.is_ascii_digit()))
                .and_then(Position::from_manual_level)
                .map(Self)
                .ok_or("Invalid level, expected 'auto' or 0-7"),
        }
    }
}

/// Parse a non zero monitor interval
fn parse_interval(s: &str) -> Result<humantime::Duration, String> {
    let interval: humantime::Duration = s
        .parse()
        .map_err(|e: humantime::DurationError| e.to_string())?;
    if interval.is_zero() {
        return Err("Interval must not be zero".to_owned());
    }
    Ok(interval)
}

/// Elevation command and its arguments
#[derive(Clone, Debug)]
pub(crate) struct ElevationCommand(pub Vec<OsString>);

impl FromStr for ElevationCommand {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.split_ascii_whitespace().map(OsString::from).collect()))
    }
}

/// Tpfancontrol command line arguments
#[derive(Parser, Debug)]
#[command(version, about)]
pub(crate) struct Args {
    /// Level of logging output (TRACE, DEBUG, INFO, WARN, ERROR).
    #[arg(short, default_value_t = log::Level::Info)]
    pub verbosity: log::Level,

    /// Fan control file.
    #[arg(long, default_value = DEFAULT_FAN_PATH)]
    pub fan: PathBuf,

    /// Thermal status file.
    #[arg(long, default_value = DEFAULT_THERMAL_PATH)]
    pub thermal: PathBuf,

    /// Settings file, defaults to `$XDG_CONFIG_HOME/tpfancontrol/settings.json`.
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Non interactive command used to gain privileges to write the fan control file.
    /// It must never prompt for a password, ie. sudo with a NOPASSWD rule.
    /// Use an empty string to write directly, when already running as root.
    #[arg(short, long, default_value = "sudo -n")]
    pub elevate: ElevationCommand,

    /// Maximum time to wait for the privileged write, ie. '5s', '500ms'.
    #[arg(long, default_value = "5s")]
    pub write_timeout: humantime::Duration,

    /// Where to send user notifications.
    #[arg(short, long, default_value_t)]
    pub notify: Sink,

    /// Main action
    #[command(subcommand)]
    pub command: Command,
}

/// Main command
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Show fan status
    Status,

    /// Set fan level
    Set {
        /// 'auto', or manual level 0-7 (7 is the maximum safe level).
        level: LevelArg,
    },

    /// Set fan level from a slider value, snapped to the nearest level
    Slide {
        /// Value in [0.0; 1.0], 0.0 is 'auto', 1.0 is level 7.
        #[arg(allow_negative_numbers = true)]
        fraction: f64,
    },

    /// Monitor fan status and temperature
    Monitor {
        /// Refresh interval, ie. '5s', '1min'.
        #[arg(
            short,
            long,
            default_value_t = humantime::Duration::from(DEFAULT_INTERVAL),
            value_parser = parse_interval
        )]
        interval: humantime::Duration,

        /// Read level changes from standard input ('auto', '0'-'7', 'emergency', 'refresh', 'quit').
        #[arg(long)]
        interactive: bool,
    },

    /// Show or change settings
    Settings {
        /// Settings action
        #[command(subcommand)]
        action: SettingsAction,
    },
}

/// Settings command
#[derive(Subcommand, Debug)]
pub(crate) enum SettingsAction {
    /// Show all settings
    List,

    /// Show a setting value
    Get {
        /// Setting name (show-temperature, show-notifications, auto-mode-on-suspend).
        key: Key,
    },

    /// Change a setting value
    Set {
        /// Setting name (show-temperature, show-notifications, auto-mode-on-suspend).
        key: Key,

        /// New value.
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
}
