//! Fan control file status parsing

use super::{LEVELS, Position};

/// Mode reported when the file has no `status:` line
const UNKNOWN_MODE: &str = "Unknown";

/// Fan level as reported by the driver
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum ReportedLevel {
    /// Embedded controller automatic mode
    Auto,
    /// Manual level 0-7
    Manual(u8),
    /// Full speed, without RPM regulation
    FullSpeed,
    /// Fan driven without thermal protection
    Disengaged,
    /// Any other value
    Unrecognized(String),
}

impl ReportedLevel {
    /// Interpret a `level:` value
    fn from_value(value: &str) -> Self {
        match value {
            "auto" => Self::Auto,
            "full-speed" => Self::FullSpeed,
            "disengaged" => Self::Disengaged,
            v => LEVELS
                .iter()
                .skip(1)
                .zip(0..)
                .find_map(|(l, n)| (l.command.strip_prefix("level ") == Some(v)).then_some(n))
                .map_or_else(|| Self::Unrecognized(v.to_owned()), Self::Manual),
        }
    }

    /// Slider position to display for this level
    fn position(&self) -> Position {
        match self {
            Self::Auto | Self::Unrecognized(_) => Position::AUTO,
            Self::Manual(n) => Position::from_manual_level(*n).unwrap_or(Position::AUTO),
            Self::FullSpeed | Self::Disengaged => Position::MAX,
        }
    }
}

/// Fan status, derived from the fan control file on each poll
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct FanStatus {
    /// Value of the `status:` line
    pub raw_mode: String,
    /// Fan speed, if spinning
    pub rpm: Option<u32>,
    /// Slider position to display, pinned to max when disengaged
    pub current_position: Position,
    /// No thermal protection, authoritative danger flag
    pub disengaged: bool,
    /// Last `level:` value, if any
    pub reported_level: Option<ReportedLevel>,
}

impl Default for FanStatus {
    fn default() -> Self {
        Self {
            raw_mode: UNKNOWN_MODE.to_owned(),
            rpm: None,
            current_position: Position::AUTO,
            disengaged: false,
            reported_level: None,
        }
    }
}

impl FanStatus {
    /// Fan is in a state this tool can not set, and should be brought back to a safe level
    pub(crate) fn needs_attention(&self) -> bool {
        self.disengaged || self.reported_level == Some(ReportedLevel::FullSpeed)
    }
}

/// Parse fan control file content
///
/// Never fails: unknown or missing values fall back to automatic mode display.
pub(crate) fn parse(raw: &str) -> FanStatus {
    let mut mode = None;
    let mut speed = None;
    let mut level = None;
    for line in raw.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "status" => mode = Some(value),
            "speed" => speed = Some(value),
            "level" => level = Some(value),
            _ => {}
        }
    }

    let rpm = speed.filter(|s| *s != "0").and_then(|s| {
        s.parse()
            .inspect_err(|e| log::debug!("Ignoring invalid speed {s:?}: {e}"))
            .ok()
    });
    let reported_level = level.map(ReportedLevel::from_value);
    let disengaged = reported_level == Some(ReportedLevel::Disengaged);
    let current_position = reported_level
        .as_ref()
        .map_or(Position::AUTO, ReportedLevel::position);

    FanStatus {
        raw_mode: mode.map_or_else(|| UNKNOWN_MODE.to_owned(), ToOwned::to_owned),
        rpm,
        current_position,
        disengaged,
        reported_level,
    }
}
