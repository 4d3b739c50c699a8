//! Fan level catalog

mod slider;
mod status;

use std::fmt;

pub(crate) use slider::{Fraction, fraction_to_position, position_to_fraction};
pub(crate) use status::{FanStatus, ReportedLevel, parse};

/// A fan level the driver accepts, and that is safe to set
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct FanLevel {
    /// Slider position
    pub position: Position,
    /// Human readable label
    pub label: &'static str,
    /// Exact command string written to the fan control file
    pub command: &'static str,
}

impl fmt::Display for FanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// All safe fan levels, ordered by slider position.
/// `full-speed` and `disengaged` are deliberately absent: they can be observed, never set.
pub(crate) static LEVELS: [FanLevel; Position::COUNT] = [
    FanLevel {
        position: Position(0),
        label: "Auto",
        command: "level auto",
    },
    FanLevel {
        position: Position(1),
        label: "Level 0",
        command: "level 0",
    },
    FanLevel {
        position: Position(2),
        label: "Level 1",
        command: "level 1",
    },
    FanLevel {
        position: Position(3),
        label: "Level 2",
        command: "level 2",
    },
    FanLevel {
        position: Position(4),
        label: "Level 3",
        command: "level 3",
    },
    FanLevel {
        position: Position(5),
        label: "Level 4",
        command: "level 4",
    },
    FanLevel {
        position: Position(6),
        label: "Level 5",
        command: "level 5",
    },
    FanLevel {
        position: Position(7),
        label: "Level 6",
        command: "level 6",
    },
    FanLevel {
        position: Position(8),
        label: "Level 7 (Max Safe)",
        command: "level 7",
    },
];

/// Slider position, index into [`LEVELS`]
///
/// 0 is automatic mode, 1 to 8 are manual levels 0 to 7.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct Position(u8);

impl Position {
    /// Number of positions
    pub(crate) const COUNT: usize = 9;
    /// Automatic mode
    pub(crate) const AUTO: Self = Self(0);
    /// Highest position, maximum safe manual level
    pub(crate) const MAX: Self = Self(8);

    /// Build a position from a raw index, if in range
    pub(crate) fn new(index: usize) -> Option<Self> {
        u8::try_from(index)
            .ok()
            .filter(|i| usize::from(*i) < Self::COUNT)
            .map(Self)
    }

    /// Raw index
    pub(crate) fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Catalog entry for this position
    pub(crate) fn level(self) -> &'static FanLevel {
        #[expect(clippy::indexing_slicing)] // guaranteed by construction
        let level = &LEVELS[self.index()];
        level
    }

    /// Manual driver level (0-7) of this position, `None` for automatic mode
    pub(crate) fn manual_level(self) -> Option<u8> {
        self.0.checked_sub(1)
    }

    /// Position of a manual driver level (0-7)
    pub(crate) fn from_manual_level(level: u8) -> Option<Self> {
        Self::new(usize::from(level) + 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check a command string is one of the catalog commands
pub(crate) fn is_safe_command(command: &str) -> bool {
    LEVELS.iter().any(|l| l.command == command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_ordered() {
        for (i, level) in LEVELS.iter().enumerate() {
            assert_eq!(level.position.index(), i);
            assert_eq!(Position::new(i).unwrap().level(), level);
        }
    }

    #[test]
    fn catalog_commands() {
        assert_eq!(LEVELS[0].command, "level auto");
        for n in 0..=7_u8 {
            let pos = Position::from_manual_level(n).unwrap();
            assert_eq!(pos.level().command, format!("level {n}"));
        }
        assert_eq!(Position::MAX.level().label, "Level 7 (Max Safe)");
    }

    #[test]
    fn position_range() {
        assert_eq!(Position::new(0), Some(Position::AUTO));
        assert_eq!(Position::new(8), Some(Position::MAX));
        assert_eq!(Position::new(9), None);
        assert_eq!(Position::new(256), None);
        assert_eq!(Position::new(usize::MAX), None);
        assert_eq!(Position::from_manual_level(8), None);
    }

    #[test]
    fn unsafe_commands() {
        assert!(is_safe_command("level auto"));
        assert!(is_safe_command("level 7"));
        assert!(!is_safe_command("level 8"));
        assert!(!is_safe_command("level full-speed"));
        assert!(!is_safe_command("level disengaged"));
        assert!(!is_safe_command("disable"));
    }
}
