//! User facing state, derived from the controller

use std::fmt;

use crate::{
    controller::{Availability, FanController},
    fan::{self, Fraction, Position, ReportedLevel},
    settings::Key,
};

/// Indicator icon
#[derive(Copy, Clone, Debug, Eq, PartialEq, strum::Display)]
pub(crate) enum Icon {
    /// Automatic or low levels
    #[strum(serialize = "weather-windy-symbolic")]
    Windy,
    /// High levels
    #[strum(serialize = "weather-storm-symbolic")]
    Storm,
    /// Fan disengaged
    #[strum(serialize = "dialog-warning-symbolic")]
    Warning,
}

/// Everything the user sees about the fan
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Presentation {
    /// Status line
    pub status: String,
    /// Current level line
    pub level: String,
    /// Level description
    pub description: String,
    /// Indicator icon
    pub icon: Icon,
    /// Temperature label, if enabled and known
    pub temperature: Option<String>,
    /// Error of the last failed level change
    pub last_error: Option<String>,
    /// Slider value
    pub slider: Fraction,
    /// Whether the slider accepts input
    pub slider_sensitive: bool,
    /// Fan is in a state that needs user attention
    pub warning: bool,
    /// "Emergency: Switch to Auto" action is offered
    pub emergency_auto: bool,
}

impl Presentation {
    /// Compute presentation from current controller state
    pub(crate) fn new(controller: &FanController) -> Self {
        let state = controller.state();
        let status = &state.status;
        let speed = status
            .rpm
            .map_or_else(String::new, |rpm| format!(" ({rpm} RPM)"));
        let full_speed = status.reported_level == Some(ReportedLevel::FullSpeed);

        let status_text = match &state.availability {
            Availability::Loading => "Loading...".to_owned(),
            Availability::NotAvailable => "ThinkPad fan control not available".to_owned(),
            Availability::ReadError(e) => format!("Error reading fan status: {e}"),
            Availability::Available if status.disengaged => {
                format!("⚠️ DISENGAGED{speed} - No thermal protection!")
            }
            Availability::Available => format!("Status: {}{speed}", status.raw_mode),
        };

        let (level, description) = if status.disengaged {
            (
                "Fan Level: Disengaged".to_owned(),
                "⚠️ DANGER: Fan disengaged - No thermal protection!".to_owned(),
            )
        } else if full_speed {
            (
                "Fan Level: Full Speed".to_owned(),
                "⚠️ Fan at full speed, not regulated".to_owned(),
            )
        } else {
            let position = status.current_position;
            let description = match position.manual_level() {
                None => "Automatic fan control".to_owned(),
                Some(_) if position == Position::MAX => "Maximum safe manual level".to_owned(),
                Some(n) => format!("Manual fan level {n}"),
            };
            (format!("Fan Level: {}", position.level()), description)
        };

        let icon = if status.disengaged {
            Icon::Warning
        } else if status.current_position.index() <= 4 {
            Icon::Windy
        } else {
            Icon::Storm
        };

        let temperature = controller
            .temperature()
            .filter(|_| controller.settings().get(Key::ShowTemperature))
            .map(|t| format!("{t}°C"));

        Self {
            status: status_text,
            level,
            description,
            icon,
            temperature,
            last_error: state.last_command_error.clone(),
            slider: fan::position_to_fraction(status.current_position),
            slider_sensitive: state.slider_sensitive,
            warning: status.needs_attention(),
            emergency_auto: status.needs_attention(),
        }
    }
}

impl fmt::Display for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.status)?;
        writeln!(f, "{}", self.level)?;
        writeln!(f, "{}", self.description)?;
        if let Some(temp) = &self.temperature {
            writeln!(f, "Temperature: {temp}")?;
        }
        if let Some(err) = &self.last_error {
            writeln!(f, "Last error: {err}")?;
        }
        write!(
            f,
            "Slider: {}{}",
            self.slider,
            if self.slider_sensitive {
                ""
            } else {
                " (disabled)"
            }
        )?;
        if self.emergency_auto {
            write!(f, "\nRun 'set auto' to switch back to automatic fan control")?;
        }
        Ok(())
    }
}
