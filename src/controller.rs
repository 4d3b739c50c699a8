//! Fan state reconciliation and control

use std::rc::Rc;

use crate::{
    elevate::{self, PrivilegedWriter, WriteError},
    fan::{self, FanLevel, FanStatus, Position, ReportedLevel},
    notify::Notifier,
    procfs::DriverFiles,
    settings::{Key, Settings},
    thermal::{self, Temp},
};

/// Fan control file availability
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) enum Availability {
    /// Not read yet
    #[default]
    Loading,
    /// Last read succeeded
    Available,
    /// Fan control file does not exist
    NotAvailable,
    /// Last read failed
    ReadError(String),
}

/// Controller state, only mutated by [`FanController`]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct ControllerState {
    /// Last known fan status
    pub status: FanStatus,
    /// Fan control file availability
    pub availability: Availability,
    /// Error of the last failed level change, cleared on success
    pub last_command_error: Option<String>,
    /// Whether the level can currently be changed
    pub slider_sensitive: bool,
}

/// Level change failure
#[derive(thiserror::Error, Debug)]
pub(crate) enum ControlError {
    /// Position outside of the level catalog
    #[error("Invalid fan level position {0}")]
    InvalidLevel(usize),
    /// Fan control file missing
    #[error("Fan control not available")]
    ResourceUnavailable,
    /// Elevation mechanism needs user setup
    #[error("Fan control authorization is not configured: {0}")]
    AuthorizationNotConfigured(#[source] WriteError),
    /// Privileged write failed
    #[error("Failed to set fan level: {0}")]
    WriteFailure(#[source] WriteError),
    /// Anything else, operation was abandoned
    #[error("Fan level change cancelled: {0}")]
    UnexpectedFailure(#[source] WriteError),
}

/// Fan controller, single owner of the fan state
pub(crate) struct FanController {
    /// Driver files
    files: DriverFiles,
    /// Privileged writer for the fan control file
    writer: Box<dyn PrivilegedWriter>,
    /// User notifications
    notifier: Box<dyn Notifier>,
    /// User settings
    settings: Rc<Settings>,
    /// Current state
    state: ControllerState,
    /// Last read CPU temperature
    temperature: Option<Temp>,
    /// Authorization setup instructions were already shown
    setup_notice_sent: bool,
}

impl FanController {
    /// Build a new controller, state is loaded on first refresh
    pub(crate) fn new(
        files: DriverFiles,
        writer: Box<dyn PrivilegedWriter>,
        notifier: Box<dyn Notifier>,
        settings: Rc<Settings>,
    ) -> Self {
        Self {
            files,
            writer,
            notifier,
            settings,
            state: ControllerState::default(),
            temperature: None,
            setup_notice_sent: false,
        }
    }

    /// Current state
    pub(crate) fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Last read temperature
    pub(crate) fn temperature(&self) -> Option<Temp> {
        self.temperature
    }

    /// User settings
    pub(crate) fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Reload fan status from the fan control file
    pub(crate) fn refresh(&mut self) {
        if !self.files.fan_exists() {
            log::debug!("Fan control file {} does not exist", self.files);
            self.state.availability = Availability::NotAvailable;
            self.state.slider_sensitive = false;
            return;
        }
        match self.files.read_fan() {
            Ok(raw) => {
                let status = fan::parse(&raw);
                log::debug!("Fan status: {status:?}");
                self.state.status = status;
                self.state.availability = Availability::Available;
                self.state.slider_sensitive = true;
            }
            Err(e) => {
                log::error!("Failed to read fan status: {e:#}");
                self.state.availability = Availability::ReadError(format!("{e:#}"));
                self.state.slider_sensitive = false;
            }
        }
    }

    /// Reload CPU temperature, if enabled in settings
    pub(crate) fn refresh_temperature(&mut self) {
        if !self.settings.get(Key::ShowTemperature) || !self.files.thermal_exists() {
            return;
        }
        match self.files.read_thermal().and_then(|raw| thermal::parse(&raw)) {
            Ok(temp) => {
                log::debug!("CPU temperature: {temp}°C");
                self.temperature = Some(temp);
            }
            Err(e) => {
                log::error!("Failed to read temperature: {e:#}");
            }
        }
    }

    /// Set fan level at slider position
    ///
    /// Every failure is reported to the user before being returned, and leaves the fan status
    /// untouched.
    pub(crate) fn set_level(
        &mut self,
        requested: usize,
    ) -> Result<&'static FanLevel, ControlError> {
        let Some(position) = Position::new(requested) else {
            log::error!("Invalid fan level position: {requested}");
            return Err(ControlError::InvalidLevel(requested));
        };
        let level = position.level();

        if !self.files.fan_exists() {
            self.notifier.notify("Fan control not available");
            return Err(ControlError::ResourceUnavailable);
        }

        log::info!("Setting fan level to {level} (position {})", level.position);
        match self.writer.write(self.files.fan_path(), level.command) {
            Ok(()) => {
                self.apply(position);
                self.state.last_command_error = None;
                self.refresh();
                if self.settings.get(Key::ShowNotifications) {
                    self.notifier.notify(&format!("Fan level changed to: {level}"));
                }
                Ok(level)
            }
            Err(e) => {
                let err = self.report_write_error(level, e);
                self.state.last_command_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Switch back to automatic mode, the way out of disengaged or full speed states
    pub(crate) fn emergency_auto(&mut self) -> Result<&'static FanLevel, ControlError> {
        log::warn!("Emergency switch to automatic fan control");
        self.set_level(Position::AUTO.index())
    }

    /// Record a confirmed level change, until the next refresh
    fn apply(&mut self, position: Position) {
        let status = &mut self.state.status;
        status.current_position = position;
        status.disengaged = false;
        status.reported_level = Some(
            position
                .manual_level()
                .map_or(ReportedLevel::Auto, ReportedLevel::Manual),
        );
    }

    /// Notify user of a write failure, and classify it
    fn report_write_error(&mut self, level: &FanLevel, err: WriteError) -> ControlError {
        let path = self.files.fan_path();
        match err {
            WriteError::NotAuthorized(_) => {
                if self.setup_notice_sent {
                    log::warn!("Fan control authorization is still not configured: {err}");
                } else {
                    self.notifier.notify(&format!(
                        "Setup required: Run \"sudo visudo\" and add this line:\n{}",
                        elevate::sudoers_rule(path)
                    ));
                    self.setup_notice_sent = true;
                }
                ControlError::AuthorizationNotConfigured(err)
            }
            WriteError::Failed(ref detail) => {
                self.notifier.notify(&format!("Failed: {detail}"));
                ControlError::WriteFailure(err)
            }
            WriteError::Spawn(_)
            | WriteError::Timeout(_)
            | WriteError::Wait(_)
            | WriteError::ForbiddenCommand(_) => {
                log::error!("Failed to set fan level {level}: {err}");
                self.notifier.notify(&format!(
                    "Operation cancelled to prevent system freeze.\nManual command needed:\n{}",
                    elevate::manual_command(path, level.command)
                ));
                ControlError::UnexpectedFailure(err)
            }
        }
    }
}
