//! User notifications

use std::{
    fmt,
    process::{Command, Stdio},
    thread,
};

/// Notification title
const TITLE: &str = "ThinkPad Fan Control";

/// Fire and forget user visible message sink
pub(crate) trait Notifier {
    /// Show a message to the user
    fn notify(&self, message: &str);
}

/// Notification sink selection
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Sink {
    /// Log messages
    #[default]
    Log,
    /// Desktop notifications with `notify-send`
    Desktop,
}

impl Sink {
    /// Build notifier
    pub(crate) fn notifier(self) -> Box<dyn Notifier> {
        match self {
            Self::Log => Box::new(LogNotifier),
            Self::Desktop => Box::new(DesktopNotifier::default()),
        }
    }
}

/// Notifier writing to log
pub(crate) struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        log::warn!("{TITLE}: {message}");
    }
}

/// Notifier running `notify-send`
pub(crate) struct DesktopNotifier {
    /// Command to run
    program: String,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self {
            program: "notify-send".to_owned(),
        }
    }
}

impl fmt::Display for DesktopNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.program)
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, message: &str) {
        log::info!("{message}");
        let child = Command::new(&self.program)
            .args(["--app-name", TITLE, TITLE, message])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match child {
            Ok(mut child) => {
                // Reap in background, nobody waits for the outcome
                thread::spawn(move || {
                    if let Err(e) = child.wait() {
                        log::debug!("Failed to wait for notifier: {e}");
                    }
                });
            }
            Err(e) => {
                log::warn!("Failed to run {self}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_notify_command_is_harmless() {
        let notifier = DesktopNotifier {
            program: "/nonexistent/notify-send".to_owned(),
        };
        notifier.notify("hello");
    }

    #[test]
    fn sink_names() {
        assert_eq!(Sink::Log.to_string(), "log");
        assert_eq!(Sink::Desktop.to_string(), "desktop");
    }
}
