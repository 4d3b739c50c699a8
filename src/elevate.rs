//! Privileged writes through an external, non interactive elevation command

use std::{
    ffi::OsString,
    fmt,
    io::{self, Read as _},
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
    thread::sleep,
    time::{Duration, Instant},
};

use crate::fan;

/// Shell used to redirect the command into the fan file, absolute so it can be allow-listed
const SHELL: &str = "/bin/sh";

/// Delay between child exit checks
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Privileged write failure
#[derive(thiserror::Error, Debug)]
pub(crate) enum WriteError {
    /// Elevation mechanism refused to run without user setup
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    /// Command ran and failed
    #[error("Command failed: {0}")]
    Failed(String),
    /// Command could not be started
    #[error("Failed to run elevation command: {0}")]
    Spawn(#[source] io::Error),
    /// Command did not finish in time and was killed
    #[error("Elevation command timed out after {0:?}")]
    Timeout(Duration),
    /// Waiting for the command failed
    #[error("Failed to wait for elevation command: {0}")]
    Wait(#[source] io::Error),
    /// Command string is not a catalog command
    #[error("Refusing to write {0:?}")]
    ForbiddenCommand(String),
}

/// Something able to write a command to the fan control file with elevated privileges
pub(crate) trait PrivilegedWriter: fmt::Display {
    /// Write command to path
    fn write(&self, path: &Path, command: &str) -> Result<(), WriteError>;
}

/// Shell snippet writing command to path
pub(crate) fn shell_snippet(path: &Path, command: &str) -> String {
    format!("echo \"{command}\" > {}", path.display())
}

/// Command line the user can run by hand
pub(crate) fn manual_command(path: &Path, command: &str) -> String {
    format!("sudo sh -c '{}'", shell_snippet(path, command))
}

/// Sudoers rule allowing the privileged write without password
pub(crate) fn sudoers_rule(path: &Path) -> String {
    format!("%sudo ALL=(ALL) NOPASSWD: {SHELL} -c echo * > {}", path.display())
}

/// Writer running `<prefix...> /bin/sh -c 'echo "<command>" > <path>'`
pub(crate) struct CommandElevator {
    /// Elevation command and its arguments, ie. `sudo -n`, may be empty
    prefix: Vec<OsString>,
    /// Maximum duration to wait for the command
    timeout: Duration,
}

impl CommandElevator {
    /// Build a new elevator
    pub(crate) fn new(prefix: Vec<OsString>, timeout: Duration) -> Self {
        Self { prefix, timeout }
    }

    /// Build command to run
    fn command(&self, path: &Path, command: &str) -> Command {
        let snippet = shell_snippet(path, command);
        let mut cmd = if let Some((program, args)) = self.prefix.split_first() {
            let mut cmd = Command::new(program);
            cmd.args(args).arg(SHELL);
            cmd
        } else {
            Command::new(SHELL)
        };
        cmd.arg("-c")
            .arg(&snippet)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .env("LANG", "C");
        cmd
    }

    /// Wait for child to exit, killing it when timeout is reached
    ///
    /// The kill is best effort: only the direct child is signaled, and a privileged shell it
    /// spawned may outlive it, or not be killable by an unprivileged user at all.
    fn wait(&self, child: &mut Child) -> Result<ExitStatus, WriteError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait().map_err(WriteError::Wait)? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                log::warn!("Elevation command {self} timed out, killing it");
                if let Err(e) = child.kill() {
                    log::debug!("Failed to kill elevation command: {e}");
                }
                if let Err(e) = child.wait() {
                    log::debug!("Failed to wait for elevation command: {e}");
                }
                return Err(WriteError::Timeout(self.timeout));
            }
            sleep(POLL_INTERVAL);
        }
    }
}

impl fmt::Display for CommandElevator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        if self.prefix.is_empty() {
            write!(f, "{SHELL}")
        } else {
            let prefix: Vec<_> = self.prefix.iter().map(|a| a.to_string_lossy()).collect();
            write!(f, "{}", prefix.join(" "))
        }
    }
}

impl PrivilegedWriter for CommandElevator {
    fn write(&self, path: &Path, command: &str) -> Result<(), WriteError> {
        if !fan::is_safe_command(command) {
            return Err(WriteError::ForbiddenCommand(command.to_owned()));
        }
        let mut cmd = self.command(path, command);
        log::debug!("Running {cmd:?}");
        let mut child = cmd.spawn().map_err(WriteError::Spawn)?;
        let status = self.wait(&mut child)?;

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            pipe.read_to_string(&mut stderr).map_err(WriteError::Wait)?;
        }
        let stderr = stderr.trim();
        if status.success() {
            if !stderr.is_empty() {
                log::debug!("Elevation command stderr: {stderr}");
            }
            log::info!("Wrote {command:?} to {path:?}");
            return Ok(());
        }

        log::warn!("Elevation command {self} failed with status {status}: {stderr}");
        let detail = if stderr.is_empty() {
            status.to_string()
        } else {
            stderr.to_owned()
        };
        if stderr.contains("password") || stderr.contains("sudo") {
            Err(WriteError::NotAuthorized(detail))
        } else {
            Err(WriteError::Failed(detail))
        }
    }
}
