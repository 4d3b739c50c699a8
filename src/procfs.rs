//! Access to the `thinkpad_acpi` procfs files

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

/// Default fan control file path
pub(crate) const DEFAULT_FAN_PATH: &str = "/proc/acpi/ibm/fan";

/// Default thermal status file path
pub(crate) const DEFAULT_THERMAL_PATH: &str = "/proc/acpi/ibm/thermal";

/// Fan and thermal pseudo files exposed by the driver
#[derive(Clone, Debug)]
pub(crate) struct DriverFiles {
    /// Fan control & status file
    fan: PathBuf,
    /// Thermal status file
    thermal: PathBuf,
}

impl DriverFiles {
    /// Build from file paths
    ///
    /// The fan path ends up inside a shell snippet for the privileged write, so only plain
    /// path characters are accepted.
    pub(crate) fn new(fan: &Path, thermal: &Path) -> anyhow::Result<Self> {
        let fan_str = fan
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Fan path {fan:?} is not valid UTF-8"))?;
        anyhow::ensure!(fan.is_absolute(), "Fan path {fan:?} must be absolute");
        anyhow::ensure!(
            fan_str
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-')),
            "Fan path {fan:?} contains unsupported characters"
        );
        Ok(Self {
            fan: fan.to_owned(),
            thermal: thermal.to_owned(),
        })
    }

    /// Fan control file path
    pub(crate) fn fan_path(&self) -> &Path {
        &self.fan
    }

    /// Check if the fan control file exists
    pub(crate) fn fan_exists(&self) -> bool {
        self.fan.exists()
    }

    /// Check if the thermal file exists
    pub(crate) fn thermal_exists(&self) -> bool {
        self.thermal.exists()
    }

    /// Read whole fan control file
    pub(crate) fn read_fan(&self) -> anyhow::Result<String> {
        read_text(&self.fan)
    }

    /// Read whole thermal file
    pub(crate) fn read_thermal(&self) -> anyhow::Result<String> {
        read_text(&self.thermal)
    }
}

impl fmt::Display for DriverFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fan.display())
    }
}

/// Read text content of a procfs file
fn read_text(path: &Path) -> anyhow::Result<String> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
    log::trace!("{path:?}: {content:?}");
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::FakeDriver;

    #[test]
    fn reject_shell_characters() {
        assert!(
            DriverFiles::new(Path::new("/tmp/fan; rm -rf ~"), Path::new("/tmp/thermal")).is_err()
        );
        assert!(DriverFiles::new(Path::new("/tmp/fan'x"), Path::new("/tmp/thermal")).is_err());
        assert!(DriverFiles::new(Path::new("relative/fan"), Path::new("/tmp/thermal")).is_err());
        assert!(
            DriverFiles::new(Path::new(DEFAULT_FAN_PATH), Path::new(DEFAULT_THERMAL_PATH)).is_ok()
        );
    }

    #[test]
    fn read_files() {
        let driver = FakeDriver::new();
        driver.set_fan("status:\t\tenabled\nspeed:\t\t2900\nlevel:\t\tauto\n");
        driver.set_thermal("temperatures:\t51 0 0 0 0 0 0 0\n");
        let files = driver.files();
        assert!(files.fan_exists());
        assert!(files.thermal_exists());
        assert!(files.read_fan().unwrap().contains("2900"));
        assert!(files.read_thermal().unwrap().starts_with("temperatures:"));
    }

    #[test]
    fn missing_files() {
        let driver = FakeDriver::new();
        let files = driver.files();
        assert!(!files.fan_exists());
        assert!(!files.thermal_exists());
        assert!(files.read_fan().is_err());
    }
}
