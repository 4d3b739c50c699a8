//! Persistent user settings, with change observers

use std::{
    cell::{Cell, RefCell},
    env, fs,
    path::{Path, PathBuf},
    rc::{Rc, Weak},
};

use anyhow::Context as _;

/// Boolean setting key
#[derive(Copy, Clone, Debug, Eq, PartialEq, strum::Display, strum::EnumString, strum::EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum Key {
    /// Show CPU temperature
    ShowTemperature,
    /// Notify on fan level change
    ShowNotifications,
    /// Switch fan back to auto mode when the monitor stops
    AutoModeOnSuspend,
}

/// Setting values, as stored on disk
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct Values {
    /// See [`Key::ShowTemperature`]
    show_temperature: bool,
    /// See [`Key::ShowNotifications`]
    show_notifications: bool,
    /// See [`Key::AutoModeOnSuspend`]
    auto_mode_on_suspend: bool,
}

impl Default for Values {
    fn default() -> Self {
        Self {
            show_temperature: true,
            show_notifications: true,
            auto_mode_on_suspend: false,
        }
    }
}

impl Values {
    /// Get value for key
    fn get(&self, key: Key) -> bool {
        match key {
            Key::ShowTemperature => self.show_temperature,
            Key::ShowNotifications => self.show_notifications,
            Key::AutoModeOnSuspend => self.auto_mode_on_suspend,
        }
    }

    /// Set value for key
    fn set(&mut self, key: Key, value: bool) {
        match key {
            Key::ShowTemperature => self.show_temperature = value,
            Key::ShowNotifications => self.show_notifications = value,
            Key::AutoModeOnSuspend => self.auto_mode_on_suspend = value,
        }
    }
}

/// Setting change callback
type Callback = Rc<dyn Fn(bool)>;

/// Registered observers
#[derive(Default)]
struct Observers {
    /// Next subscription id
    next_id: u64,
    /// Subscription id, observed key, callback
    entries: Vec<(u64, Key, Callback)>,
}

/// Observer registration, unregistered when dropped
#[must_use]
pub(crate) struct Subscription {
    /// Subscription id
    id: u64,
    /// Observers it is registered into
    observers: Weak<RefCell<Observers>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.borrow_mut().entries.retain(|(id, _, _)| *id != self.id);
        }
    }
}

/// Key/value settings store backed by a JSON file
pub(crate) struct Settings {
    /// Backing file, if any
    path: Option<PathBuf>,
    /// Current values
    values: Cell<Values>,
    /// Change observers
    observers: Rc<RefCell<Observers>>,
}

impl Settings {
    /// Load settings from file, using defaults if it does not exist
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let values = Self::read(path)?;
        log::debug!("Settings loaded from {path:?}: {values:?}");
        Ok(Self {
            path: Some(path.to_owned()),
            values: Cell::new(values),
            observers: Rc::default(),
        })
    }

    /// Settings with default values, not persisted
    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        Self {
            path: None,
            values: Cell::new(Values::default()),
            observers: Rc::default(),
        }
    }

    /// Read values from file
    fn read(path: &Path) -> anyhow::Result<Values> {
        if !path.exists() {
            return Ok(Values::default());
        }
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {path:?}"))?;
        serde_json::from_str(&content).with_context(|| format!("Invalid settings file {path:?}"))
    }

    /// Get setting value
    pub(crate) fn get(&self, key: Key) -> bool {
        self.values.get().get(key)
    }

    /// Set setting value, persist it, and notify observers if it changed
    pub(crate) fn set(&self, key: Key, value: bool) -> anyhow::Result<()> {
        let mut values = self.values.get();
        values.set(key, value);
        if let Some(path) = &self.path {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory {dir:?}"))?;
            }
            let json = serde_json::to_string_pretty(&values)?;
            fs::write(path, json).with_context(|| format!("Failed to write {path:?}"))?;
        }
        self.update(values);
        Ok(())
    }

    /// Reload settings from file, notifying observers of changed values
    pub(crate) fn reload(&self) -> anyhow::Result<()> {
        if let Some(path) = &self.path {
            let values = Self::read(path)?;
            self.update(values);
        }
        Ok(())
    }

    /// Replace values and notify observers of changed keys
    fn update(&self, values: Values) {
        let previous = self.values.replace(values);
        for key in <Key as strum::IntoEnumIterator>::iter() {
            let value = values.get(key);
            if previous.get(key) != value {
                log::info!("Setting {key} changed to {value}");
                // Callbacks are cloned out so they may use the store
                let callbacks: Vec<Callback> = self
                    .observers
                    .borrow()
                    .entries
                    .iter()
                    .filter(|(_, k, _)| *k == key)
                    .map(|(_, _, cb)| Rc::clone(cb))
                    .collect();
                for callback in callbacks {
                    callback(value);
                }
            }
        }
    }

    /// Register a callback invoked when a key value changes
    pub(crate) fn connect<F>(&self, key: Key, callback: F) -> Subscription
    where
        F: Fn(bool) + 'static,
    {
        let mut observers = self.observers.borrow_mut();
        let id = observers.next_id;
        observers.next_id += 1;
        observers.entries.push((id, key, Rc::new(callback)));
        Subscription {
            id,
            observers: Rc::downgrade(&self.observers),
        }
    }
}

/// Default settings file path
pub(crate) fn default_path() -> anyhow::Result<PathBuf> {
    let config_dir = env::var_os("XDG_CONFIG_HOME")
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or_else(|| anyhow::anyhow!("Unable to find configuration directory"))?;
    Ok(config_dir.join(env!("CARGO_PKG_NAME")).join("settings.json"))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert!(settings.get(Key::ShowTemperature));
        assert!(settings.get(Key::ShowNotifications));
        assert!(!settings.get(Key::AutoModeOnSuspend));
    }

    #[test]
    fn persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("settings.json");
        let settings = Settings::load(&path).unwrap();
        settings.set(Key::AutoModeOnSuspend, true).unwrap();
        settings.set(Key::ShowTemperature, false).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"auto-mode-on-suspend\": true"));

        let reloaded = Settings::load(&path).unwrap();
        assert!(reloaded.get(Key::AutoModeOnSuspend));
        assert!(!reloaded.get(Key::ShowTemperature));
        assert!(reloaded.get(Key::ShowNotifications));
    }

    #[test]
    fn partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"show-notifications": false}"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert!(!settings.get(Key::ShowNotifications));
        assert!(settings.get(Key::ShowTemperature));
    }

    #[test]
    fn invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn observers() {
        let settings = Settings::in_memory();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sub = {
            let seen = Rc::clone(&seen);
            settings.connect(Key::ShowTemperature, move |v| seen.borrow_mut().push(v))
        };

        settings.set(Key::ShowTemperature, false).unwrap();
        // Unchanged value and other keys are not notified
        settings.set(Key::ShowTemperature, false).unwrap();
        settings.set(Key::ShowNotifications, false).unwrap();
        assert_eq!(*seen.borrow(), vec![false]);

        drop(sub);
        settings.set(Key::ShowTemperature, true).unwrap();
        assert_eq!(*seen.borrow(), vec![false]);
    }

    #[test]
    fn reload_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings::load(&path).unwrap();
        let seen = Rc::new(Cell::new(None));
        let _sub = {
            let seen = Rc::clone(&seen);
            settings.connect(Key::AutoModeOnSuspend, move |v| seen.set(Some(v)))
        };
        fs::write(&path, r#"{"auto-mode-on-suspend": true}"#).unwrap();
        settings.reload().unwrap();
        assert_eq!(seen.get(), Some(true));
        assert!(settings.get(Key::AutoModeOnSuspend));
    }

    #[test]
    fn key_names() {
        assert_eq!(Key::ShowTemperature.to_string(), "show-temperature");
        assert_eq!(
            Key::from_str("auto-mode-on-suspend").unwrap(),
            Key::AutoModeOnSuspend
        );
        assert!(Key::from_str("show_temperature").is_err());
    }
}
