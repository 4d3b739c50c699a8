//! Fan monitor loop

use std::{
    io::{self, BufRead as _},
    sync::mpsc,
    thread,
    time::Duration,
};

use anyhow::Context as _;
use strum::IntoEnumIterator as _;

use crate::{
    cl,
    controller::FanController,
    exit::ExitHook,
    fan::Position,
    poller::Poller,
    presentation::Presentation,
    settings::{Key, Subscription},
};

/// Monitor loop event
#[derive(Clone, Debug)]
enum Event {
    /// Periodic refresh
    Tick,
    /// Setting changed
    Setting(Key, bool),
    /// User command
    Input(Input),
    /// Termination requested
    Exit,
}

/// Interactive user command
#[derive(Clone, Debug)]
enum Input {
    /// Set level at position
    Level(Position),
    /// Switch back to automatic mode
    Emergency,
    /// Refresh now
    Refresh,
}

/// Parse an interactive command line
fn parse_input(line: &str) -> Result<Event, &'static str> {
    match line.trim() {
        "emergency" => Ok(Event::Input(Input::Emergency)),
        "refresh" => Ok(Event::Input(Input::Refresh)),
        "quit" | "q" => Ok(Event::Exit),
        s => s
            .parse::<cl::LevelArg>()
            .map(|l| Event::Input(Input::Level(l.0))),
    }
}

/// Read interactive commands from stdin, until it is closed
fn spawn_input_reader(tx: mpsc::Sender<Event>) -> anyhow::Result<()> {
    thread::Builder::new()
        .name("input".to_owned())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_input(&line) {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => log::warn!("{e}"),
                }
            }
        })
        .context("Failed to start input thread")?;
    Ok(())
}

/// Log presentation changes
fn report(current: &Presentation, previous: Option<&Presentation>) {
    if previous.is_some_and(|p| p.warning) && !current.warning {
        log::info!("Fan back to a safe level");
    }
    if current.warning && !previous.is_some_and(|p| p.warning) {
        log::warn!(
            "{}: {} Enter 'emergency' or run 'set auto' to switch to automatic mode.",
            current.status,
            current.description
        );
    }
    let temp = current
        .temperature
        .as_ref()
        .map_or_else(String::new, |t| format!(", {t}"));
    log::info!("{}, {}{temp}", current.status, current.level);
    log::debug!("Icon: {}, slider: {}", current.icon, current.slider);
}

/// Process events until exit is requested or every sender is gone
fn process_events(controller: &mut FanController, rx: &mpsc::Receiver<Event>) {
    let mut last = Presentation::new(controller);
    report(&last, None);

    for event in rx {
        log::trace!("Event: {event:?}");
        match event {
            Event::Tick => {
                if let Err(e) = controller.settings().reload() {
                    log::warn!("Failed to reload settings: {e:#}");
                }
                controller.refresh();
                controller.refresh_temperature();
            }
            Event::Setting(key, value) => {
                if key == Key::ShowTemperature && value {
                    controller.refresh_temperature();
                }
            }
            Event::Input(Input::Level(position)) => {
                // Failures are already notified
                let _ = controller.set_level(position.index());
            }
            Event::Input(Input::Emergency) => {
                let _ = controller.emergency_auto();
            }
            Event::Input(Input::Refresh) => {
                controller.refresh();
                controller.refresh_temperature();
            }
            Event::Exit => {
                log::info!("Exiting");
                break;
            }
        }

        let current = Presentation::new(controller);
        if current != last {
            report(&current, Some(&last));
            last = current;
        }
    }
}

/// Run the monitor loop until termination is requested
pub(crate) fn run(
    controller: FanController,
    interval: Duration,
    interactive: bool,
) -> anyhow::Result<()> {
    let (tx, rx) = mpsc::channel::<Event>();
    {
        let tx = tx.clone();
        ctrlc::set_handler(move || {
            let _ = tx.send(Event::Exit);
        })
        .context("Failed to setup SIGINT handler")?;
    }

    let _subscriptions: Vec<Subscription> = Key::iter()
        .map(|key| {
            let tx = tx.clone();
            controller.settings().connect(key, move |value| {
                let _ = tx.send(Event::Setting(key, value));
            })
        })
        .collect();

    let mut controller = ExitHook::new(controller);
    let poller = Poller::start(interval, tx.clone(), Event::Tick)?;
    if interactive {
        spawn_input_reader(tx.clone())?;
    }
    drop(tx);

    process_events(&mut controller, &rx);

    drop(poller);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        controller::Availability,
        settings::Settings,
        tests::{FakeDriver, FakeWriter, RecordingNotifier, WriterBehavior},
    };

    /// Build a controller on a fake driver, with the given settings
    fn controller(driver: &FakeDriver, settings: &Rc<Settings>) -> (FanController, FakeWriter) {
        let writer = FakeWriter::new(WriterBehavior::Hardware);
        let controller = FanController::new(
            driver.files(),
            Box::new(writer.clone()),
            Box::new(RecordingNotifier::default()),
            Rc::clone(settings),
        );
        (controller, writer)
    }

    /// Queue events, then process them all
    fn process(controller: &mut FanController, events: Vec<Event>) {
        let (tx, rx) = mpsc::channel();
        for event in events {
            tx.send(event).unwrap();
        }
        drop(tx);
        process_events(controller, &rx);
    }

    #[test]
    fn tick_refreshes() {
        let driver = FakeDriver::new();
        driver.set_fan("status: enabled\nspeed: 2800\nlevel: 2\n");
        driver.set_thermal("temperatures:\t48 0 0 0\n");
        let settings = Rc::new(Settings::in_memory());
        let (mut controller, writer) = controller(&driver, &settings);
        assert_eq!(controller.state().availability, Availability::Loading);

        process(&mut controller, vec![Event::Tick]);
        assert_eq!(controller.state().availability, Availability::Available);
        assert_eq!(controller.state().status.current_position.index(), 3);
        assert_eq!(controller.temperature(), Some(48));

        driver.set_fan("status: enabled\nlevel: auto\n");
        process(&mut controller, vec![Event::Input(Input::Refresh)]);
        assert_eq!(controller.state().status.current_position, Position::AUTO);
        assert!(writer.commands().is_empty());
    }

    #[test]
    fn tick_reloads_settings() {
        let driver = FakeDriver::new();
        driver.set_fan("status: enabled\nlevel: auto\n");
        driver.set_thermal("temperatures:\t48 0 0 0\n");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"show-temperature": false}"#).unwrap();
        let settings = Rc::new(Settings::load(&path).unwrap());
        let (mut controller, _writer) = controller(&driver, &settings);

        process(&mut controller, vec![Event::Tick]);
        assert_eq!(controller.temperature(), None);

        std::fs::write(&path, r#"{"show-temperature": true}"#).unwrap();
        process(&mut controller, vec![Event::Tick]);
        assert!(settings.get(Key::ShowTemperature));
        assert_eq!(controller.temperature(), Some(48));
    }

    #[test]
    fn show_temperature_setting() {
        let driver = FakeDriver::new();
        driver.set_fan("status: enabled\nlevel: auto\n");
        driver.set_thermal("temperatures:\t61 0 0 0\n");
        let settings = Rc::new(Settings::in_memory());
        settings.set(Key::ShowTemperature, false).unwrap();
        let (mut controller, _writer) = controller(&driver, &settings);

        process(&mut controller, vec![Event::Tick]);
        assert_eq!(controller.temperature(), None);

        settings.set(Key::ShowTemperature, true).unwrap();
        process(
            &mut controller,
            vec![Event::Setting(Key::ShowTemperature, true)],
        );
        assert_eq!(controller.temperature(), Some(61));
    }

    #[test]
    fn emergency_and_exit() {
        let driver = FakeDriver::new();
        driver.set_fan("status: disengaged\nspeed: 5600\nlevel: disengaged\n");
        let settings = Rc::new(Settings::in_memory());
        settings.set(Key::AutoModeOnSuspend, true).unwrap();
        let (controller, writer) = controller(&driver, &settings);
        let mut controller = ExitHook::new(controller);

        process(
            &mut controller,
            vec![
                Event::Tick,
                Event::Input(Input::Emergency),
                Event::Input(Input::Level(Position::MAX)),
                Event::Exit,
                // Not processed
                Event::Input(Input::Level(Position::AUTO)),
            ],
        );
        assert_eq!(writer.commands(), vec!["level auto", "level 7"]);
        assert!(!controller.state().status.disengaged);
        assert_eq!(controller.state().status.current_position, Position::MAX);

        drop(controller);
        assert_eq!(writer.commands(), vec!["level auto", "level 7", "level auto"]);
        assert!(driver.fan_content().contains("level:\t\tauto"));
    }

    #[test]
    fn interactive_commands() {
        assert!(matches!(parse_input("quit"), Ok(Event::Exit)));
        assert!(matches!(
            parse_input(" emergency "),
            Ok(Event::Input(Input::Emergency))
        ));
        assert!(matches!(
            parse_input("auto"),
            Ok(Event::Input(Input::Level(Position::AUTO)))
        ));
        assert!(matches!(
            parse_input("7"),
            Ok(Event::Input(Input::Level(Position::MAX)))
        ));
        assert!(parse_input("full-speed").is_err());
        assert!(parse_input("9").is_err());
    }
}
