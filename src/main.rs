//! Display and control ThinkPad fan level

use std::rc::Rc;

use anyhow::Context as _;
use clap::Parser as _;
use strum::IntoEnumIterator as _;

mod cl;
mod controller;
mod elevate;
mod exit;
mod fan;
mod monitor;
mod notify;
mod poller;
mod presentation;
mod procfs;
mod settings;
mod thermal;

use crate::{
    controller::FanController,
    elevate::CommandElevator,
    presentation::Presentation,
    procfs::DriverFiles,
    settings::{Key, Settings},
};

/// Build controller from command line arguments, with initial state loaded
fn build_controller(args: &cl::Args, settings: &Rc<Settings>) -> anyhow::Result<FanController> {
    let files = DriverFiles::new(&args.fan, &args.thermal).context("Invalid driver files")?;
    let writer = CommandElevator::new(args.elevate.0.clone(), args.write_timeout.into());
    let mut controller = FanController::new(
        files,
        Box::new(writer),
        args.notify.notifier(),
        Rc::clone(settings),
    );
    controller.refresh();
    controller.refresh_temperature();
    Ok(controller)
}

/// Run settings subcommand
fn settings_command(settings: &Settings, action: &cl::SettingsAction) -> anyhow::Result<()> {
    match action {
        cl::SettingsAction::List => {
            for key in Key::iter() {
                println!("{key}: {}", settings.get(key));
            }
        }
        cl::SettingsAction::Get { key } => {
            println!("{}", settings.get(*key));
        }
        cl::SettingsAction::Set { key, value } => {
            settings
                .set(*key, *value)
                .with_context(|| format!("Failed to set {key}"))?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Parse cl args
    let args = cl::Args::parse();

    // Init logger
    simple_logger::init_with_level(args.verbosity).context("Failed to init logger")?;

    let settings_path = match &args.settings {
        Some(p) => p.to_owned(),
        None => settings::default_path()?,
    };
    let settings = Rc::new(
        Settings::load(&settings_path)
            .with_context(|| format!("Failed to load settings from {settings_path:?}"))?,
    );

    match &args.command {
        cl::Command::Status => {
            let controller = build_controller(&args, &settings)?;
            println!("{}", Presentation::new(&controller));
        }
        cl::Command::Set { level } => {
            let mut controller = build_controller(&args, &settings)?;
            controller
                .set_level(level.0.index())
                .context("Failed to set fan level")?;
            println!("{}", Presentation::new(&controller));
        }
        cl::Command::Slide { fraction } => {
            let mut controller = build_controller(&args, &settings)?;
            let position = fan::fraction_to_position(*fraction);
            log::debug!("Slider value {fraction} snapped to position {position}");
            controller
                .set_level(position.index())
                .context("Failed to set fan level")?;
            println!("{}", Presentation::new(&controller));
        }
        cl::Command::Monitor {
            interval,
            interactive,
        } => {
            let controller = build_controller(&args, &settings)?;
            monitor::run(controller, (*interval).into(), *interactive)?;
        }
        cl::Command::Settings { action } => {
            settings_command(&settings, action)?;
        }
    }

    Ok(())
}
