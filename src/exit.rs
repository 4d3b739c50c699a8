//! Exit hook to put the fan back in automatic mode

use std::ops::{Deref, DerefMut};

use crate::{controller::FanController, fan::Position, settings::Key};

/// Owns the controller, and switches the fan to automatic mode when dropped if
/// `auto-mode-on-suspend` is set at that time
pub(crate) struct ExitHook {
    /// Wrapped controller
    controller: FanController,
}

impl ExitHook {
    /// Wrap controller
    pub(crate) fn new(controller: FanController) -> Self {
        Self { controller }
    }
}

impl Deref for ExitHook {
    type Target = FanController;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}

impl DerefMut for ExitHook {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.controller
    }
}

impl Drop for ExitHook {
    fn drop(&mut self) {
        if !self.controller.settings().get(Key::AutoModeOnSuspend) {
            return;
        }
        self.controller.refresh();
        let status = &self.controller.state().status;
        if status.current_position == Position::AUTO && !status.disengaged {
            log::debug!("Fan already in automatic mode");
            return;
        }
        log::info!("Switching fan to automatic mode before exiting");
        if let Err(e) = self.controller.set_level(Position::AUTO.index()) {
            log::error!("Failed to restore automatic fan mode: {e}");
        }
    }
}
