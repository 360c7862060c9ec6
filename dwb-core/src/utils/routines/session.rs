//! Menu session state.
//!
//! The menu screen used to steer the program through two globals (stay in the
//! menu, verbose output). They now live in a small value that the menu layer
//! threads through each action.

use serde::{Deserialize, Serialize};

/// Actions offered by the operator menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    /// Run the motor and claw self test.
    Test,
    /// Leave the menu and start the course.
    Run,
    /// Toggle verbose status output.
    Verbose,
    /// Hand over to the platform's sensor calibration screen.
    Calibrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Still showing the menu.
    pub in_menu: bool,
    /// Report every maneuver step, not just failures.
    pub verbose: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            in_menu: true,
            verbose: false,
        }
    }
}

impl SessionState {
    /// State after `action`. `Test` and `Calibrate` are dispatched by the
    /// caller and leave the state unchanged.
    pub fn apply(
        self,
        action: MenuAction,
    ) -> Self {
        match action {
            MenuAction::Run => Self {
                in_menu: false,
                ..self
            },
            MenuAction::Verbose => Self {
                verbose: !self.verbose,
                ..self
            },
            MenuAction::Test | MenuAction::Calibrate => self,
        }
    }

    /// Label for the verbose toggle.
    pub fn verbose_label(&self) -> &'static str {
        if self.verbose {
            "VERBOSE"
        } else {
            "QUIET"
        }
    }

    /// Menu icon labels in display order.
    pub fn menu_labels(&self) -> [&'static str; 4] {
        ["TEST", "RUN", self.verbose_label(), "CALIBRATE"]
    }
}
