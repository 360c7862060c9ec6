//! Robot routines built on the controllers.
//!
//! - `maneuver`: serde-tagged maneuver steps and the script runner
//! - `session`: menu session state (replaces the old global flags)
//! - `self_test`: motor and claw check
//! - `start_light`: wait for the CdS cell to see the start light

pub mod maneuver;
pub mod self_test;
pub mod session;
pub mod start_light;

use core::fmt::Write;

use heapless::String;

use crate::utils::{controllers::Outcome, platform::StatusDisplay};

pub use maneuver::{run_script, Maneuver, ScriptReport, DEFAULT_COURSE};
pub use self_test::self_test;
pub use session::{MenuAction, SessionState};

/// Longest line the status screen shows.
pub const LINE_LEN: usize = 64;

/// Write `"<label>: <outcome>"` on the display. Long lines are truncated.
pub fn report<S: StatusDisplay + ?Sized>(
    display: &mut S,
    label: &str,
    outcome: Outcome,
) {
    let mut line: String<LINE_LEN> = String::new();
    // overflow only truncates the line
    let _ = write!(line, "{label}: {outcome}");
    display.write_line(&line);
}
