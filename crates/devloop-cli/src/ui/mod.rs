//! Terminal output: status lines and the build output table.
//!
//! # Examples
//!
//! ```no_run
//! use devloop_cli::ui;
//!
//! ui::init(false, false);
//! ui::success("Build finished");
//! ui::error("Build command failed");
//! assert_eq!(ui::convert_bytes(1536), "1.5 KB");
//! ```

mod format;
mod messages;

pub use format::{convert_bytes, print_build_output};
pub use messages::{error, info, success, warning};

use std::sync::atomic::{AtomicBool, Ordering};

static QUIET: AtomicBool = AtomicBool::new(false);
static COLORS: AtomicBool = AtomicBool::new(true);

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR, falls back to terminal detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    console::user_attended_stderr()
}

/// Apply the global output flags.
///
/// `quiet` hides everything but errors. Colors are off when `no_color` is
/// set or [`should_use_color`] says so.
pub fn init(quiet: bool, no_color: bool) {
    QUIET.store(quiet, Ordering::Relaxed);

    let colors = !no_color && should_use_color();
    COLORS.store(colors, Ordering::Relaxed);
    if !colors {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
}

pub(crate) fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

pub(crate) fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}
