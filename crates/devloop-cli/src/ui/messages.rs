//! Status lines on stderr.
//!
//! Every line is a symbol and a message. `--quiet` hides everything except
//! errors; colors follow [`super::init`].

use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Success,
    Info,
    Warning,
    Error,
}

impl Status {
    fn symbol(self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Info => "ℹ",
            Status::Warning => "⚠",
            Status::Error => "✗",
        }
    }

    fn render(self, message: &str, colors: bool) -> String {
        let symbol = self.symbol();
        if !colors {
            return format!("{} {}", symbol, message);
        }
        match self {
            Status::Success => format!("{} {}", symbol.green().bold(), message),
            Status::Info => format!("{} {}", symbol.blue().bold(), message),
            Status::Warning => format!("{} {}", symbol.yellow().bold(), message.yellow()),
            Status::Error => format!("{} {}", symbol.red().bold(), message.red()),
        }
    }
}

fn emit(status: Status, message: &str) {
    if status != Status::Error && super::is_quiet() {
        return;
    }
    eprintln!("{}", status.render(message, super::colors_enabled()));
}

/// Print a success line.
///
/// ```no_run
/// use devloop_cli::ui::success;
///
/// success("Initial build completed");
/// ```
pub fn success(message: &str) {
    emit(Status::Success, message);
}

pub fn info(message: &str) {
    emit(Status::Info, message);
}

pub fn warning(message: &str) {
    emit(Status::Warning, message);
}

/// Print an error line. Shown even with `--quiet`.
pub fn error(message: &str) {
    emit(Status::Error, message);
}
