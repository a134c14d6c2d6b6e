use std::cell::RefCell;
use std::fmt::Display;
use std::path::Path;

use colored::{ColoredString, Colorize};

/// Secondary console channels. Machine I/O never goes through here, so stdout only
/// ever carries what the program itself prints.
#[derive(Clone, Copy, Debug)]
pub enum Output {
    /// Toolchain progress lines
    Status,
    /// Per-instruction execution trace
    Trace,
}

#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Cyan,
    Red,
}

impl Output {
    thread_local! {
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    /// Minimal output drops status lines and all color, suited for blackbox tests.
    pub fn set_minimal(new_value: bool) -> bool {
        if new_value {
            colored::control::set_override(false);
        }
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }

    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    pub fn print_str(&self, string: &str) {
        match self {
            Self::Status => {
                if !Self::is_minimal() {
                    eprint!("{}", string);
                }
            }
            // Trace is always shown once enabled
            Self::Trace => eprint!("{}", ColoredString::from(string).blue()),
        }
    }
}

/// Print a right-aligned, colored status line such as `  Assembling target prog.lmc`.
pub fn message(color: MsgColor, left: impl Display, right: impl Display) {
    let left = left.to_string();
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    Output::Status.print_str(&format!("{left:>12} {right}\n"));
}

pub fn file_message(color: MsgColor, left: &str, path: &Path) {
    message(color, left, format!("target {}", path.display()));
}
