//! File input/output.

pub mod nek;
pub mod storage;
pub mod utils;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Little- or big-endian byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// How much non-critical information to print.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Messages,
    Progress,
}

impl Verbosity {
    /// Whether status messages should be printed.
    pub fn print_messages(&self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Whether progress bars should be shown.
    pub fn show_progress(&self) -> bool {
        matches!(self, Self::Progress)
    }

    /// Creates a progress bar with the given length, hidden unless
    /// progress output is enabled.
    pub fn create_progress_bar(&self, len: usize) -> ProgressBar {
        if self.show_progress() {
            let style = ProgressStyle::with_template("Progress: {bar:40}  {percent}% | ETA: {eta}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            ProgressBar::new(len as u64).with_style(style)
        } else {
            ProgressBar::with_draw_target(Some(len as u64), ProgressDrawTarget::hidden())
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Self::Quiet
    }
}
