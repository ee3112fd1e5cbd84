use indicatif::{ProgressBar, ProgressState, ProgressStyle};

use crate::cli::color::*;

impl super::Cli {
    /// Creates a progress spinner that plays nicely with logging.
    pub(crate) fn new_spinner(&self) -> ProgressBar {
        fn elapsed_decimal(state: &ProgressState, w: &mut dyn std::fmt::Write) {
            let secs = state.elapsed().as_secs_f64();
            write!(w, "[{secs:.1}s]").unwrap();
        }
        fn current_timestamp(_state: &ProgressState, w: &mut dyn std::fmt::Write) {
            write!(w, "{}", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")).unwrap();
        }

        // The template is a constant, so this only fails on a typo.
        let style = ProgressStyle::with_template(
            "{current_timestamp:.dim} {elapsed_decimal:<8.dim} {msg:.blue} {spinner:.cyan/blue}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .with_key("elapsed_decimal", elapsed_decimal)
        .with_key("current_timestamp", current_timestamp)
        .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓", ""]);

        self.multiprogress
            .add(ProgressBar::new_spinner().with_style(style))
    }
}

pub(crate) trait ProgressExt {
    fn finish_with_failed(&self);
    fn finish_with_done(&self);
    fn finish_with_cancelled(&self);
    fn finish_with_append(&self, msg: impl std::fmt::Display);
}

impl ProgressExt for ProgressBar {
    fn finish_with_failed(&self) {
        self.finish_with_append(FAILED)
    }

    fn finish_with_done(&self) {
        self.finish_with_append(DONE)
    }

    fn finish_with_cancelled(&self) {
        self.finish_with_append(CANCELLED)
    }

    fn finish_with_append(&self, msg: impl std::fmt::Display) {
        self.finish_with_message(format!("{} {msg}", self.message()));
    }
}
