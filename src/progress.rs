//! Progress indicators for ecdeploy CLI.

use crate::ui;
use cloudapi::poller::{PollObserver, PollState};
use cloudapi::retry::RetryCallback;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Start a spinner with a message. Hidden when `quiet`.
pub fn spinner(msg: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Clear the spinner and print a success line
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    ui::success(msg);
}

/// Clear the spinner and print an error line
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    pb.finish_and_clear();
    ui::error(msg);
}

/// Clear the spinner without printing anything
pub fn finish_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}

/// Feeds poller progress into a spinner.
pub struct SpinnerObserver {
    pb: ProgressBar,
    action: String,
}

impl SpinnerObserver {
    pub fn new(pb: ProgressBar, action: impl Into<String>) -> Self {
        Self {
            pb,
            action: action.into(),
        }
    }
}

impl RetryCallback for SpinnerObserver {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &cloudapi::Error, delay: Duration) {
        self.pb.set_message(format!(
            "{}: read failed ({attempt}/{max_attempts}), retrying in {}s: {error}",
            self.action,
            delay.as_secs()
        ));
    }
}

impl PollObserver for SpinnerObserver {
    fn on_state(&self, poll: u32, elapsed: Duration, state: &PollState) {
        self.pb.set_message(format!(
            "{}: {} [{}s, poll {poll}]",
            self.action,
            describe_state(state),
            elapsed.as_secs()
        ));
    }
}

fn describe_state(state: &PollState) -> String {
    match state {
        PollState::Pending => "waiting for resources".to_string(),
        PollState::Applying { components } => format!("applying {}", ui::join_or_dash(components)),
        PollState::Stable => "stable".to_string(),
        PollState::Failed { kind, .. } => format!("{kind} failed"),
    }
}
