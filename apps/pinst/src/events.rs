//! Event handling and progress display

use crate::display::format_size;
use crate::logging::log_event_with_tracing;
use console::{Style, Term};
use pinst_events::{
    AppEvent, DownloadEvent, GeneralEvent, InstallEvent, ResolveEvent, VerifyEvent,
};
use pinst_types::SmokeTestOutcome;

/// Turns pipeline events into status lines on stderr and tracing records
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// No status lines (JSON mode)
    quiet: bool,
    correlation_id: String,
    /// Status lines written so far
    shown: usize,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
            correlation_id: String::new(),
            shown: 0,
        }
    }

    /// Tag every mirrored event with this id (usually the command name and identifier)
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        let meta = event.meta().with_correlation_id(self.correlation_id.clone());
        log_event_with_tracing(&event, &meta);

        if self.quiet {
            return;
        }

        match event {
            AppEvent::Resolve(ResolveEvent::Started {
                identifier,
                selector,
            }) => self.show_status(&format!("Resolving {identifier} ({selector})")),
            AppEvent::Resolve(ResolveEvent::Completed {
                identifier,
                version,
                url,
                ..
            }) => self.show_status(&format!("Resolved {identifier} {version} -> {url}")),

            AppEvent::Download(DownloadEvent::Started {
                url, attempt: 1, ..
            }) => self.show_status(&format!("Downloading {url}")),
            AppEvent::Download(DownloadEvent::Retrying {
                attempt,
                max_attempts,
                reason,
                backoff_delay,
                ..
            }) => self.show_warning(&format!(
                "Attempt {attempt}/{max_attempts} failed ({reason}); retrying in {:.1}s",
                backoff_delay.as_secs_f64()
            )),
            AppEvent::Download(DownloadEvent::Completed {
                final_size,
                total_time,
                ..
            }) => self.show_status(&format!(
                "Downloaded {} in {:.1}s",
                format_size(final_size),
                total_time.as_secs_f64()
            )),

            AppEvent::Verify(VerifyEvent::Verified { checksum, .. }) => {
                self.show_success(&format!("Checksum verified ({checksum})"));
            }
            AppEvent::Verify(VerifyEvent::Unverified { digest, .. }) => {
                self.show_warning(&format!("No checksum pinned; archive digest is {digest}"));
            }

            AppEvent::Install(InstallEvent::Placed { path, replaced, .. }) => {
                let verb = if replaced { "Replaced" } else { "Installed" };
                self.show_success(&format!("{verb} {}", path.display()));
            }
            AppEvent::Install(InstallEvent::SmokeTestStarted { path, args }) => {
                self.show_status(&format!("Running {} {}", path.display(), args.join(" ")));
            }
            AppEvent::Install(InstallEvent::SmokeTestCompleted { outcome, .. }) => match outcome {
                SmokeTestOutcome::Passed => self.show_success("Smoke test passed"),
                SmokeTestOutcome::Failed { reason } => {
                    self.show_warning(&format!("Smoke test failed: {reason}"));
                }
                SmokeTestOutcome::Skipped => {}
            },

            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                match context {
                    Some(context) => self.show_warning(&format!("{message} ({context})")),
                    None => self.show_warning(&message),
                }
            }
            AppEvent::General(GeneralEvent::DebugLog { message, .. }) if self.debug_enabled => {
                self.show_status(&message);
            }

            // Failures are reported once, by the caller, with the exit code
            _ => {}
        }
    }

    /// Number of status lines shown
    pub fn shown(&self) -> usize {
        self.shown
    }

    fn styled(&self, style: &Style, message: &str) -> String {
        if self.colors_enabled {
            style.apply_to(message).to_string()
        } else {
            message.to_string()
        }
    }

    fn write_line(&mut self, line: &str) {
        if self.term.write_line(line).is_ok() {
            self.shown += 1;
        }
    }

    /// Show status message
    fn show_status(&mut self, message: &str) {
        let line = self.styled(&Style::new().dim(), message);
        self.write_line(&line);
    }

    fn show_success(&mut self, message: &str) {
        let line = self.styled(&Style::new().green(), message);
        self.write_line(&line);
    }

    fn show_warning(&mut self, message: &str) {
        let line = format!("{} {message}", self.styled(&Style::new().yellow().bold(), "warning:"));
        self.write_line(&line);
    }
}
