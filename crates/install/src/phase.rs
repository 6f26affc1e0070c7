use pinst_errors::{Error, InstallError};
use pinst_events::{AppEvent, EventEmitter, EventSender, InstallEvent};
use pinst_types::{FailureKind, InstallPhase};

/// Drives one install through its phases, emitting an event per transition
#[derive(Debug)]
pub struct PhaseTracker {
    package: String,
    phase: InstallPhase,
    events: Option<EventSender>,
}

impl PhaseTracker {
    #[must_use]
    pub fn new(package: impl Into<String>, events: Option<EventSender>) -> Self {
        Self {
            package: package.into(),
            phase: InstallPhase::Pending,
            events,
        }
    }

    #[must_use]
    pub fn phase(&self) -> InstallPhase {
        self.phase
    }

    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    pub(crate) fn events(&self) -> &Option<EventSender> {
        &self.events
    }

    /// Move to `next`
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` for anything but the single forward step
    /// or a failure from a non-terminal phase.
    pub fn advance(&mut self, next: InstallPhase) -> Result<(), Error> {
        if !self.phase.can_advance_to(next) {
            return Err(InstallError::InvalidTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            }
            .into());
        }
        let from = std::mem::replace(&mut self.phase, next);
        tracing::debug!(package = %self.package, %from, to = %next, "install phase");
        self.events.emit(AppEvent::Install(InstallEvent::PhaseChanged {
            package: self.package.clone(),
            from,
            to: next,
        }));
        Ok(())
    }

    /// Record a failure. A tracker that already finished keeps its phase.
    pub fn fail(&mut self, kind: FailureKind) {
        if self.advance(InstallPhase::Failed(kind)).is_err() {
            tracing::debug!(package = %self.package, phase = %self.phase, "failure after terminal phase ignored");
        }
    }
}
