use core_types::{ActivationStatus, CommandKind};
use tokio::time::{Duration, Instant};

/// The outcome of applying one operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Stopped,
    /// The engine was already in the requested state.
    Unchanged(ActivationStatus),
    /// The command does not touch the activation state.
    Ignored,
}

/// Gates the engine on operator commands, with a one-shot auto-start.
///
/// The engine boots `Stopped`. Unless an operator starts it before the grace
/// deadline, the first `poll_grace` at or after the deadline activates it. After
/// that, or once a command has changed the state, time alone never changes it again.
#[derive(Debug, Clone)]
pub struct ActivationController {
    status: ActivationStatus,
    grace_deadline: Option<Instant>,
}

impl ActivationController {
    pub fn new(grace: Duration, now: Instant) -> Self {
        Self {
            status: ActivationStatus::Stopped,
            grace_deadline: Some(now + grace),
        }
    }

    pub fn status(&self) -> ActivationStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Whether the auto-start can still fire.
    pub fn is_armed(&self) -> bool {
        self.grace_deadline.is_some()
    }

    /// Time left before the auto-start, if it is still armed.
    pub fn remaining_grace(&self, now: Instant) -> Option<Duration> {
        self.grace_deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Fires the auto-start once the deadline has passed. Returns `true` only on
    /// the call that performed the transition.
    pub fn poll_grace(&mut self, now: Instant) -> bool {
        match self.grace_deadline {
            Some(deadline) if now >= deadline => {
                self.grace_deadline = None;
                if self.status.is_active() {
                    return false;
                }
                self.status = ActivationStatus::Active;
                true
            }
            _ => false,
        }
    }

    /// Applies a command. Only a command that changes the state disarms the auto-start,
    /// so a `stop` while still stopped leaves the grace deadline in place.
    pub fn apply(&mut self, kind: CommandKind) -> Transition {
        let target = match kind {
            CommandKind::Start => ActivationStatus::Active,
            CommandKind::Stop => ActivationStatus::Stopped,
            CommandKind::Status | CommandKind::Unrecognized => return Transition::Ignored,
        };
        if self.status == target {
            return Transition::Unchanged(target);
        }
        self.grace_deadline = None;
        self.status = target;
        match target {
            ActivationStatus::Active => Transition::Started,
            ActivationStatus::Stopped => Transition::Stopped,
        }
    }
}
