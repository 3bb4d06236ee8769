//! Server health state machine.
//!
//! # States
//! - Up: server receives new traffic
//! - Down: server excluded from selection until it passes `rise` probes
//! - Draining: operator-forced; existing sessions finish, no new traffic
//! - Maintenance: operator-forced; probes are skipped entirely
//!
//! # State Transitions
//! ```text
//! Probe driven:
//!   Down → Up:   consecutive successes >= rise
//!   Up → Down:   consecutive failures >= fall
//!
//! Administrative:
//!   Up | Down          → Draining     (drain)
//!   Up | Down | Draining → Maintenance (maintenance)
//!   Maintenance        → Down         (release, counters cleared)
//! ```
//!
//! Draining never leaves on a probe outcome. Probes still run and the
//! counters move, but the only exits are Maintenance or removal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health state of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Up,
    Down,
    Draining,
    Maintenance,
}

impl HealthState {
    /// True when the state admits new requests.
    pub fn accepts_new_traffic(self) -> bool {
        matches!(self, HealthState::Up)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Up => "UP",
            HealthState::Down => "DOWN",
            HealthState::Draining => "DRAINING",
            HealthState::Maintenance => "MAINTENANCE",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success,
    Failure,
}

impl From<bool> for ProbeOutcome {
    fn from(healthy: bool) -> Self {
        if healthy {
            ProbeOutcome::Success
        } else {
            ProbeOutcome::Failure
        }
    }
}

/// Operator commands that force a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminCommand {
    /// Stop sending new traffic, let existing sessions finish.
    Drain,
    /// Take the server out of rotation and stop probing it.
    Maintenance,
    /// Leave maintenance. The server re-enters as Down.
    Release,
}

impl AdminCommand {
    /// State the command moves the server into.
    pub fn target(self) -> HealthState {
        match self {
            AdminCommand::Drain => HealthState::Draining,
            AdminCommand::Maintenance => HealthState::Maintenance,
            AdminCommand::Release => HealthState::Down,
        }
    }
}

/// Consecutive-probe thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Successes needed to go Down → Up.
    pub rise: u32,
    /// Failures needed to go Up → Down.
    pub fall: u32,
}

/// A state change, reported so callers can log and count it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthState,
    pub to: HealthState,
}

/// Rejected administrative command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalCommand {
    pub from: HealthState,
    pub to: HealthState,
}

/// Per-server health record: current state plus consecutive counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    state: HealthState,
    consecutive_successes: u32,
    consecutive_failures: u32,
}

impl HealthStatus {
    pub fn new(state: HealthState) -> Self {
        Self {
            state,
            consecutive_successes: 0,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn consecutive_successes(&self) -> u32 {
        self.consecutive_successes
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// True when a probe should be run for this server at all.
    pub fn is_probed(&self) -> bool {
        self.state != HealthState::Maintenance
    }

    /// Feed one probe outcome into the machine.
    ///
    /// Returns the transition when the outcome crossed a threshold.
    /// Maintenance ignores outcomes without touching the counters.
    pub fn observe(&mut self, outcome: ProbeOutcome, thresholds: Thresholds) -> Option<Transition> {
        if self.state == HealthState::Maintenance {
            return None;
        }

        match outcome {
            ProbeOutcome::Success => {
                self.consecutive_failures = 0;
                self.consecutive_successes = self.consecutive_successes.saturating_add(1);
                if self.state == HealthState::Down && self.consecutive_successes >= thresholds.rise {
                    self.consecutive_successes = 0;
                    return Some(self.move_to(HealthState::Up));
                }
            }
            ProbeOutcome::Failure => {
                self.consecutive_successes = 0;
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.state == HealthState::Up && self.consecutive_failures >= thresholds.fall {
                    self.consecutive_failures = 0;
                    return Some(self.move_to(HealthState::Down));
                }
            }
        }
        None
    }

    /// Apply an operator command.
    ///
    /// Repeating the current state is a no-op and returns `Ok(None)`.
    pub fn administer(&mut self, command: AdminCommand) -> Result<Option<Transition>, IllegalCommand> {
        let target = command.target();
        let legal = match (command, self.state) {
            (AdminCommand::Drain, HealthState::Draining) => return Ok(None),
            (AdminCommand::Maintenance, HealthState::Maintenance) => return Ok(None),
            (AdminCommand::Drain, HealthState::Up | HealthState::Down) => true,
            (AdminCommand::Maintenance, _) => true,
            (AdminCommand::Release, HealthState::Maintenance) => true,
            _ => false,
        };

        if !legal {
            return Err(IllegalCommand {
                from: self.state,
                to: target,
            });
        }

        if command == AdminCommand::Release {
            self.consecutive_successes = 0;
            self.consecutive_failures = 0;
        }
        Ok(Some(self.move_to(target)))
    }

    fn move_to(&mut self, to: HealthState) -> Transition {
        let from = self.state;
        self.state = to;
        Transition { from, to }
    }
}
