//! Credential state machine for the backend client, using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐  SignInSuccess / SessionRestored
//! │    SignedOut    │ ───────────────────────────────┐
//! └─────────────────┘                                ▼
//!          ▲                                ┌─────────────────┐
//!          │ SignOutComplete                │    SignedIn     │ ◄─┐ SignInSuccess /
//! ┌────────┴────────┐   SignOutRequested    └───┬─────────┬───┘ ──┘ SessionRestored
//! │   SigningOut    │ ◄─────────────────────────┘         │
//! └─────────────────┘                                      │ TokenExpiring
//!          │ SignOutFailed ──► SignedIn                    ▼
//!                                               ┌─────────────────┐
//!        RefreshFailed ──► SignedOut            │   Refreshing    │ ◄─┐ RefreshRetry
//!        RefreshSuccess ──► SignedIn            └─────────────────┘ ──┘
//!        SignOutRequested ──► SigningOut
//! ```
//!
//! A sign-out may interrupt a refresh; the refresh result is then discarded.
//!
//! Entering `SignedIn` publishes `SIGNED_IN`; entering `SignedOut` publishes
//! `SIGNED_OUT`. The client does that, not the machine.

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub credential_machine(SignedOut)

    SignedOut => {
        SignInSuccess => SignedIn,
        SessionRestored => SignedIn
    },
    SignedIn => {
        SignInSuccess => SignedIn,
        SessionRestored => SignedIn,
        TokenExpiring => Refreshing,
        SignOutRequested => SigningOut
    },
    Refreshing => {
        RefreshSuccess => SignedIn,
        RefreshRetry => Refreshing,
        RefreshFailed => SignedOut,
        SignOutRequested => SigningOut
    },
    SigningOut => {
        SignOutComplete => SignedOut,
        SignOutFailed => SignedIn
    }
}

pub use credential_machine::Input as CredentialInput;
pub use credential_machine::State as CredentialMachineState;
pub use credential_machine::StateMachine as CredentialMachine;

/// Simplified view of the machine state for callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialState {
    SignedOut,
    SignedIn,
    Refreshing,
    SigningOut,
}

impl CredentialState {
    /// Returns true if a session is held and usable.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, CredentialState::SignedIn)
    }

    /// Returns true if an operation is in progress.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CredentialState::Refreshing | CredentialState::SigningOut
        )
    }
}

impl From<&CredentialMachineState> for CredentialState {
    fn from(state: &CredentialMachineState) -> Self {
        match state {
            CredentialMachineState::SignedOut => CredentialState::SignedOut,
            CredentialMachineState::SignedIn => CredentialState::SignedIn,
            CredentialMachineState::Refreshing => CredentialState::Refreshing,
            CredentialMachineState::SigningOut => CredentialState::SigningOut,
        }
    }
}

/// Retry and scheduling settings for token refresh.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Maximum number of attempts per refresh.
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// How often the auto-refresh task checks the session.
    pub check_interval: Duration,
    /// Refresh once the session expires within this window.
    pub expiry_margin: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
            check_interval: Duration::from_secs(30),
            expiry_margin: Duration::from_secs(90),
        }
    }
}

impl RefreshConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .initial_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}
