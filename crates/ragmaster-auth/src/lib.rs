//! Authentication and session lifecycle for RAG Master.
//!
//! This crate provides:
//! - `SessionStore`: the auth state (identity, session, profile, organization,
//!   UI flags) with its operations and local persistence
//! - `SupabaseBackend`: the hosted auth/data service client with automatic
//!   token refresh
//! - An explicit FSM for the client's credential lifecycle
//! - The view router that picks the top-level view from the auth state

mod auth_fsm;
mod backend;
mod error;
mod persist;
mod store;
mod subscription;
mod supabase;
mod types;
pub mod view_router;

#[cfg(test)]
mod testing;

pub use auth_fsm::credential_machine;
pub use auth_fsm::{
    CredentialInput, CredentialMachine, CredentialMachineState, CredentialState, RefreshConfig,
};
pub use backend::AuthBackend;
pub use error::{AuthError, AuthResult};
pub use store::{AuthState, SessionStore, DEFAULT_ORGANIZATION_NAME};
pub use subscription::AuthEventSubscription;
pub use supabase::{AutoRefresh, SupabaseBackend};
pub use types::{
    AuthEvent, Identity, Organization, PersistedAuth, Profile, RecordTable, Registration,
    RegistrationMetadata, Session, SignUpOutcome, UserRole,
};
pub use view_router::{RouteInputs, View};
