//! Domain types shared by the backend client and the session store.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The authenticated principal as known to the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
}

/// Credential pair proving an [`Identity`] is signed in.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds as reported when the session was issued.
    pub expires_in: i64,
    /// Absolute expiry as a unix timestamp (seconds).
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: Identity,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("user", &self.user.id)
            .finish()
    }
}

impl Session {
    /// Fill in `expires_at` from `expires_in` when the server omitted it.
    ///
    /// An `expires_in` too large to represent leaves the expiry unknown.
    pub fn with_expiry_from(mut self, issued_at: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Duration::try_seconds(self.expires_in)
                .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
                .map(|expires_at| expires_at.timestamp());
        }
        self
    }

    /// Absolute expiry, if known.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }

    /// Whether the session expires within `margin` of `now`.
    ///
    /// A session without a known expiry never counts as expiring.
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at_utc()
            .map(|expires_at| expires_at - now <= margin)
            .unwrap_or(false)
    }
}

/// Role of a user inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Owner,
    Admin,
    Editor,
    Viewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
            UserRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organization-scoped metadata for an identity. `id` equals the identity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub organization_id: String,
    pub role: UserRole,
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tenant owning profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub settings: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Auth state changes pushed by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
}

impl AuthEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::SignedIn(_) => "SIGNED_IN",
            AuthEvent::SignedOut => "SIGNED_OUT",
        }
    }
}

/// Metadata attached to a new account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationMetadata {
    pub full_name: String,
    pub organization_name: String,
}

/// Answer to a registration request.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub identity: Option<Identity>,
    pub session: Option<Session>,
    /// The account exists but must be confirmed by email before signing in.
    pub pending_verification: bool,
}

/// Result of a successful sign-up, as seen by callers of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Signed in straight away.
    Created,
    /// Confirmation email sent; nothing is signed in yet.
    PendingVerification,
}

/// Backend tables the store reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordTable {
    Profiles,
    Organizations,
}

impl RecordTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            RecordTable::Profiles => "user_profiles",
            RecordTable::Organizations => "organizations",
        }
    }
}

impl fmt::Display for RecordTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// The durable part of the auth state, stored as one blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedAuth {
    pub identity: Option<Identity>,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub organization: Option<Organization>,
}
