//! Storage key constants.

/// Storage keys used by the application
pub struct StorageKeys;

impl StorageKeys {
    /// Persisted authentication blob: identity, session, profile, organization.
    pub const AUTH_STORAGE: &'static str = "auth-storage";
}
