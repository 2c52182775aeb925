//! The hosted auth/data service as seen by the session store.

use crate::types::{AuthEvent, RecordTable, Registration, RegistrationMetadata, Session};
use crate::AuthResult;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

/// Backend collaborator: authentication, session lifecycle and record reads.
///
/// Implementations publish [`AuthEvent`]s for every credential change they
/// make, including ones the store did not ask for (token refresh, expiry).
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Sign in with email and password. The returned session embeds the identity.
    async fn authenticate(&self, email: &str, password: &str) -> AuthResult<Session>;

    /// Create an account.
    async fn register(
        &self,
        email: &str,
        password: &str,
        metadata: &RegistrationMetadata,
    ) -> AuthResult<Registration>;

    /// Invalidate the current session, locally and on the server.
    async fn invalidate_session(&self) -> AuthResult<()>;

    /// Fetch the single row of `table` whose id is `key`.
    async fn fetch_record(&self, table: RecordTable, key: &str) -> AuthResult<Value>;

    /// Subscribe to auth state changes.
    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent>;

    /// Adopt a session persisted by a previous run, refreshing it first when
    /// it is expired or about to expire. Returns the session now in use.
    async fn restore_session(&self, session: Session) -> AuthResult<Session>;
}
