//! Session store: the single owner of auth state for the shell.
//!
//! State lives in a `tokio::sync::watch` channel. Every transition is applied
//! inside one `send_modify`, so subscribers never observe a half-applied
//! change (an identity without its session, a profile without its
//! organization). Operations never panic and never hand a raw backend error to
//! the views: failures are recorded in [`AuthState::error`] and also returned
//! to the caller.

use crate::backend::AuthBackend;
use crate::persist::Persister;
use crate::subscription::AuthEventSubscription;
use crate::types::{
    AuthEvent, Identity, Organization, PersistedAuth, Profile, RecordTable, RegistrationMetadata,
    Session, SignUpOutcome,
};
use crate::view_router::{self, RouteInputs, View};
use crate::{AuthError, AuthResult};
use ragmaster_storage::{StateManager, StorageKeys};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

const SIGN_IN_FAILED: &str = "Sign in failed";
const SIGN_UP_FAILED: &str = "Sign up failed";
const SIGN_OUT_FAILED: &str = "Sign out failed";
const PROFILE_LOAD_FAILED: &str = "Failed to load profile";
const MISSING_CREDENTIALS: &str = "Email and password are required";

/// Organization name used when sign-up does not name one.
pub const DEFAULT_ORGANIZATION_NAME: &str = "Personal";

/// Snapshot of the auth state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub identity: Option<Identity>,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub organization: Option<Organization>,
    /// Auth form explicitly requested while signed out.
    pub show_auth: bool,
    /// At least one operation is in flight.
    pub is_loading: bool,
    pub error: Option<String>,
    /// Email address awaiting confirmation after sign-up.
    pub pending_verification: Option<String>,
    generation: u64,
    in_flight: usize,
}

impl AuthState {
    fn from_persisted(blob: PersistedAuth) -> Self {
        let mut state = Self::default();

        match (blob.identity, blob.session) {
            (Some(identity), Some(session)) => {
                state.identity = Some(identity);
                state.session = Some(session);
            }
            (None, None) => return state,
            _ => {
                warn!("Persisted auth state has identity without session, discarding");
                return state;
            }
        }

        let owner = state.identity.as_ref().map(|i| i.id.as_str());
        match (blob.profile, blob.organization) {
            (Some(profile), Some(organization))
                if Some(profile.id.as_str()) == owner
                    && profile.organization_id == organization.id =>
            {
                state.profile = Some(profile);
                state.organization = Some(organization);
            }
            (None, None) => {}
            _ => debug!("Discarding persisted profile that does not match identity"),
        }

        state
    }

    /// The durable part of the state.
    pub fn persisted(&self) -> PersistedAuth {
        PersistedAuth {
            identity: self.identity.clone(),
            session: self.session.clone(),
            profile: self.profile.clone(),
            organization: self.organization.clone(),
        }
    }

    pub fn has_identity(&self) -> bool {
        self.identity.is_some()
    }

    pub fn has_profile(&self) -> bool {
        self.profile.is_some()
    }

    pub fn route_inputs(&self) -> RouteInputs {
        RouteInputs {
            has_identity: self.has_identity(),
            show_auth: self.show_auth,
            has_profile: self.has_profile(),
        }
    }

    /// View the shell should render for this state.
    pub fn view(&self) -> View {
        view_router::select_view(self.route_inputs())
    }

    /// Mirror a signed-in identity. A different identity drops the previous
    /// profile and organization and invalidates in-flight profile loads.
    fn set_identity(&mut self, identity: Identity, session: Session) {
        let same_identity = self
            .identity
            .as_ref()
            .map(|current| current.id == identity.id)
            .unwrap_or(false);

        if !same_identity {
            self.generation += 1;
            self.profile = None;
            self.organization = None;
        }
        self.identity = Some(identity);
        self.session = Some(session);
    }

    fn clear_identity(&mut self) {
        if self.identity.is_some() {
            self.generation += 1;
        }
        self.identity = None;
        self.session = None;
        self.profile = None;
        self.organization = None;
    }
}

/// Holds the auth state and runs the auth operations against a backend.
pub struct SessionStore {
    backend: Arc<dyn AuthBackend>,
    state: watch::Sender<AuthState>,
    persister: Option<Persister>,
}

impl SessionStore {
    /// Create a store without persistence.
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            backend,
            state,
            persister: None,
        }
    }

    /// Create a store backed by `storage`, restoring the persisted blob.
    ///
    /// An unreadable blob is logged and ignored. A restored session is handed
    /// back to the backend so authorized requests and refresh keep working;
    /// if the backend cannot revive it the store starts signed out and the
    /// cleared blob is written back.
    pub async fn open(backend: Arc<dyn AuthBackend>, storage: StateManager) -> Self {
        let blob = match storage.load_json::<PersistedAuth>(StorageKeys::AUTH_STORAGE) {
            Ok(blob) => blob.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Could not read persisted auth state, starting signed out");
                PersistedAuth::default()
            }
        };

        let mut initial = AuthState::from_persisted(blob);
        let stored = initial.persisted();
        if let Some(session) = initial.session.clone() {
            let user_id = session.user.id.clone();
            match backend.restore_session(session).await {
                Ok(session) => {
                    info!(user_id = %user_id, "Restored persisted session");
                    initial.session = Some(session);
                }
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        error = %e,
                        "Persisted session could not be restored, starting signed out"
                    );
                    initial.clear_identity();
                }
            }
        }

        let persister = Persister::spawn(Arc::new(storage), stored.clone());
        if initial.persisted() != stored {
            persister.save(initial.persisted());
        }
        let (state, _) = watch::channel(initial);
        Self {
            backend,
            state,
            persister: Some(persister),
        }
    }

    /// Current state.
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receive a fresh snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Subscribe to backend auth events. Feed them to [`Self::handle_auth_event`].
    pub fn subscribe_backend_events(&self) -> AuthEventSubscription {
        AuthEventSubscription::new(self.backend.subscribe_auth_events())
    }

    /// Apply every queued backend event. Returns how many were applied.
    pub fn drain_events(&self, subscription: &mut AuthEventSubscription) -> usize {
        let mut applied = 0;
        while let Some(event) = subscription.try_recv() {
            self.handle_auth_event(event);
            applied += 1;
        }
        applied
    }

    /// Wait until pending state writes have reached storage.
    pub async fn flush(&self) {
        if let Some(persister) = &self.persister {
            persister.flush().await;
        }
    }

    /// Sign in with email and password, then load the profile.
    ///
    /// A failed profile load is recorded but does not undo the sign-in.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<()> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(self.fail(AuthError::AuthenticationFailed(
                MISSING_CREDENTIALS.to_string(),
            )));
        }

        let _loading = self.begin_operation();
        self.update(|s| s.error = None);

        match self.backend.authenticate(email.trim(), password).await {
            Ok(session) => {
                let user_id = session.user.id.clone();
                self.update(|s| {
                    s.set_identity(session.user.clone(), session);
                    s.show_auth = false;
                    s.pending_verification = None;
                });
                info!(user_id = %user_id, "Signed in");

                let _ = self.load_profile().await;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Sign in failed");
                Err(self.fail(AuthError::AuthenticationFailed(failure_message(
                    &e,
                    SIGN_IN_FAILED,
                ))))
            }
        }
    }

    /// Create an account, signing in when the backend allows it right away.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        organization_name: Option<&str>,
    ) -> AuthResult<SignUpOutcome> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(self.fail(AuthError::RegistrationFailed(
                MISSING_CREDENTIALS.to_string(),
            )));
        }

        let metadata = RegistrationMetadata {
            full_name: display_name.trim().to_string(),
            organization_name: organization_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_ORGANIZATION_NAME)
                .to_string(),
        };

        let _loading = self.begin_operation();
        self.update(|s| {
            s.error = None;
            s.pending_verification = None;
        });

        let registration = match self
            .backend
            .register(email.trim(), password, &metadata)
            .await
        {
            Ok(registration) => registration,
            Err(e) => {
                warn!(error = %e, "Sign up failed");
                return Err(self.fail(AuthError::RegistrationFailed(failure_message(
                    &e,
                    SIGN_UP_FAILED,
                ))));
            }
        };

        if let Some(session) = registration.session {
            let identity = registration
                .identity
                .unwrap_or_else(|| session.user.clone());
            let user_id = identity.id.clone();
            self.update(|s| {
                s.set_identity(identity, session);
                s.show_auth = false;
            });
            info!(user_id = %user_id, "Account created and signed in");

            let _ = self.load_profile().await;
            return Ok(SignUpOutcome::Created);
        }

        if registration.pending_verification {
            let email = email.trim().to_string();
            info!("Account created, awaiting email confirmation");
            self.update(|s| s.pending_verification = Some(email));
            return Ok(SignUpOutcome::PendingVerification);
        }

        Err(self.fail(AuthError::RegistrationFailed(SIGN_UP_FAILED.to_string())))
    }

    /// Invalidate the session and clear identity, session, profile and
    /// organization together.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let _loading = self.begin_operation();
        self.update(|s| s.error = None);

        match self.backend.invalidate_session().await {
            Ok(()) => {
                self.update(|s| {
                    s.clear_identity();
                    s.show_auth = false;
                    s.pending_verification = None;
                });
                info!("Signed out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Sign out failed");
                Err(self.fail(AuthError::SignOutFailed(failure_message(
                    &e,
                    SIGN_OUT_FAILED,
                ))))
            }
        }
    }

    /// Fetch the profile of the current identity and then its organization.
    ///
    /// Does nothing without an identity. The result is dropped if the
    /// identity changed while the fetch was in flight.
    pub async fn load_profile(&self) -> AuthResult<()> {
        let (user_id, generation) = {
            let state = self.state.borrow();
            match &state.identity {
                Some(identity) => (identity.id.clone(), state.generation),
                None => return Ok(()),
            }
        };

        let _loading = self.begin_operation();
        debug!(user_id = %user_id, "Loading profile");

        match self.fetch_profile(&user_id).await {
            Ok((profile, organization)) => {
                let organization_id = organization.id.clone();
                let applied = self.update_if(|s| {
                    if s.generation != generation {
                        return false;
                    }
                    s.profile = Some(profile);
                    s.organization = Some(organization);
                    true
                });

                if applied {
                    info!(user_id = %user_id, organization_id = %organization_id, "Profile loaded");
                } else {
                    debug!(user_id = %user_id, "Identity changed during profile load, discarding result");
                }
                Ok(())
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to load profile");
                let error =
                    AuthError::ProfileFetchFailed(failure_message(&e, PROFILE_LOAD_FAILED));
                let message = error.user_message();
                self.update_if(|s| {
                    if s.generation != generation {
                        return false;
                    }
                    s.error = Some(message);
                    true
                });
                Err(error)
            }
        }
    }

    /// Load the profile if an identity is present without one.
    ///
    /// Returns whether a load was attempted.
    pub async fn ensure_profile_loaded(&self) -> AuthResult<bool> {
        let needed = view_router::needs_profile_load(self.state.borrow().route_inputs());
        if !needed {
            return Ok(false);
        }
        self.load_profile().await?;
        Ok(true)
    }

    /// Show or hide the auth form. Clears any error and sign-up notice.
    pub fn set_show_auth(&self, visible: bool) {
        self.update(|s| {
            s.show_auth = visible;
            s.error = None;
            s.pending_verification = None;
        });
    }

    pub fn clear_error(&self) {
        self.update(|s| s.error = None);
    }

    /// Apply an auth event pushed by the backend.
    ///
    /// `SignedIn` mirrors identity and session without loading the profile.
    /// `SignedOut` clears all four durable fields in one update.
    pub fn handle_auth_event(&self, event: AuthEvent) {
        debug!(event = event.name(), "Handling auth event");
        match event {
            AuthEvent::SignedIn(session) => self.update(|s| {
                s.set_identity(session.user.clone(), session);
            }),
            AuthEvent::SignedOut => self.update(AuthState::clear_identity),
        }
    }

    async fn fetch_profile(&self, user_id: &str) -> AuthResult<(Profile, Organization)> {
        let raw = self
            .backend
            .fetch_record(RecordTable::Profiles, user_id)
            .await?;
        let profile: Profile = serde_json::from_value(raw)?;

        let raw = self
            .backend
            .fetch_record(RecordTable::Organizations, &profile.organization_id)
            .await?;
        let organization: Organization = serde_json::from_value(raw)?;

        Ok((profile, organization))
    }

    /// Record `error` on the state and hand it back.
    fn fail(&self, error: AuthError) -> AuthError {
        let message = error.user_message();
        self.update(|s| s.error = Some(message));
        error
    }

    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut AuthState),
    {
        self.update_if(|s| {
            f(s);
            true
        });
    }

    /// Apply `f` atomically. Queues a write when the durable fields changed.
    fn update_if<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut AuthState) -> bool,
    {
        let persister = self.persister.as_ref();
        self.state.send_if_modified(|state| {
            let before = persister.map(|_| state.persisted());
            if !f(state) {
                return false;
            }
            if let (Some(persister), Some(before)) = (persister, before) {
                let after = state.persisted();
                if after != before {
                    persister.save(after);
                }
            }
            true
        })
    }

    fn begin_operation(&self) -> OperationGuard<'_> {
        self.state.send_modify(|s| {
            s.in_flight += 1;
            s.is_loading = true;
        });
        OperationGuard { store: self }
    }
}

/// Keeps `is_loading` set while alive.
struct OperationGuard<'a> {
    store: &'a SessionStore,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.store.state.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            s.is_loading = s.in_flight > 0;
        });
    }
}

/// Message to show for a failed operation: the backend's, else `fallback`.
fn failure_message(error: &AuthError, fallback: &str) -> String {
    let message = match error {
        AuthError::Api { message, .. }
        | AuthError::AuthenticationFailed(message)
        | AuthError::RegistrationFailed(message)
        | AuthError::ProfileFetchFailed(message)
        | AuthError::SignOutFailed(message)
        | AuthError::TokenRefresh(message) => message.trim(),
        _ => "",
    };

    if message.is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}
