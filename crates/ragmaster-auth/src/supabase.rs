//! Supabase implementation of [`AuthBackend`] over the GoTrue and PostgREST
//! HTTP APIs.

use crate::auth_fsm::{
    CredentialInput, CredentialMachine, CredentialState, RefreshConfig,
};
use crate::backend::AuthBackend;
use crate::types::{
    AuthEvent, Identity, RecordTable, Registration, RegistrationMetadata, Session,
};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use url::Url;

/// Capacity of the auth event channel. Slow subscribers lag, they never block.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Media type asking PostgREST for exactly one row.
const PGRST_SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a RegistrationMetadata,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Supabase client holding the current session.
///
/// Cloning is cheap and clones share the session, the credential machine and
/// the event channel.
#[derive(Clone)]
pub struct SupabaseBackend {
    inner: Arc<Inner>,
}

struct Inner {
    url: String,
    anon_key: String,
    http: Client,
    fsm: Mutex<CredentialMachine>,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
    refresh_config: RefreshConfig,
}

impl SupabaseBackend {
    /// Create a client for the project at `url`.
    pub fn new(url: &str, anon_key: &str) -> Self {
        Self::with_refresh_config(url, anon_key, RefreshConfig::default())
    }

    /// Create a client with custom refresh behavior.
    pub fn with_refresh_config(url: &str, anon_key: &str, refresh_config: RefreshConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                url: url.trim_end_matches('/').to_string(),
                anon_key: anon_key.to_string(),
                http: Client::new(),
                fsm: Mutex::new(CredentialMachine::new()),
                session: Mutex::new(None),
                events,
                refresh_config,
            }),
        }
    }

    /// Current credential state.
    pub fn credential_state(&self) -> CredentialState {
        CredentialState::from(self.inner.fsm.lock().state())
    }

    /// The session currently held, if any.
    pub fn current_session(&self) -> Option<Session> {
        self.inner.session.lock().clone()
    }

    /// Refresh the session if it expires within the configured margin.
    ///
    /// Returns whether a refresh happened.
    pub async fn refresh_if_expiring(&self) -> AuthResult<bool> {
        self.inner.refresh_if_expiring().await
    }

    /// Refresh the session now.
    pub async fn refresh_session(&self) -> AuthResult<Session> {
        self.inner.refresh_session().await
    }

    /// Start the background task that keeps the session fresh.
    ///
    /// The task stops when the returned handle is dropped or when every clone
    /// of this client is gone.
    pub fn start_auto_refresh(&self) -> AutoRefresh {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let period = self.inner.refresh_config.check_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = inner.refresh_if_expiring().await {
                    warn!(error = %e, "Automatic token refresh failed");
                }
            }
            debug!("Auto-refresh task stopped");
        });

        AutoRefresh { handle }
    }
}

/// Handle to the auto-refresh task. Dropping it stops the task.
pub struct AutoRefresh {
    handle: JoinHandle<()>,
}

impl AutoRefresh {
    /// Stop the task.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl Inner {
    fn endpoint(&self, path: &str) -> AuthResult<Url> {
        Ok(Url::parse(&format!("{}{}", self.url, path))?)
    }

    /// Bearer token for authorized requests: the session's, else the anon key.
    fn bearer(&self) -> String {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.anon_key)
    }

    /// Apply `input` to the credential machine and publish the matching event.
    fn transition(&self, input: CredentialInput) -> AuthResult<CredentialState> {
        let mut fsm = self.fsm.lock();
        let old_state = CredentialState::from(fsm.state());

        fsm.consume(&input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = CredentialState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(old_state = ?old_state, new_state = ?new_state, "Credential state transition");
        }

        let event = match (&input, new_state) {
            (
                CredentialInput::SignInSuccess
                | CredentialInput::SessionRestored
                | CredentialInput::RefreshSuccess,
                CredentialState::SignedIn,
            ) => self.session.lock().clone().map(AuthEvent::SignedIn),
            (_, CredentialState::SignedOut) if old_state != CredentialState::SignedOut => {
                Some(AuthEvent::SignedOut)
            }
            _ => None,
        };

        if let Some(event) = event {
            debug!(event = event.name(), "Publishing auth event");
            // No subscribers is fine.
            let _ = self.events.send(event);
        }

        Ok(new_state)
    }

    fn adopt_session(&self, session: Session, input: CredentialInput) -> AuthResult<()> {
        *self.session.lock() = Some(session);
        self.transition(input)?;
        Ok(())
    }

    async fn refresh_if_expiring(&self) -> AuthResult<bool> {
        let margin = chrono::Duration::from_std(self.refresh_config.expiry_margin)
            .unwrap_or_else(|_| chrono::Duration::seconds(90));
        let expiring = self
            .session
            .lock()
            .as_ref()
            .map(|s| s.expires_within(margin, Utc::now()))
            .unwrap_or(false);

        if !expiring || !self.credential_state().is_authenticated() {
            return Ok(false);
        }

        info!("Session expiring soon, refreshing");
        self.refresh_session().await?;
        Ok(true)
    }

    fn credential_state(&self) -> CredentialState {
        CredentialState::from(self.fsm.lock().state())
    }

    async fn refresh_session(&self) -> AuthResult<Session> {
        let refresh_token = self
            .session
            .lock()
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(AuthError::NotSignedIn)?;

        self.transition(CredentialInput::TokenExpiring)?;
        self.refresh_with_backoff(&refresh_token).await
    }

    /// Refresh the session with exponential backoff retry.
    async fn refresh_with_backoff(&self, refresh_token: &str) -> AuthResult<Session> {
        let max_retries = self.refresh_config.max_retries;

        for attempt in 0..max_retries {
            let result = self.try_refresh(refresh_token).await;
            if self.credential_state() != CredentialState::Refreshing {
                debug!("Sign-out requested during refresh, discarding result");
                return Err(AuthError::NotSignedIn);
            }

            match result {
                Ok(session) => {
                    info!(user_id = %session.user.id, "Token refreshed successfully");
                    self.adopt_session(session.clone(), CredentialInput::RefreshSuccess)?;
                    return Ok(session);
                }
                Err(e) if e.is_transient() => {
                    if attempt + 1 < max_retries {
                        let _ = self.transition(CredentialInput::RefreshRetry);

                        let delay = self.refresh_config.delay_for_attempt(attempt);
                        debug!(
                            attempt = attempt + 1,
                            max_retries,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Refresh failed with transient error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Refresh failed with non-transient error");
                    self.drop_session()?;
                    return Err(AuthError::TokenRefresh(e.user_message()));
                }
            }
        }

        warn!(max_retries, "Refresh failed after all attempts");
        self.drop_session()?;
        Err(AuthError::RefreshExhausted(max_retries))
    }

    fn drop_session(&self) -> AuthResult<()> {
        *self.session.lock() = None;
        self.transition(CredentialInput::RefreshFailed)?;
        Ok(())
    }

    /// Single attempt to refresh the session.
    async fn try_refresh(&self, refresh_token: &str) -> AuthResult<Session> {
        let refresh_url = self.endpoint("/auth/v1/token?grant_type=refresh_token")?;
        debug!(url = %refresh_url, "Refreshing token");

        let response = self
            .with_api_key(self.http.post(refresh_url))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let response = check_status(response).await?;
        let session: Session = response.json().await?;
        Ok(session.with_expiry_from(Utc::now()))
    }
}

#[async_trait]
impl AuthBackend for SupabaseBackend {
    async fn authenticate(&self, email: &str, password: &str) -> AuthResult<Session> {
        let inner = &self.inner;
        let login_url = inner.endpoint("/auth/v1/token?grant_type=password")?;
        debug!(url = %login_url, "Attempting email/password sign-in");

        let response = inner
            .with_api_key(inner.http.post(login_url))
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        let response = check_status(response).await?;
        let session: Session = response.json().await?;
        let session = session.with_expiry_from(Utc::now());

        inner.adopt_session(session.clone(), CredentialInput::SignInSuccess)?;
        info!(user_id = %session.user.id, "Sign-in successful");
        Ok(session)
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        metadata: &RegistrationMetadata,
    ) -> AuthResult<Registration> {
        let inner = &self.inner;
        let signup_url = inner.endpoint("/auth/v1/signup")?;
        debug!(url = %signup_url, "Registering account");

        let response = inner
            .with_api_key(inner.http.post(signup_url))
            .json(&SignUpRequest {
                email,
                password,
                data: metadata,
            })
            .send()
            .await?;

        let response = check_status(response).await?;
        let body: Value = response.json().await?;

        if body.get("access_token").is_some() {
            let session: Session = serde_json::from_value(body)?;
            let session = session.with_expiry_from(Utc::now());
            inner.adopt_session(session.clone(), CredentialInput::SignInSuccess)?;
            info!(user_id = %session.user.id, "Account created and signed in");
            return Ok(Registration {
                identity: Some(session.user.clone()),
                session: Some(session),
                pending_verification: false,
            });
        }

        // Without a session the server answers with the bare user, either at
        // the top level or under `user`.
        let user = body
            .get("user")
            .filter(|user| user.is_object())
            .cloned()
            .unwrap_or(body);
        let identity: Identity = serde_json::from_value(user)?;
        info!(user_id = %identity.id, "Account created, awaiting email confirmation");

        Ok(Registration {
            identity: Some(identity),
            session: None,
            pending_verification: true,
        })
    }

    async fn invalidate_session(&self) -> AuthResult<()> {
        let inner = &self.inner;
        let access_token = match inner.session.lock().as_ref() {
            Some(session) => session.access_token.clone(),
            None => {
                debug!("No session to invalidate");
                return Ok(());
            }
        };

        inner.transition(CredentialInput::SignOutRequested)?;

        let logout_url = inner.endpoint("/auth/v1/logout")?;
        let result = inner
            .with_api_key(inner.http.post(logout_url))
            .bearer_auth(&access_token)
            .send()
            .await;

        let outcome = match result {
            Ok(response) => match response.status() {
                // The session is already gone server-side.
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
                _ => check_status(response).await.map(|_| ()),
            },
            Err(e) => Err(AuthError::Http(e)),
        };

        match outcome {
            Ok(()) => {
                *inner.session.lock() = None;
                inner.transition(CredentialInput::SignOutComplete)?;
                info!("Signed out");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Sign-out request failed");
                inner.transition(CredentialInput::SignOutFailed)?;
                Err(e)
            }
        }
    }

    async fn fetch_record(&self, table: RecordTable, key: &str) -> AuthResult<Value> {
        let inner = &self.inner;
        let url = inner.endpoint(&format!("/rest/v1/{}", table.table_name()))?;
        debug!(%table, key, "Fetching record");

        let response = inner
            .with_api_key(inner.http.get(url))
            .bearer_auth(inner.bearer())
            .header(reqwest::header::ACCEPT, PGRST_SINGLE_OBJECT)
            .query(&[("id", format!("eq.{}", key)), ("select", "*".to_string())])
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    /// A failed refresh leaves the client signed out.
    async fn restore_session(&self, session: Session) -> AuthResult<Session> {
        debug!(user_id = %session.user.id, "Restoring persisted session");
        self.inner
            .adopt_session(session, CredentialInput::SessionRestored)?;

        if let Err(e) = self.inner.refresh_if_expiring().await {
            warn!(error = %e, "Restored session could not be refreshed");
            return Err(e);
        }
        self.inner
            .session
            .lock()
            .clone()
            .ok_or(AuthError::NotSignedIn)
    }
}

/// Turn a non-success response into [`AuthError::Api`].
async fn check_status(response: Response) -> AuthResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    warn!(status = status.as_u16(), message = %message, "Backend request failed");

    Err(AuthError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Extract the human-readable message from an error body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for field in ["error_description", "msg", "message", "error"] {
            if let Some(text) = value.get(field).and_then(Value::as_str) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::broadcast::error::TryRecvError;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ANON_KEY: &str = "anon-key";

    fn session_body(access_token: &str, expires_in: i64) -> Value {
        json!({
            "access_token": access_token,
            "refresh_token": format!("{}-refresh", access_token),
            "expires_in": expires_in,
            "token_type": "bearer",
            "user": {
                "id": "user-1",
                "email": "ada@example.com",
                "app_metadata": {"provider": "email"},
                "user_metadata": {}
            }
        })
    }

    #[tokio::test]
    async fn test_malformed_project_url_is_reported() {
        let backend = SupabaseBackend::new("not a url", ANON_KEY);
        let err = backend.authenticate("ada@example.com", "pw").await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidUrl(_)));
        assert_eq!(backend.credential_state(), CredentialState::SignedOut);
    }

    fn fast_retries() -> RefreshConfig {
        RefreshConfig {
            initial_delay_ms: 1,
            max_delay_ms: 2,
            ..RefreshConfig::default()
        }
    }

    async fn signed_in(server: &MockServer) -> SupabaseBackend {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("at-1", 3600)))
            .mount(server)
            .await;

        let backend = SupabaseBackend::with_refresh_config(&server.uri(), ANON_KEY, fast_retries());
        backend
            .authenticate("ada@example.com", "secret")
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_authenticate_success_publishes_signed_in() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", ANON_KEY))
            .and(body_json(json!({"email": "ada@example.com", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("at-1", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let backend = SupabaseBackend::new(&server.uri(), ANON_KEY);
        let mut events = backend.subscribe_auth_events();

        let session = backend
            .authenticate("ada@example.com", "secret")
            .await
            .unwrap();

        assert_eq!(session.user.id, "user-1");
        assert!(session.expires_at.is_some());
        assert_eq!(backend.credential_state(), CredentialState::SignedIn);
        match events.try_recv().unwrap() {
            AuthEvent::SignedIn(s) => assert_eq!(s.access_token, "at-1"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_authenticate_failure_uses_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let backend = SupabaseBackend::new(&server.uri(), ANON_KEY);
        let mut events = backend.subscribe_auth_events();

        let err = backend
            .authenticate("ada@example.com", "wrong")
            .await
            .unwrap_err();

        match err {
            AuthError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(backend.credential_state(), CredentialState::SignedOut);
        assert!(backend.current_session().is_none());
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_register_with_session_is_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .and(body_json(json!({
                "email": "ada@example.com",
                "password": "secret",
                "data": {"full_name": "Ada", "organization_name": "Personal"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("at-new", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let backend = SupabaseBackend::new(&server.uri(), ANON_KEY);
        let registration = backend
            .register(
                "ada@example.com",
                "secret",
                &RegistrationMetadata {
                    full_name: "Ada".to_string(),
                    organization_name: "Personal".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(!registration.pending_verification);
        assert_eq!(registration.session.unwrap().access_token, "at-new");
        assert_eq!(backend.credential_state(), CredentialState::SignedIn);
    }

    #[tokio::test]
    async fn test_register_without_session_is_pending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-2",
                "email": "grace@example.com",
                "confirmation_sent_at": "2024-01-15T10:00:00Z",
                "app_metadata": {},
                "user_metadata": {"full_name": "Grace"}
            })))
            .mount(&server)
            .await;

        let backend = SupabaseBackend::new(&server.uri(), ANON_KEY);
        let registration = backend
            .register(
                "grace@example.com",
                "secret",
                &RegistrationMetadata {
                    full_name: "Grace".to_string(),
                    organization_name: "Navy".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(registration.pending_verification);
        assert!(registration.session.is_none());
        assert_eq!(registration.identity.unwrap().id, "user-2");
        assert_eq!(backend.credential_state(), CredentialState::SignedOut);
    }

    #[tokio::test]
    async fn test_invalidate_session_publishes_signed_out() {
        let server = MockServer::start().await;
        let backend = signed_in(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let mut events = backend.subscribe_auth_events();
        backend.invalidate_session().await.unwrap();

        assert_eq!(backend.credential_state(), CredentialState::SignedOut);
        assert!(backend.current_session().is_none());
        assert_eq!(events.try_recv().unwrap(), AuthEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_sign_out_during_refresh_discards_refreshed_session() {
        let server = MockServer::start().await;
        let backend = signed_in(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(session_body("at-2", 3600))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let refreshing = backend.clone();
        let refresh = tokio::spawn(async move { refreshing.refresh_session().await });
        while backend.credential_state() != CredentialState::Refreshing {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        backend.invalidate_session().await.unwrap();
        assert_eq!(backend.credential_state(), CredentialState::SignedOut);

        let result = refresh.await.unwrap();
        assert!(matches!(result, Err(AuthError::NotSignedIn)));
        assert_eq!(backend.credential_state(), CredentialState::SignedOut);
        assert!(backend.current_session().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_expired_session_counts_as_success() {
        let server = MockServer::start().await;
        let backend = signed_in(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        backend.invalidate_session().await.unwrap();
        assert_eq!(backend.credential_state(), CredentialState::SignedOut);
    }

    #[tokio::test]
    async fn test_invalidate_session_server_error_keeps_session() {
        let server = MockServer::start().await;
        let backend = signed_in(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"msg": "database unavailable"})),
            )
            .mount(&server)
            .await;

        let err = backend.invalidate_session().await.unwrap_err();
        assert_eq!(err.user_message(), "database unavailable");
        assert_eq!(backend.credential_state(), CredentialState::SignedIn);
        assert!(backend.current_session().is_some());
    }

    #[tokio::test]
    async fn test_invalidate_without_session_is_noop() {
        let server = MockServer::start().await;
        let backend = SupabaseBackend::new(&server.uri(), ANON_KEY);
        backend.invalidate_session().await.unwrap();
        assert_eq!(backend.credential_state(), CredentialState::SignedOut);
    }

    #[tokio::test]
    async fn test_fetch_record_requests_single_row() {
        let server = MockServer::start().await;
        let backend = signed_in(&server).await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_profiles"))
            .and(query_param("id", "eq.user-1"))
            .and(query_param("select", "*"))
            .and(header("accept", PGRST_SINGLE_OBJECT))
            .and(header("apikey", ANON_KEY))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-1",
                "organization_id": "org-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = backend
            .fetch_record(RecordTable::Profiles, "user-1")
            .await
            .unwrap();
        assert_eq!(record["organization_id"], "org-1");
    }

    #[tokio::test]
    async fn test_fetch_record_missing_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/organizations"))
            .and(header("authorization", format!("Bearer {}", ANON_KEY).as_str()))
            .respond_with(ResponseTemplate::new(406).set_body_json(json!({
                "code": "PGRST116",
                "message": "JSON object requested, multiple (or no) rows returned"
            })))
            .mount(&server)
            .await;

        let backend = SupabaseBackend::new(&server.uri(), ANON_KEY);
        let err = backend
            .fetch_record(RecordTable::Organizations, "org-404")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Api { status: 406, .. }));
        assert!(err.user_message().starts_with("JSON object requested"));
    }

    fn expired_session(access_token: &str) -> Session {
        let session: Session = serde_json::from_value(session_body(access_token, 3600)).unwrap();
        Session {
            expires_at: Some(Utc::now().timestamp() - 600),
            ..session
        }
    }

    #[tokio::test]
    async fn test_restoring_expired_session_refreshes_before_use() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .and(body_json(json!({"refresh_token": "at-old-refresh"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("at-2", 3600)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_profiles"))
            .and(header("authorization", "Bearer at-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "user-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let backend = SupabaseBackend::with_refresh_config(&server.uri(), ANON_KEY, fast_retries());
        let mut events = backend.subscribe_auth_events();
        let restored = backend.restore_session(expired_session("at-old")).await.unwrap();
        assert_eq!(restored.access_token, "at-2");

        assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedIn(ref s)) if s.access_token == "at-old"));
        assert!(matches!(events.try_recv(), Ok(AuthEvent::SignedIn(ref s)) if s.access_token == "at-2"));
        assert_eq!(backend.credential_state(), CredentialState::SignedIn);

        let record = backend
            .fetch_record(RecordTable::Profiles, "user-1")
            .await
            .unwrap();
        assert_eq!(record["id"], "user-1");

        // Fresh session: nothing to do.
        assert!(!backend.refresh_if_expiring().await.unwrap());
    }

    #[tokio::test]
    async fn test_restoring_fresh_session_skips_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("at-2", 3600)))
            .expect(0)
            .mount(&server)
            .await;

        let backend = SupabaseBackend::new(&server.uri(), ANON_KEY);
        let fresh: Session = serde_json::from_value(session_body("at-1", 3600)).unwrap();
        let restored = backend
            .restore_session(fresh.with_expiry_from(Utc::now()))
            .await
            .unwrap();

        assert_eq!(restored.access_token, "at-1");
        assert_eq!(backend.credential_state(), CredentialState::SignedIn);
    }

    #[tokio::test]
    async fn test_restoring_session_with_revoked_refresh_token_signs_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error_description": "Invalid Refresh Token: Refresh Token Not Found"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = SupabaseBackend::with_refresh_config(&server.uri(), ANON_KEY, fast_retries());
        let err = backend
            .restore_session(expired_session("at-old"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::TokenRefresh(_)));
        assert_eq!(backend.credential_state(), CredentialState::SignedOut);
        assert!(backend.current_session().is_none());
    }

    #[tokio::test]
    async fn test_rejected_refresh_signs_out() {
        let server = MockServer::start().await;
        let backend = signed_in(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error_description": "Invalid Refresh Token: Already Used"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut events = backend.subscribe_auth_events();
        let err = backend.refresh_session().await.unwrap_err();

        assert!(matches!(err, AuthError::TokenRefresh(ref msg) if msg.contains("Already Used")));
        assert_eq!(backend.credential_state(), CredentialState::SignedOut);
        assert_eq!(events.try_recv().unwrap(), AuthEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_refresh_retries_transient_failures_then_gives_up() {
        let server = MockServer::start().await;
        let backend = signed_in(&server).await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = backend.refresh_session().await.unwrap_err();
        assert!(matches!(err, AuthError::RefreshExhausted(3)));
        assert_eq!(backend.credential_state(), CredentialState::SignedOut);
    }

    #[tokio::test]
    async fn test_refresh_without_session() {
        let server = MockServer::start().await;
        let backend = SupabaseBackend::new(&server.uri(), ANON_KEY);
        assert!(matches!(
            backend.refresh_session().await,
            Err(AuthError::NotSignedIn)
        ));
        assert!(!backend.refresh_if_expiring().await.unwrap());
    }

    #[tokio::test]
    async fn test_auto_refresh_task_refreshes_on_first_tick() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("at-auto", 3600)))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("at-short", 5)))
            .mount(&server)
            .await;

        let backend = SupabaseBackend::with_refresh_config(&server.uri(), ANON_KEY, fast_retries());
        backend
            .authenticate("ada@example.com", "secret")
            .await
            .unwrap();

        let mut events = backend.subscribe_auth_events();
        let auto = backend.start_auto_refresh();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, AuthEvent::SignedIn(ref s) if s.access_token == "at-auto"));
        auto.stop();
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"msg":"Signups not allowed"}"#),
            "Signups not allowed"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }
}
