//! Scripted in-memory backend for store tests.

use crate::backend::AuthBackend;
use crate::types::{AuthEvent, Identity, RecordTable, Registration, RegistrationMetadata, Session};
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};

pub(crate) enum SignUpScript {
    Created,
    Pending,
    Fail(String),
}

/// What `restore_session` does with a persisted session.
pub(crate) enum RestoreScript {
    Keep,
    Refresh(Session),
    Reject(String),
}

pub(crate) struct MockBackend {
    accounts: Mutex<HashMap<String, (String, String)>>,
    records: Mutex<HashMap<(RecordTable, String), Value>>,
    sign_up: Mutex<SignUpScript>,
    sign_out_failure: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
    events: broadcast::Sender<AuthEvent>,
    fetch_gate: Mutex<Option<Arc<Semaphore>>>,
    restore: Mutex<RestoreScript>,
    pub(crate) restored: Mutex<Option<Session>>,
    pub(crate) last_metadata: Mutex<Option<RegistrationMetadata>>,
}

pub(crate) fn identity(user_id: &str, email: &str) -> Identity {
    Identity {
        id: user_id.to_string(),
        email: Some(email.to_string()),
        app_metadata: Map::new(),
        user_metadata: Map::new(),
    }
}

pub(crate) fn session(user_id: &str, email: &str) -> Session {
    Session {
        access_token: format!("access-{}", user_id),
        refresh_token: format!("refresh-{}", user_id),
        expires_in: 3600,
        expires_at: Some(4_102_444_800),
        token_type: "bearer".to_string(),
        user: identity(user_id, email),
    }
}

impl MockBackend {
    pub(crate) fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            accounts: Mutex::new(HashMap::new()),
            records: Mutex::new(HashMap::new()),
            sign_up: Mutex::new(SignUpScript::Created),
            sign_out_failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            events,
            fetch_gate: Mutex::new(None),
            restore: Mutex::new(RestoreScript::Keep),
            restored: Mutex::new(None),
            last_metadata: Mutex::new(None),
        })
    }

    pub(crate) fn add_account(&self, email: &str, password: &str, user_id: &str) {
        self.accounts
            .lock()
            .insert(email.to_string(), (password.to_string(), user_id.to_string()));
    }

    /// Provision a profile for `user_id` in organization `org_id` named `org_name`.
    pub(crate) fn add_profile(&self, user_id: &str, org_id: &str, org_name: &str) {
        self.add_profile_only(user_id, org_id);
        self.records.lock().insert(
            (RecordTable::Organizations, org_id.to_string()),
            json!({
                "id": org_id,
                "name": org_name,
                "slug": org_name.to_lowercase(),
                "settings": {},
                "created_at": "2024-01-15T10:00:00Z",
                "updated_at": "2024-01-15T10:00:00Z"
            }),
        );
    }

    /// Provision a profile whose organization row is missing.
    pub(crate) fn add_profile_only(&self, user_id: &str, org_id: &str) {
        self.records.lock().insert(
            (RecordTable::Profiles, user_id.to_string()),
            json!({
                "id": user_id,
                "organization_id": org_id,
                "role": "owner",
                "full_name": "Ada Lovelace",
                "avatar_url": null,
                "created_at": "2024-01-15T10:00:00Z",
                "updated_at": "2024-01-15T10:00:00Z"
            }),
        );
    }

    pub(crate) fn script_sign_up(&self, script: SignUpScript) {
        *self.sign_up.lock() = script;
    }

    pub(crate) fn script_restore(&self, script: RestoreScript) {
        *self.restore.lock() = script;
    }

    pub(crate) fn fail_sign_out(&self, message: &str) {
        *self.sign_out_failure.lock() = Some(message.to_string());
    }

    /// Make record fetches wait for permits on the returned semaphore.
    pub(crate) fn hold_fetches(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.fetch_gate.lock() = Some(gate.clone());
        gate
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    fn record_call(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl AuthBackend for MockBackend {
    async fn authenticate(&self, email: &str, password: &str) -> AuthResult<Session> {
        self.record_call(format!("authenticate:{}", email));
        let account = self.accounts.lock().get(email).cloned();
        match account {
            Some((expected, user_id)) if expected == password => {
                let session = session(&user_id, email);
                self.emit(AuthEvent::SignedIn(session.clone()));
                Ok(session)
            }
            _ => Err(AuthError::Api {
                status: 400,
                message: "Invalid login credentials".to_string(),
            }),
        }
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        metadata: &RegistrationMetadata,
    ) -> AuthResult<Registration> {
        self.record_call(format!("register:{}", email));
        *self.last_metadata.lock() = Some(metadata.clone());

        let user_id = format!("user-{}", email.split('@').next().unwrap_or("new"));
        let outcome = match &*self.sign_up.lock() {
            SignUpScript::Created => Ok(true),
            SignUpScript::Pending => Ok(false),
            SignUpScript::Fail(message) => Err(message.clone()),
        };

        match outcome {
            Ok(true) => {
                self.add_account(email, password, &user_id);
                let session = session(&user_id, email);
                self.emit(AuthEvent::SignedIn(session.clone()));
                Ok(Registration {
                    identity: Some(session.user.clone()),
                    session: Some(session),
                    pending_verification: false,
                })
            }
            Ok(false) => Ok(Registration {
                identity: Some(identity(&user_id, email)),
                session: None,
                pending_verification: true,
            }),
            Err(message) => Err(AuthError::Api {
                status: 422,
                message,
            }),
        }
    }

    async fn invalidate_session(&self) -> AuthResult<()> {
        self.record_call("invalidate_session".to_string());
        if let Some(message) = self.sign_out_failure.lock().clone() {
            return Err(AuthError::Api {
                status: 500,
                message,
            });
        }
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn fetch_record(&self, table: RecordTable, key: &str) -> AuthResult<Value> {
        self.record_call(format!("fetch:{}:{}", table, key));

        let gate = self.fetch_gate.lock().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.records
            .lock()
            .get(&(table, key.to_string()))
            .cloned()
            .ok_or_else(|| AuthError::Api {
                status: 406,
                message: "JSON object requested, multiple (or no) rows returned".to_string(),
            })
    }

    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn restore_session(&self, session: Session) -> AuthResult<Session> {
        self.record_call(format!("restore_session:{}", session.user.id));
        let session = match &*self.restore.lock() {
            RestoreScript::Keep => session,
            RestoreScript::Refresh(refreshed) => refreshed.clone(),
            RestoreScript::Reject(message) => {
                return Err(AuthError::TokenRefresh(message.clone()));
            }
        };
        *self.restored.lock() = Some(session.clone());
        Ok(session)
    }
}
