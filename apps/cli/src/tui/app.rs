//! Application state for the TUI.

use super::theme::{Theme, ThemeMode};
use ragmaster_auth::view_router::needs_profile_load;
use ragmaster_auth::{AuthState, SessionStore, SignUpOutcome, View};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Which operation the auth form submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormMode {
    #[default]
    SignIn,
    SignUp,
}

/// Input fields of the auth form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    FullName,
    Organization,
    Email,
    Password,
}

impl FormField {
    pub fn label(&self) -> &'static str {
        match self {
            FormField::FullName => "Full name",
            FormField::Organization => "Organization",
            FormField::Email => "Email",
            FormField::Password => "Password",
        }
    }
}

const SIGN_IN_FIELDS: &[FormField] = &[FormField::Email, FormField::Password];
const SIGN_UP_FIELDS: &[FormField] = &[
    FormField::FullName,
    FormField::Organization,
    FormField::Email,
    FormField::Password,
];

/// Contents of the sign-in / sign-up form.
#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub mode: FormMode,
    focus: usize,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub organization: String,
}

impl AuthForm {
    /// Fields shown in the current mode, in focus order.
    pub fn fields(&self) -> &'static [FormField] {
        match self.mode {
            FormMode::SignIn => SIGN_IN_FIELDS,
            FormMode::SignUp => SIGN_UP_FIELDS,
        }
    }

    pub fn focused(&self) -> FormField {
        let fields = self.fields();
        fields[self.focus.min(fields.len() - 1)]
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.fields().len();
    }

    pub fn prev_field(&mut self) {
        let len = self.fields().len();
        self.focus = (self.focus + len - 1) % len;
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::FullName => &self.full_name,
            FormField::Organization => &self.organization,
            FormField::Email => &self.email,
            FormField::Password => &self.password,
        }
    }

    fn value_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::FullName => &mut self.full_name,
            FormField::Organization => &mut self.organization,
            FormField::Email => &mut self.email,
            FormField::Password => &mut self.password,
        }
    }

    pub fn input(&mut self, c: char) {
        let field = self.focused();
        self.value_mut(field).push(c);
    }

    pub fn backspace(&mut self) {
        let field = self.focused();
        self.value_mut(field).pop();
    }

    /// Switch between sign-in and sign-up, keeping what was typed.
    pub fn toggle_mode(&mut self) {
        self.set_mode(match self.mode {
            FormMode::SignIn => FormMode::SignUp,
            FormMode::SignUp => FormMode::SignIn,
        });
    }

    pub fn set_mode(&mut self, mode: FormMode) {
        self.mode = mode;
        self.focus = 0;
    }

    /// Check required fields before anything is sent.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.mode == FormMode::SignUp && self.full_name.trim().is_empty() {
            return Err("Full name is required");
        }
        if self.email.trim().is_empty() {
            return Err("Email is required");
        }
        if self.password.is_empty() {
            return Err("Password is required");
        }
        Ok(())
    }

    pub fn clear_secrets(&mut self) {
        self.password.clear();
    }
}

/// Main application state.
pub struct App {
    pub store: Arc<SessionStore>,
    /// Snapshot of the store taken at the start of each tick.
    pub state: AuthState,
    pub theme: Theme,
    pub form: AuthForm,
    pub status_message: Option<String>,
    pub should_quit: bool,
    last_identity: Option<String>,
    synced: bool,
    /// Last submitted operation; it may not have reached the store yet.
    pending: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(store: Arc<SessionStore>, theme_mode: ThemeMode) -> Self {
        let state = store.snapshot();
        Self {
            store,
            state,
            theme: Theme::from_mode(theme_mode),
            form: AuthForm::default(),
            status_message: None,
            should_quit: false,
            last_identity: None,
            synced: false,
            pending: None,
        }
    }

    pub fn view(&self) -> View {
        self.state.view()
    }

    /// Refresh the snapshot and react to identity changes.
    ///
    /// On the first sync and whenever the signed-in user changes, an identity
    /// without a profile triggers a profile load.
    pub fn sync_state(&mut self) {
        self.state = self.store.snapshot();

        let identity = self.state.identity.as_ref().map(|i| i.id.clone());
        let changed = !self.synced || identity != self.last_identity;
        self.synced = true;

        if changed {
            debug!(user_id = ?identity, "Identity changed");
            self.last_identity = identity;
            self.form.clear_secrets();
            if needs_profile_load(self.state.route_inputs()) && !self.state.is_loading {
                self.spawn_profile_load();
            }
        }

        if self.state.pending_verification.is_some() && self.form.mode == FormMode::SignUp {
            self.form.set_mode(FormMode::SignIn);
        }
    }

    /// Show the auth form in `mode`.
    pub fn open_auth(&mut self, mode: FormMode) {
        self.form.set_mode(mode);
        self.store.set_show_auth(true);
        self.sync_state();
    }

    /// Leave the auth form for the landing view.
    pub fn close_auth(&mut self) {
        self.form.clear_secrets();
        self.store.set_show_auth(false);
        self.sync_state();
    }

    /// Whether an operation is running or submitted but not yet started.
    pub fn is_busy(&self) -> bool {
        self.state.is_loading
            || self
                .pending
                .as_ref()
                .is_some_and(|task| !task.is_finished())
    }

    /// Submit the auth form. Ignored while an operation is running.
    pub fn submit_form(&mut self) {
        if self.is_busy() {
            return;
        }
        if let Err(message) = self.form.validate() {
            self.set_status_message(message.to_string());
            return;
        }

        let store = self.store.clone();
        let email = self.form.email.trim().to_string();
        let password = self.form.password.clone();

        let task = match self.form.mode {
            FormMode::SignIn => tokio::spawn(async move {
                if let Err(e) = store.sign_in(&email, &password).await {
                    debug!(error = %e, "Sign in did not complete");
                }
            }),
            FormMode::SignUp => {
                let full_name = self.form.full_name.trim().to_string();
                let organization = self.form.organization.trim().to_string();
                tokio::spawn(async move {
                    let org = (!organization.is_empty()).then_some(organization.as_str());
                    match store.sign_up(&email, &password, &full_name, org).await {
                        Ok(SignUpOutcome::Created) => debug!("Account created"),
                        Ok(SignUpOutcome::PendingVerification) => {
                            debug!("Account awaiting email confirmation")
                        }
                        Err(e) => debug!(error = %e, "Sign up did not complete"),
                    }
                })
            }
        };
        self.pending = Some(task);
    }

    pub fn sign_out(&mut self) {
        if self.is_busy() {
            return;
        }
        let store = self.store.clone();
        self.pending = Some(tokio::spawn(async move {
            if let Err(e) = store.sign_out().await {
                warn!(error = %e, "Sign out failed");
            }
        }));
    }

    pub fn reload_profile(&mut self) {
        if self.state.is_loading || !self.state.has_identity() {
            return;
        }
        self.spawn_profile_load();
    }

    pub fn clear_error(&mut self) {
        self.store.clear_error();
        self.state = self.store.snapshot();
    }

    fn spawn_profile_load(&self) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.load_profile().await {
                debug!(error = %e, "Profile load did not complete");
            }
        });
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some(message);
    }

    pub fn clear_status_message(&mut self) {
        self.status_message = None;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

#[cfg(test)]
pub(crate) fn test_app() -> App {
    use ragmaster_auth::SupabaseBackend;

    let backend = SupabaseBackend::new("http://127.0.0.1:9", "anon");
    let store = Arc::new(SessionStore::new(Arc::new(backend)));
    App::new(store, ThemeMode::Terminal)
}
