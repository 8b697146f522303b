use log::{debug, info, warn};
use referral_shared::api::ReferralApi;
use referral_shared::config::ClientConfig;
use referral_shared::models::{RegistrationRequest, User};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::{FieldErrors, FieldKey, FIELDS_REQUIRED, INVITOR_NOT_FOUND, USER_ID_TAKEN};
use crate::models::{FormSnapshot, SubmitOutcome};
use crate::validation::ValidationTasks;

pub const SUCCESS_MESSAGE: &str = "Registered successfully!";

/// Called with the user the service returned after a successful
/// registration.
pub type SuccessHook = Box<dyn Fn(Option<&User>) + Send + Sync>;

#[derive(Debug, Default)]
struct FormState {
    invitor_id: String,
    invitor_name: String,
    your_id: String,
    your_name: String,
    errors: FieldErrors,
    message: Option<String>,
    loading: bool,
    // bumped on every change; a validation result is only applied if the
    // generation it started with is still current
    invitor_generation: u64,
    your_id_generation: u64,
}

fn lock(state: &Mutex<FormState>) -> MutexGuard<'_, FormState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Controller behind the "Register User" form.
///
/// Setting `invitor_id` looks the invitor up and fills in their name;
/// setting `your_id` checks the id isn't taken. Both checks run in the
/// background and a newer value always wins over an older, slower one.
pub struct RegisterForm<A: ReferralApi + 'static> {
    api: Arc<A>,
    state: Arc<Mutex<FormState>>,
    validations: ValidationTasks<FieldKey>,
    on_success: Option<SuccessHook>,
}

impl<A: ReferralApi + 'static> RegisterForm<A> {
    pub fn new(api: Arc<A>, config: &ClientConfig) -> Self {
        let state = FormState {
            invitor_id: config.default_invitor_id.trim().to_string(),
            ..FormState::default()
        };

        Self {
            api,
            state: Arc::new(Mutex::new(state)),
            validations: ValidationTasks::new(config.validation_debounce),
            on_success: None,
        }
    }

    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&User>) + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(hook));
        self
    }

    /// Runs both validations for the current values, as on first display.
    /// Must be called from within a tokio runtime.
    pub fn mount(&self) {
        let (invitor_id, your_id) = {
            let state = self.state();
            (state.invitor_id.clone(), state.your_id.clone())
        };
        self.validate_invitor(invitor_id);
        self.validate_your_id(your_id);
    }

    pub fn set_invitor_id(&self, value: &str) {
        let value = value.trim().to_string();
        {
            let mut state = self.state();
            if state.invitor_id == value {
                return;
            }
            state.invitor_id = value.clone();
        }
        self.validate_invitor(value);
    }

    pub fn set_your_id(&self, value: &str) {
        let value = value.trim().to_string();
        {
            let mut state = self.state();
            if state.your_id == value {
                return;
            }
            state.your_id = value.clone();
        }
        self.validate_your_id(value);
    }

    pub fn set_your_name(&self, value: &str) {
        self.state().your_name = value.to_string();
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let state = self.state();
        FormSnapshot {
            invitor_id: state.invitor_id.clone(),
            invitor_name: state.invitor_name.clone(),
            your_id: state.your_id.clone(),
            your_name: state.your_name.clone(),
            errors: state.errors.clone(),
            message: state.message.clone(),
            loading: state.loading,
        }
    }

    pub fn is_validating(&self) -> bool {
        self.validations.is_pending(FieldKey::InvitorId)
            || self.validations.is_pending(FieldKey::YourId)
    }

    /// Waits for every pending field validation to finish.
    pub async fn settle(&self) {
        self.validations.settle().await;
    }

    /// Sends the registration with the current field values.
    ///
    /// Field errors from the background checks don't stop the submit; the
    /// service has the final word on uniqueness.
    pub async fn submit(&self) -> SubmitOutcome {
        let request = {
            let mut state = self.state();
            if state.loading {
                debug!("Submit ignored, registration already in flight");
                return SubmitOutcome::InFlight;
            }

            // Start from a clean slate, like a fresh click
            state.message = None;
            state.errors.clear_all();

            // Required fields are checked locally; nothing is sent without them
            if state.your_id.is_empty() || state.your_name.is_empty() {
                state.errors.set(FieldKey::Form, FIELDS_REQUIRED);
                return SubmitOutcome::Invalid(FIELDS_REQUIRED.to_string());
            }

            // Build the request from the current field values
            state.loading = true;
            RegistrationRequest {
                invitor_id: state.invitor_id.clone(),
                invitor_name: state.invitor_name.clone(),
                user_id: state.your_id.clone(),
                name: state.your_name.clone(),
            }
        };
        let _loading = LoadingGuard(&self.state);

        info!(
            "Registering user_id={} under invitor_id={}",
            request.user_id, request.invitor_id
        );

        match self.api.register_user(&request).await {
            Ok(user) => {
                info!("Registered user_id={}", request.user_id);
                self.state().message = Some(SUCCESS_MESSAGE.to_string());

                // Clear the new user's fields but keep the invitor for the next one
                self.set_your_id("");
                self.set_your_name("");

                // Let the caller refresh anything derived from the tree
                if let Some(hook) = &self.on_success {
                    hook(user.as_ref());
                }
                SubmitOutcome::Registered(user)
            }
            Err(e) => {
                // Surface the service's message as a form-level error
                let message = e.to_string();
                warn!("Registration of user_id={} failed: {}", request.user_id, message);
                self.state().errors.set(FieldKey::Form, message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }

    fn validate_invitor(&self, invitor_id: String) {
        let generation = {
            let mut state = self.state();
            state.invitor_generation += 1;
            if invitor_id.is_empty() {
                state.invitor_name.clear();
                state.errors.clear(FieldKey::InvitorId);
            }
            state.invitor_generation
        };

        if invitor_id.is_empty() {
            self.validations.cancel(FieldKey::InvitorId);
            return;
        }

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        self.validations.schedule(FieldKey::InvitorId, async move {
            let result = api.get_user_by_id(&invitor_id).await;

            let mut state = lock(&state);
            if state.invitor_generation != generation {
                debug!("Discarding stale invitor lookup for {}", invitor_id);
                return;
            }

            match result {
                Ok(Some(user)) => {
                    debug!("Invitor {} is {}", invitor_id, user.name);
                    state.invitor_name = user.name;
                    state.errors.clear(FieldKey::InvitorId);
                }
                Ok(None) => {
                    debug!("Invitor {} not found", invitor_id);
                    state.invitor_name.clear();
                    state.errors.set(FieldKey::InvitorId, INVITOR_NOT_FOUND);
                }
                Err(e) => {
                    warn!("Invitor lookup for {} failed: {}", invitor_id, e);
                    state.invitor_name.clear();
                    state.errors.set(FieldKey::InvitorId, INVITOR_NOT_FOUND);
                }
            }
        });
    }

    fn validate_your_id(&self, user_id: String) {
        let generation = {
            let mut state = self.state();
            state.your_id_generation += 1;
            if user_id.is_empty() {
                state.errors.clear(FieldKey::YourId);
            }
            state.your_id_generation
        };

        if user_id.is_empty() {
            self.validations.cancel(FieldKey::YourId);
            return;
        }

        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        self.validations.schedule(FieldKey::YourId, async move {
            let result = api.check_exists(&user_id).await;

            let mut state = lock(&state);
            if state.your_id_generation != generation {
                debug!("Discarding stale existence check for {}", user_id);
                return;
            }

            match result {
                Ok(true) => state.errors.set(FieldKey::YourId, USER_ID_TAKEN),
                Ok(false) => state.errors.clear(FieldKey::YourId),
                Err(e) => {
                    // the service enforces uniqueness on register anyway
                    warn!("Existence check for {} failed: {}", user_id, e);
                    state.errors.clear(FieldKey::YourId);
                }
            }
        });
    }

    fn state(&self) -> MutexGuard<'_, FormState> {
        lock(&self.state)
    }
}

/// Clears `loading` when the submit finishes or its future is dropped.
struct LoadingGuard<'a>(&'a Mutex<FormState>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        lock(self.0).loading = false;
    }
}
