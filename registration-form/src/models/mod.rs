use referral_shared::models::User;
use serde::Serialize;

use crate::errors::FieldErrors;

/// Point-in-time copy of everything the form shows.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub invitor_id: String,
    pub invitor_name: String,
    pub your_id: String,
    pub your_name: String,
    pub errors: FieldErrors,
    pub message: Option<String>,
    pub loading: bool,
}

/// Result of one click on "Register".
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The service accepted the registration
    Registered(Option<User>),
    /// Required fields were missing; nothing was sent
    Invalid(String),
    /// The service call failed; carries the message shown on the form
    Failed(String),
    /// Another submit is still in flight; nothing was sent
    InFlight,
}

impl SubmitOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, SubmitOutcome::Registered(_))
    }
}
