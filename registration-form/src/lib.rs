//! Registration form controller: field state, asynchronous field
//! validation against the referral API, and submission.

pub mod errors;
pub mod form;
pub mod models;
pub mod validation;

pub use errors::{FieldErrors, FieldKey};
pub use form::RegisterForm;
pub use models::{FormSnapshot, SubmitOutcome};

#[cfg(test)]
mod tests;
