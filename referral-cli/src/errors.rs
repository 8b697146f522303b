use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Registration not sent: {0}")]
    RegistrationInvalid(String),

    #[error("A registration is already in progress")]
    RegistrationInFlight,
}
