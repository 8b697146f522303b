use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A registered user as the API reports it. Only `name` is guaranteed;
/// any keys this client doesn't know about are kept in `extra`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct User {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitor_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl User {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_id: Some(user_id.into()),
            invitor_id: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Body of `POST /register`. Built per submit and dropped afterwards.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub invitor_id: String,
    pub invitor_name: String,
    pub user_id: String,
    pub name: String,
}
