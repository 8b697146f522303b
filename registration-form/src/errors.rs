use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const INVITOR_NOT_FOUND: &str = "Invitor not found";
pub const USER_ID_TAKEN: &str = "User ID already exists";
pub const FIELDS_REQUIRED: &str = "All fields are required";

/// Where a validation message is shown.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    InvitorId,
    YourId,
    /// Form-level message, not tied to one input
    Form,
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKey::InvitorId => "invitorId",
            FieldKey::YourId => "yourId",
            FieldKey::Form => "form",
        };
        f.write_str(name)
    }
}

/// Inline validation messages, at most one per key.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<FieldKey, String>);

impl FieldErrors {
    pub fn get(&self, key: FieldKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn set(&mut self, key: FieldKey, message: impl Into<String>) {
        self.0.insert(key, message.into());
    }

    pub fn clear(&mut self, key: FieldKey) {
        self.0.remove(&key);
    }

    pub fn clear_all(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}
