use serde::Deserialize;

use super::{Forest, User};

// Response DTOs for the referral API

#[derive(Deserialize, Debug)]
pub struct ExistsResponse {
    pub exists: bool,
}

#[derive(Deserialize, Debug)]
pub struct UserLookupResponse {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Deserialize, Debug)]
pub struct RegisterResponse {
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Deserialize, Debug)]
pub struct TreeResponse {
    #[serde(default)]
    pub forest: Option<Forest>,
}
