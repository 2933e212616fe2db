use serde::{Deserialize, Serialize};

/// GitHub numeric account id, reused as the local user id.
pub type UserId = i64;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GithubIdentity {
    #[serde(rename = "login")]
    pub username: String,
    pub id: UserId,
}

#[derive(Clone, Debug)]
pub struct UpsertUser {
    pub id: UserId,
    pub username: String,
    pub access_token: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
    pub code: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: UserId,
}

#[derive(Clone, Debug, Serialize)]
pub struct WhoAmIResponse {
    pub user_id: UserId,
}
