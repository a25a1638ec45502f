use serde::{Deserialize, Deserializer, Serialize};

/// Instagram returns ids as JSON numbers in some payloads and strings in others.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}

fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(u64),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Str(s)) if !s.is_empty() => Some(s),
        Some(Id::Num(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserShort {
    #[serde(deserialize_with = "id_string")]
    pub pk: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_private: Option<bool>,
}

/// One page of `friendships/{id}/followers/` or `friendships/{id}/following/`.
#[derive(Debug, Clone, Deserialize)]
pub struct FriendshipsPage {
    #[serde(default)]
    pub users: Vec<UserShort>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub next_max_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub logged_in_user: LoggedInUser,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggedInUser {
    #[serde(deserialize_with = "id_string")]
    pub pk: String,
    pub username: String,
}

/// Body of a rejected login (HTTP 400).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginFailure {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub two_factor_required: bool,
    #[serde(default)]
    pub two_factor_info: Option<TwoFactorInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwoFactorInfo {
    pub two_factor_identifier: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub obfuscated_phone_number: Option<String>,
    #[serde(default)]
    pub totp_two_factor_on: bool,
}

/// What the second login step needs to know about the pending challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoFactorChallenge {
    pub identifier: String,
    pub username: String,
    /// Where the code was sent, for the prompt ("SMS to ***12" or "authenticator app").
    pub delivery: String,
    pub totp: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebProfileInfo {
    pub data: WebProfileData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebProfileData {
    pub user: Option<WebProfileUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebProfileUser {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
}
