use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 20;
pub const PASSWORD_MIN_CHARS: usize = 6;

/// A registered account as persisted under the accounts key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// argon2 PHC string; the plain password is never stored
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub(crate) fn new(username: &str, email: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Public view of an account (no credentials).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(a: &Account) -> Self {
        Self { id: a.id, username: a.username.clone(), email: a.email.clone(), created_at: a.created_at }
    }
}

/// Registration form payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

impl RegisterInput {
    /// The form asks for the password twice; an omitted confirmation is not checked.
    pub fn check_confirmation(&self) -> Result<(), ServiceError> {
        match &self.confirm_password {
            Some(confirm) if confirm != &self.password => {
                Err(ServiceError::validation("password and confirmation do not match"))
            }
            _ => Ok(()),
        }
    }
}

/// Login form payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

pub(crate) fn validate_username(username: &str) -> Result<(), ServiceError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
        return Err(ServiceError::validation(format!(
            "username must be {USERNAME_MIN_CHARS}-{USERNAME_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ServiceError::validation(format!(
            "password must be at least {PASSWORD_MIN_CHARS} characters"
        )));
    }
    Ok(())
}
