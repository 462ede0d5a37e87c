use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// A registered account.
///
/// Serializing a `User` only ever yields its public profile: the password hash,
/// the session token list and the avatar bytes are skipped.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub age: Option<i32>,
    #[serde(skip_serializing)]
    pub avatar: Option<Vec<u8>>,
    /// Active session tokens, oldest first.
    #[serde(skip_serializing)]
    pub tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Signup payload. Unknown keys are ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct UserInput {
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 7), custom = "not_containing_password")]
    pub password: String,
    #[validate(range(min = 0))]
    pub age: Option<i32>,
}

impl UserInput {
    /// Trims the name and email and lower-cases the email.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            ..self
        }
    }
}

/// Profile patch. Only the keys in [`UserUpdate::ALLOWED_FIELDS`] may be present.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(custom = "not_blank")]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 7), custom = "not_containing_password")]
    pub password: Option<String>,
    #[validate(range(min = 0))]
    pub age: Option<i32>,
}

impl UserUpdate {
    pub const ALLOWED_FIELDS: &'static [&'static str] = &["name", "email", "password", "age"];

    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|name| name.trim().to_string()),
            email: self.email.as_deref().map(normalize_email),
            ..self
        }
    }
}

/// A user record ready to be persisted (password already hashed).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: Option<i32>,
}

/// Field changes applied by a profile update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub age: Option<i32>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn not_containing_password(value: &str) -> Result<(), ValidationError> {
    if value.to_lowercase().contains("password") {
        let mut error = ValidationError::new("weak_password");
        error.message = Some("Password cannot contain \"password\"".into());
        return Err(error);
    }
    Ok(())
}
