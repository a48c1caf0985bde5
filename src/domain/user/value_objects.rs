use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::UserError;

// ============================================================================
// User Value Objects
// ============================================================================

/// Staff role; stored and exchanged as its lowercase token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Greeter,
    OrderPicker,
    Manager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Greeter => "greeter",
            Role::OrderPicker => "order_picker",
            Role::Manager => "manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "greeter" => Ok(Role::Greeter),
            "order_picker" => Ok(Role::OrderPicker),
            "manager" => Ok(Role::Manager),
            other => Err(UserError::UnknownRole(other.to_string())),
        }
    }
}

/// User email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Trims and lowercases, then checks the basic shape.
    pub fn parse(email: impl AsRef<str>) -> Result<Self, UserError> {
        let email = email.as_ref().trim().to_lowercase();
        if email.is_empty() {
            return Err(UserError::EmptyEmail);
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(Self(email)),
            _ => Err(UserError::InvalidEmail(email)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_SPECIALS: &str = "!@#%$^&*.";

/// Password policy: length, upper, lower, digit and a special character.
pub fn validate_password(password: &str) -> Result<(), UserError> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(UserError::WeakPassword("password must be at least 8 characters long"));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(UserError::WeakPassword("password must contain at least one uppercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(UserError::WeakPassword("password must contain at least one lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(UserError::WeakPassword("password must contain at least one number"));
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(UserError::WeakPassword("password must contain at least one special character"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: Email,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated user ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserRecord {
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none() && self.role.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}
