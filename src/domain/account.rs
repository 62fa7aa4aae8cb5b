use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quota granted to professional and admin accounts on creation.
pub const PROFESSIONAL_QUOTA: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Client,
    Professional,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Professional => "professional",
            Role::Admin => "admin",
        }
    }

    pub fn default_quota(&self) -> i32 {
        match self {
            Role::Client => 0,
            Role::Professional | Role::Admin => PROFESSIONAL_QUOTA,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "professional" => Ok(Role::Professional),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub quota_remaining: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub quota_remaining: i32,
}

impl NewUser {
    /// Account bootstrap: the role decides the starting quota.
    pub fn bootstrap(username: &str, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.trim().to_lowercase(),
            password_hash,
            role,
            quota_remaining: role.default_quota(),
        }
    }
}

/// Login issued to a client together with a document request email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAccount {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub request_id: Uuid,
    pub client_name: String,
    pub is_active: bool,
    pub generated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewClientAccount {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub request_id: Uuid,
    pub client_name: String,
    pub generated_at: DateTime<Utc>,
}
