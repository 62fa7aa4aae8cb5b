use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

pub const DEFAULT_COUNTRY: &str = "France";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(ClientStatus::Active),
            "inactive" => Ok(ClientStatus::Inactive),
            other => Err(format!("unknown client status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_string()
}

impl Default for Address {
    fn default() -> Self {
        Self {
            street: String::new(),
            city: String::new(),
            postal_code: String::new(),
            country: default_country(),
        }
    }
}

impl Address {
    fn trimmed(self) -> Self {
        let country = self.country.trim();
        Self {
            street: self.street.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: if country.is_empty() {
                default_country()
            } else {
                country.to_string()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub notes: String,
    pub created_by: Option<Uuid>,
    pub status: ClientStatus,
    pub documents_count: i32,
    pub pending_documents: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client form input as submitted by a professional.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ClientDraft {
    #[validate(length(min = 1, message = "first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "last name is required"))]
    pub last_name: String,
    #[validate(email(message = "a valid email address is required"))]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub notes: String,
    pub created_by: Uuid,
    pub status: ClientStatus,
}

impl ClientDraft {
    /// Trims every field and validates the result into an insertable client.
    pub fn into_new_client(self, owner: Uuid) -> Result<NewClient, String> {
        let draft = ClientDraft {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            address: self.address.trimmed(),
            notes: self.notes.trim().to_string(),
        };
        draft
            .validate()
            .map_err(|errors| validation_message(&errors))?;

        Ok(NewClient {
            id: Uuid::new_v4(),
            full_name: format!("{} {}", draft.first_name, draft.last_name),
            first_name: draft.first_name,
            last_name: draft.last_name,
            email: draft.email,
            phone: draft.phone,
            address: draft.address,
            notes: draft.notes,
            created_by: owner,
            status: ClientStatus::Active,
        })
    }
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub notes: Option<String>,
    pub status: Option<ClientStatus>,
}

impl ClientUpdate {
    pub fn normalize(self, current: &Client) -> Result<NormalizedClientUpdate, String> {
        let first_name = match self.first_name {
            Some(value) if value.trim().is_empty() => {
                return Err("first name is required".to_string())
            }
            Some(value) => value.trim().to_string(),
            None => current.first_name.clone(),
        };
        let last_name = match self.last_name {
            Some(value) if value.trim().is_empty() => {
                return Err("last name is required".to_string())
            }
            Some(value) => value.trim().to_string(),
            None => current.last_name.clone(),
        };
        let email = match self.email {
            Some(value) => {
                let value = value.trim().to_lowercase();
                if !validator::ValidateEmail::validate_email(&value) {
                    return Err("a valid email address is required".to_string());
                }
                value
            }
            None => current.email.clone(),
        };

        Ok(NormalizedClientUpdate {
            full_name: format!("{first_name} {last_name}"),
            first_name,
            last_name,
            email,
            phone: self
                .phone
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| current.phone.clone()),
            address: self
                .address
                .map(Address::trimmed)
                .unwrap_or_else(|| current.address.clone()),
            notes: self
                .notes
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| current.notes.clone()),
            status: self.status.unwrap_or(current.status),
        })
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedClientUpdate {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub notes: String,
    pub status: ClientStatus,
}

/// Flattens validator output into one deterministic message.
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            field_errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|message| message.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"))
            })
        })
        .collect();
    messages.sort();
    messages.dedup();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ClientDraft {
        ClientDraft {
            first_name: " Jean ".into(),
            last_name: "Dupont".into(),
            email: " Jean.Dupont@Example.COM ".into(),
            phone: "0612345678".into(),
            address: Address::default(),
            notes: String::new(),
        }
    }

    #[test]
    fn normalizes_names_and_email() {
        let owner = Uuid::new_v4();
        let client = draft().into_new_client(owner).expect("valid draft");
        assert_eq!(client.full_name, "Jean Dupont");
        assert_eq!(client.email, "jean.dupont@example.com");
        assert_eq!(client.created_by, owner);
        assert_eq!(client.status, ClientStatus::Active);
        assert_eq!(client.address.country, DEFAULT_COUNTRY);
    }

    #[test]
    fn rejects_blank_first_name() {
        let mut input = draft();
        input.first_name = "   ".into();
        let err = input.into_new_client(Uuid::new_v4()).unwrap_err();
        assert_eq!(err, "first name is required");
    }

    #[test]
    fn rejects_malformed_email() {
        let mut input = draft();
        input.email = "not-an-email".into();
        let err = input.into_new_client(Uuid::new_v4()).unwrap_err();
        assert!(err.contains("valid email"));
    }
}
