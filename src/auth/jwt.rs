use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::account::Role;

#[derive(Clone)]
pub struct JwtService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    expiry: Duration,
}

impl JwtService {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            &config.jwt_secret,
            &config.jwt_issuer,
            &config.jwt_audience,
            config.jwt_expiry_minutes,
        ))
    }

    pub fn new(secret: &str, issuer: &str, audience: &str, expiry_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_owned(),
            audience: audience.to_owned(),
            expiry: Duration::minutes(expiry_minutes),
        }
    }

    pub fn expires_in_secs(&self) -> i64 {
        self.expiry.num_seconds()
    }

    /// The role claim mirrors the account role.
    pub fn generate_token(&self, subject: Uuid, username: &str, role: Role) -> Result<String> {
        let now = Utc::now();
        let exp = now + self.expiry;
        let claims = Claims {
            sub: subject,
            username: username.to_owned(),
            role,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(&[self.audience.clone()]);
        validation.set_issuer(&[self.issuer.clone()]);
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub iss: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_role_claim() {
        let jwt = JwtService::new("secret", "doccollect", "doccollect-clients", 5);
        let id = Uuid::new_v4();
        let token = jwt.generate_token(id, "pro@example.com", Role::Professional).unwrap();
        let claims = jwt.verify_token(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Professional);
    }

    #[test]
    fn rejects_foreign_audience() {
        let issuer = JwtService::new("secret", "doccollect", "other", 5);
        let verifier = JwtService::new("secret", "doccollect", "doccollect-clients", 5);
        let token = issuer.generate_token(Uuid::new_v4(), "x", Role::Client).unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }
}
