use chrono::Utc;
use tracing::info;
use validator::ValidateEmail;

use crate::auth::password::{hash_password, verify_password};
use crate::domain::account::{ClientAccount, NewUser, Role, User};
use crate::repository::{Repository, UserStore};

use super::{ServiceError, ServiceResult};

pub const MIN_PASSWORD_LENGTH: usize = 8;

fn validate_credentials(email: &str, password: &str) -> ServiceResult<String> {
    let email = email.trim().to_lowercase();
    if !email.validate_email() {
        return Err(ServiceError::Validation(
            "a valid email address is required".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(email)
}

/// Creates an account with an explicit role. Quota follows the role.
pub fn create_user(
    repo: &dyn Repository,
    email: &str,
    password: &str,
    role: Role,
) -> ServiceResult<User> {
    let email = validate_credentials(email, password)?;
    if repo.find_user_by_username(&email)?.is_some() {
        return Err(ServiceError::Conflict(format!(
            "an account already exists for {email}"
        )));
    }
    let hash = hash_password(password).map_err(|err| ServiceError::Internal(err.to_string()))?;
    let user = repo.create_user(&NewUser::bootstrap(&email, hash, role))?;
    info!(
        component = "accounts",
        user_id = %user.id,
        role = %user.role,
        quota = user.quota_remaining,
        "account created"
    );
    Ok(user)
}

/// Self-registration always yields a client account.
pub fn register(repo: &dyn Repository, email: &str, password: &str) -> ServiceResult<User> {
    create_user(repo, email, password, Role::Client)
}

pub fn authenticate(repo: &dyn Repository, username: &str, password: &str) -> ServiceResult<User> {
    let username = username.trim().to_lowercase();
    let user = repo
        .find_user_by_username(&username)?
        .ok_or(ServiceError::InvalidCredentials)?;
    let valid = verify_password(password, &user.password_hash)
        .map_err(|_| ServiceError::InvalidCredentials)?;
    if !valid {
        return Err(ServiceError::InvalidCredentials);
    }
    Ok(user)
}

/// Checks one-time credentials issued with a request email and stamps the login.
pub fn authenticate_client(
    repo: &dyn Repository,
    email: &str,
    password: &str,
) -> ServiceResult<ClientAccount> {
    let email = email.trim().to_lowercase();
    let mut account = repo
        .find_client_account_by_email(&email)?
        .ok_or(ServiceError::InvalidCredentials)?;
    if !account.is_active {
        return Err(ServiceError::InvalidCredentials);
    }
    let valid = verify_password(password, &account.password_hash)
        .map_err(|_| ServiceError::InvalidCredentials)?;
    if !valid {
        return Err(ServiceError::InvalidCredentials);
    }
    let now = Utc::now();
    repo.record_client_login(account.id, now)?;
    account.last_login_at = Some(now);
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    #[test]
    fn registration_creates_client_without_quota() {
        let repo = MemoryRepository::new();
        let user = register(&repo, "New@Example.com", "longenough").unwrap();
        assert_eq!(user.role, Role::Client);
        assert_eq!(user.quota_remaining, 0);
        assert_eq!(user.username, "new@example.com");
    }

    #[test]
    fn duplicate_registration_conflicts() {
        let repo = MemoryRepository::new();
        register(&repo, "a@example.com", "longenough").unwrap();
        let err = register(&repo, "A@example.com", "longenough").unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn short_password_is_rejected() {
        let repo = MemoryRepository::new();
        let err = register(&repo, "a@example.com", "short").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn wrong_password_is_invalid_credentials() {
        let repo = MemoryRepository::new();
        create_user(&repo, "pro@example.com", "longenough", Role::Professional).unwrap();
        assert!(authenticate(&repo, "pro@example.com", "longenough").is_ok());
        assert!(matches!(
            authenticate(&repo, "pro@example.com", "wrongpass"),
            Err(ServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&repo, "nobody@example.com", "longenough"),
            Err(ServiceError::InvalidCredentials)
        ));
    }
}
