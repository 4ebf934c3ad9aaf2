//! Access gate in front of the dashboard.
//!
//! The pipeline never looks at credentials. A [`CredentialStore`] answers
//! whether a username/password pair is valid and a [`SessionContext`] records
//! who is logged in, so whichever component needs identity gets it passed in
//! explicitly.

use crate::error::{DashboardError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use log::{info, warn};
use std::collections::HashMap;

pub trait CredentialStore {
    fn verify(&self, username: &str, password: &str) -> Result<bool>;
}

/// Username to Argon2 PHC string. Stands in for the users table of a real
/// deployment.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    users: HashMap<String, String>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self, username: &str, password: &str) -> Result<()> {
        let hash = hash_password(password)?;
        self.users.insert(username.to_string(), hash);
        Ok(())
    }

    /// Registers a user whose hash was produced elsewhere.
    pub fn add_user_with_hash(&mut self, username: &str, password_hash: &str) -> Result<()> {
        PasswordHash::new(password_hash)
            .map_err(|e| DashboardError::CredentialStore(format!("invalid password hash: {e}")))?;
        self.users
            .insert(username.to_string(), password_hash.to_string());
        Ok(())
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn verify(&self, username: &str, password: &str) -> Result<bool> {
        match self.users.get(username) {
            Some(hash) => verify_password(password, hash),
            None => Ok(false),
        }
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DashboardError::CredentialStore(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| DashboardError::CredentialStore(format!("invalid password hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Who is logged in for the current dashboard session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    username: Option<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login<S: CredentialStore + ?Sized>(
        &mut self,
        store: &S,
        username: &str,
        password: &str,
    ) -> Result<()> {
        if username.trim().is_empty() || password.trim().is_empty() {
            return Err(DashboardError::EmptyCredentials);
        }

        if !store.verify(username, password)? {
            warn!("Rejected login for {}", username);
            return Err(DashboardError::InvalidCredentials);
        }

        info!("User {} logged in", username);
        self.username = Some(username.to_string());
        Ok(())
    }

    pub fn logout(&mut self) {
        if let Some(username) = self.username.take() {
            info!("User {} logged out", username);
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn require_login(&self) -> Result<&str> {
        self.username().ok_or(DashboardError::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryCredentialStore {
        let mut store = InMemoryCredentialStore::new();
        store.add_user("admin", "s3cret").unwrap();
        store
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
        assert!(verify_password("s3cret", "not-a-hash").is_err());
    }

    #[test]
    fn test_login_and_logout() {
        let store = store();
        let mut session = SessionContext::new();
        assert!(matches!(
            session.require_login(),
            Err(DashboardError::NotAuthenticated)
        ));

        session.login(&store, "admin", "s3cret").unwrap();
        assert_eq!(session.username(), Some("admin"));
        assert_eq!(session.require_login().unwrap(), "admin");

        session.logout();
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_login_rejects_blank_and_wrong_credentials() {
        let store = store();
        let mut session = SessionContext::new();

        assert!(matches!(
            session.login(&store, "  ", "s3cret"),
            Err(DashboardError::EmptyCredentials)
        ));
        assert!(matches!(
            session.login(&store, "admin", ""),
            Err(DashboardError::EmptyCredentials)
        ));
        assert!(matches!(
            session.login(&store, "admin", "nope"),
            Err(DashboardError::InvalidCredentials)
        ));
        assert!(matches!(
            session.login(&store, "ghost", "s3cret"),
            Err(DashboardError::InvalidCredentials)
        ));
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_add_user_with_existing_hash() {
        let hash = hash_password("pw").unwrap();
        let mut store = InMemoryCredentialStore::new();
        store.add_user_with_hash("owner", &hash).unwrap();
        assert!(store.contains("owner"));
        assert!(store.verify("owner", "pw").unwrap());
        assert!(store.add_user_with_hash("bad", "plaintext").is_err());
    }
}
