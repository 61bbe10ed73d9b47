use std::collections::HashMap;
use std::sync::Mutex;

use agro_core::AuthUser;
use thiserror::Error;

/// Identity-provider failures, mapped to the messages the UI shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password is too weak")]
    WeakPassword,
    #[error("Email is already in use")]
    EmailInUse,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("No account found for this email")]
    UserNotFound,
    #[error("Too many attempts, try again later")]
    TooManyAttempts,
    #[error("Sign-in was cancelled")]
    Cancelled,
    #[error("Identity provider error: {0}")]
    Backend(String),
}

/// Seam to the third-party identity provider. The real provider is an
/// external collaborator; [`LocalIdentityBackend`] stands in for development
/// and tests.
#[async_trait::async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Session currently attached to this client, if any.
    async fn current_user(&self) -> Option<AuthUser>;

    async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    /// Provider popup/redirect flow; fails with [`AuthError::Cancelled`] when
    /// dismissed or blocked.
    async fn sign_in_federated(&self) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Merge partial profile fields into the current session. Returns `None`
    /// (a no-op) when there is no session.
    async fn update_profile(
        &self,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Option<AuthUser>, AuthError>;
}

const MAX_FAILED_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
struct LocalAccount {
    password: String,
    user: AuthUser,
}

#[derive(Debug, Default)]
struct LocalState {
    accounts: HashMap<String, LocalAccount>,
    current: Option<AuthUser>,
    failed_attempts: HashMap<String, u32>,
    federated: Option<AuthUser>,
}

/// In-memory identity backend used for local development and tests.
///
/// Sessions live only as long as the process; nothing is persisted, matching
/// the provider contract that session storage is the provider's own concern.
#[derive(Debug, Default)]
pub struct LocalIdentityBackend {
    state: Mutex<LocalState>,
}

impl LocalIdentityBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the user the federated popup flow signs in as.
    pub fn with_federated_user(user: AuthUser) -> Self {
        let backend = Self::default();
        backend
            .state
            .lock()
            .expect("lock identity state")
            .federated = Some(user);
        backend
    }

    /// Seed an existing account (test setup).
    pub fn seed_account(&self, email: &str, password: &str, user: AuthUser) {
        let mut state = self.state.lock().expect("lock identity state");
        state.accounts.insert(
            email.to_string(),
            LocalAccount {
                password: password.to_string(),
                user,
            },
        );
    }
}

#[async_trait::async_trait]
impl IdentityBackend for LocalIdentityBackend {
    async fn current_user(&self) -> Option<AuthUser> {
        self.state.lock().expect("lock identity state").current.clone()
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.len() < 6 {
            return Err(AuthError::WeakPassword);
        }
        let mut state = self.state.lock().expect("lock identity state");
        if state.accounts.contains_key(email) {
            return Err(AuthError::EmailInUse);
        }
        let user = AuthUser::new(email);
        state.accounts.insert(
            email.to_string(),
            LocalAccount {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        state.current = Some(user.clone());
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let mut state = self.state.lock().expect("lock identity state");
        let attempts = state.failed_attempts.get(email).copied().unwrap_or(0);
        if attempts >= MAX_FAILED_ATTEMPTS {
            return Err(AuthError::TooManyAttempts);
        }
        let account = match state.accounts.get(email) {
            Some(account) => account.clone(),
            None => return Err(AuthError::UserNotFound),
        };
        if account.password != password {
            *state.failed_attempts.entry(email.to_string()).or_insert(0) += 1;
            return Err(AuthError::InvalidCredentials);
        }
        state.failed_attempts.remove(email);
        state.current = Some(account.user.clone());
        Ok(account.user)
    }

    async fn sign_in_federated(&self) -> Result<AuthUser, AuthError> {
        let mut state = self.state.lock().expect("lock identity state");
        match state.federated.clone() {
            Some(user) => {
                state
                    .accounts
                    .entry(user.email.clone())
                    .or_insert_with(|| LocalAccount {
                        password: String::new(),
                        user: user.clone(),
                    });
                state.current = Some(user.clone());
                Ok(user)
            }
            None => Err(AuthError::Cancelled),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.state.lock().expect("lock identity state").current = None;
        Ok(())
    }

    async fn update_profile(
        &self,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Option<AuthUser>, AuthError> {
        let mut state = self.state.lock().expect("lock identity state");
        let current = match state.current.as_mut() {
            Some(current) => current,
            None => return Ok(None),
        };
        if let Some(name) = display_name {
            current.display_name = Some(name.to_string());
        }
        if let Some(photo) = photo_url {
            current.photo_url = Some(photo.to_string());
        }
        let updated = current.clone();
        if let Some(account) = state.accounts.get_mut(&updated.email) {
            account.user = updated.clone();
        }
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_account_validates_inputs() {
        let backend = LocalIdentityBackend::new();
        assert_eq!(
            backend.create_account("no-at-sign", "Secret1").await,
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(
            backend.create_account("a@b.com", "short").await,
            Err(AuthError::WeakPassword)
        );
        assert!(backend.create_account("a@b.com", "Secret1").await.is_ok());
        assert_eq!(
            backend.create_account("a@b.com", "Secret1").await,
            Err(AuthError::EmailInUse)
        );
    }

    #[tokio::test]
    async fn sign_in_locks_after_repeated_failures() {
        let backend = LocalIdentityBackend::new();
        backend.seed_account("a@b.com", "Secret1", AuthUser::new("a@b.com"));
        for _ in 0..MAX_FAILED_ATTEMPTS {
            assert_eq!(
                backend.sign_in("a@b.com", "wrong").await,
                Err(AuthError::InvalidCredentials)
            );
        }
        assert_eq!(
            backend.sign_in("a@b.com", "Secret1").await,
            Err(AuthError::TooManyAttempts)
        );
    }

    #[tokio::test]
    async fn update_profile_is_noop_when_signed_out() {
        let backend = LocalIdentityBackend::new();
        let result = backend.update_profile(Some("Name"), None).await;
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn federated_sign_in_requires_configuration() {
        let backend = LocalIdentityBackend::new();
        assert_eq!(backend.sign_in_federated().await, Err(AuthError::Cancelled));

        let backend =
            LocalIdentityBackend::with_federated_user(AuthUser::new("fed@example.com"));
        let user = backend.sign_in_federated().await.expect("federated user");
        assert_eq!(user.email, "fed@example.com");
        assert_eq!(backend.current_user().await, Some(user));
    }
}
