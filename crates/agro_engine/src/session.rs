use std::sync::Arc;

use agro_core::{AuthUser, SessionPhase, UserProfile};
use client_logging::client_warn;
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthError, IdentityBackend};
use crate::client::ApiClient;
use crate::error::ApiError;

/// Owned session context wrapping the identity backend.
///
/// Every successful sign-in/sign-up additionally upserts the user profile to
/// the backend; that secondary call's failure is returned separately as a
/// warning and never fails the primary auth flow.
pub struct SessionProvider {
    backend: Arc<dyn IdentityBackend>,
    api: Arc<ApiClient>,
}

impl SessionProvider {
    pub fn new(backend: Arc<dyn IdentityBackend>, api: Arc<ApiClient>) -> Self {
        Self { backend, api }
    }

    /// Resolve the current session once at startup.
    pub async fn bootstrap(&self) -> SessionPhase {
        match self.backend.current_user().await {
            Some(user) => SessionPhase::SignedIn(user),
            None => SessionPhase::SignedOut,
        }
    }

    async fn persist_profile(&self, user: &AuthUser) -> Option<ApiError> {
        match self.api.upsert_profile(&user.profile(), None).await {
            Ok(_) => None,
            Err(err) => {
                client_warn!("profile sync after auth failed: {err}");
                Some(err)
            }
        }
    }

    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> (Result<AuthUser, AuthError>, Option<ApiError>) {
        match self.backend.sign_in(email, password).await {
            Ok(user) => {
                let warning = self.persist_profile(&user).await;
                (Ok(user), warning)
            }
            Err(err) => (Err(err), None),
        }
    }

    /// Create the account, apply the registration name/photo to the new
    /// session, then persist the profile.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        photo: &str,
        password: &str,
    ) -> (Result<AuthUser, AuthError>, Option<ApiError>) {
        let user = match self.backend.create_account(email, password).await {
            Ok(user) => user,
            Err(err) => return (Err(err), None),
        };
        let display_name = (!name.trim().is_empty()).then(|| name.trim());
        let photo_url = (!photo.trim().is_empty()).then(|| photo.trim());
        let user = match self.backend.update_profile(display_name, photo_url).await {
            Ok(Some(updated)) => updated,
            Ok(None) => user,
            Err(err) => {
                client_warn!("profile update after registration failed: {err}");
                user
            }
        };
        let warning = self.persist_profile(&user).await;
        (Ok(user), warning)
    }

    pub async fn sign_in_federated(&self) -> (Result<AuthUser, AuthError>, Option<ApiError>) {
        match self.backend.sign_in_federated().await {
            Ok(user) => {
                let warning = self.persist_profile(&user).await;
                (Ok(user), warning)
            }
            Err(err) => (Err(err), None),
        }
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.backend.sign_out().await
    }

    /// Profile page save: the backend upsert is the primary operation; the
    /// auth-profile sync afterwards is secondary and downgraded to a warning.
    pub async fn save_profile(
        &self,
        profile: UserProfile,
    ) -> Result<(UserProfile, Option<AuthError>), ApiError> {
        let saved = self.api.upsert_profile(&profile, None).await?;
        let photo = (!saved.photo.is_empty()).then(|| saved.photo.as_str());
        let warning = match self
            .backend
            .update_profile(Some(&saved.name), photo)
            .await
        {
            Ok(_) => None,
            Err(err) => {
                client_warn!("auth profile sync after save failed: {err}");
                Some(err)
            }
        };
        Ok((saved, warning))
    }

    /// Profile view load: idempotent upsert seeded with session fallback
    /// values, so a first visit materializes the profile record.
    pub async fn profile_with_fallback(
        &self,
        email: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<UserProfile, ApiError> {
        let fallback = match self.backend.current_user().await {
            Some(user) if user.email == email => user.profile(),
            _ => UserProfile {
                email: email.to_string(),
                name: email.split('@').next().unwrap_or(email).to_string(),
                photo: String::new(),
            },
        };
        self.api.upsert_profile(&fallback, cancel).await
    }
}
