//! `/auth/*` endpoints.

use finboard_auth::Session;
use finboard_core::UserProfile;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::require;
use crate::errors::ApiError;
use crate::http::RequestClient;

/// Login form.
#[derive(Clone, Serialize)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Plain-text password, sent over the wire only.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Registration form.
#[derive(Clone, Serialize)]
pub struct Registration {
    /// Account email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Display name.
    pub full_name: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

/// Reply of login and register.
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token.
    #[serde(alias = "token")]
    pub access_token: String,
    /// Usually `bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Profile, when the backend includes it.
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Authentication endpoints.
pub struct AuthApi<'a> {
    client: &'a RequestClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a RequestClient) -> Self {
        Self { client }
    }

    /// `POST /auth/login`, then store the session.
    ///
    /// When the reply has no profile, `GET /auth/me` fills it in.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
        require(&credentials.email, "email")?;
        require(&credentials.password, "password")?;
        let reply: LoginResponse = self.client.post("auth/login", credentials).await?;
        self.establish(reply).await
    }

    /// `POST /auth/register`, then store the session.
    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, ApiError> {
        require(&registration.email, "email")?;
        require(&registration.password, "password")?;
        require(&registration.full_name, "full name")?;
        let reply: LoginResponse = self.client.post("auth/register", registration).await?;
        self.establish(reply).await
    }

    /// `GET /auth/me`, refreshing the stored profile.
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        let user: UserProfile = self.client.get("auth/me").await?;
        if let Err(e) = self.client.session().update_user(user.clone()) {
            warn!(error = %e, "failed to persist refreshed profile");
        }
        Ok(user)
    }

    async fn establish(&self, reply: LoginResponse) -> Result<UserProfile, ApiError> {
        let session = Session::new(reply.access_token, reply.user.clone());
        if let Err(e) = self.client.session().save(session) {
            warn!(error = %e, "failed to persist session");
        }
        let user = match reply.user {
            Some(user) => user,
            None => self.me().await?,
        };
        info!(user_id = %user.id, "logged in");
        Ok(user)
    }
}
