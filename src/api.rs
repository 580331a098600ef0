use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::session::{PortalConfig, TokenStore};
use crate::types::{Identity, Session, UserId};

/// HTTP client for the portal backend.
///
/// Every request carries `Authorization: Bearer <token>` when the injected
/// token store holds a session. The store is the only token source; state
/// held anywhere else never reaches the wire.
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
}

/// Identity plus session, as returned by the credential and federated
/// sign-in endpoints.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct AuthPayload {
    pub user: Identity,
    pub session: Session,
}

/// Response from the boot-time session probe.
///
/// The backend returns either both halves or `null` for both; a lone half
/// is treated as no session.
#[derive(Debug, Clone, Default, Deserialize)]
#[non_exhaustive]
pub struct SessionProbe {
    #[serde(default)]
    pub user: Option<Identity>,
    #[serde(default)]
    pub session: Option<Session>,
}

impl SessionProbe {
    /// Both halves or nothing.
    #[must_use]
    pub fn into_authenticated(self) -> Option<(Identity, Session)> {
        match (self.user, self.session) {
            (Some(user), Some(session)) => Some((user, session)),
            _ => None,
        }
    }
}

/// Request body for `POST /auth/verify-phone`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyPhoneRequest {
    pub phone: String,
    pub otp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// Profile fields confirmed by a successful code check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct VerifiedProfile {
    pub phone: String,
    pub phone_verified: bool,
    #[serde(default)]
    pub name: Option<String>,
}

/// Response from `POST /auth/verify-phone`.
///
/// `user` and `session` appear when the verification doubled as a first
/// registration; established accounts get the profile alone.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct VerifyPhoneResponse {
    #[serde(default)]
    pub success: bool,
    pub profile: VerifiedProfile,
    #[serde(default)]
    pub user: Option<Identity>,
    #[serde(default)]
    pub session: Option<Session>,
}

/// Response from `POST /auth/send-otp`.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct OtpDispatch {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Echoed by development backends only; production omits it.
    #[serde(default)]
    pub otp: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ApiClient {
    /// Create a new portal client.
    #[must_use]
    pub fn new(config: &PortalConfig, store: Arc<dyn TokenStore>) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            http: reqwest::Client::new(),
            store,
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] with
    /// the backend-reported reason when the credentials are rejected.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, Error> {
        let response = self
            .request(reqwest::Method::POST, "auth/login")?
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let response =
            Self::ensure_success(response, "login", "authentication failed").await?;
        response.json::<AuthPayload>().await.map_err(Into::into)
    }

    /// Create an account with email, password, and display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// backend rejects the registration.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthPayload, Error> {
        let response = self
            .request(reqwest::Method::POST, "auth/register")?
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "name": name,
            }))
            .send()
            .await?;

        let response =
            Self::ensure_success(response, "register", "registration failed").await?;
        response.json::<AuthPayload>().await.map_err(Into::into)
    }

    /// Exchange a provider access token for a portal session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// backend cannot establish a session from the token.
    pub async fn login_with_google(&self, access_token: &str) -> Result<AuthPayload, Error> {
        let response = self
            .request(reqwest::Method::POST, "auth/google-login")?
            .json(&serde_json::json!({ "access_token": access_token }))
            .send()
            .await?;

        let response =
            Self::ensure_success(response, "google login", "Google authentication failed")
                .await?;
        response.json::<AuthPayload>().await.map_err(Into::into)
    }

    /// Probe the backend for a live session behind the stored token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on an
    /// unexpected backend response. A valid "no session" answer is not an
    /// error.
    pub async fn fetch_session(&self) -> Result<SessionProbe, Error> {
        let response = self
            .request(reqwest::Method::GET, "auth/session")?
            .send()
            .await?;

        let response =
            Self::ensure_success(response, "session probe", "session probe failed").await?;
        response.json::<SessionProbe>().await.map_err(Into::into)
    }

    /// Ask the backend to text a one-time code to `phone`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// backend could not dispatch the code.
    pub async fn send_otp(&self, phone: &str) -> Result<OtpDispatch, Error> {
        let response = self
            .request(reqwest::Method::POST, "auth/send-otp")?
            .json(&serde_json::json!({ "phone": phone }))
            .send()
            .await?;

        let response =
            Self::ensure_success(response, "send otp", "could not send code").await?;
        response.json::<OtpDispatch>().await.map_err(Into::into)
    }

    /// Submit a one-time code for verification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// backend rejects the code.
    pub async fn verify_phone(
        &self,
        request: &VerifyPhoneRequest,
    ) -> Result<VerifyPhoneResponse, Error> {
        let response = self
            .request(reqwest::Method::POST, "auth/verify-phone")?
            .json(request)
            .send()
            .await?;

        let response = Self::ensure_success(response, "verify phone", "invalid code").await?;
        response
            .json::<VerifyPhoneResponse>()
            .await
            .map_err(Into::into)
    }

    /// Tell the backend to invalidate the current session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// backend reports a failure. Local sign-out does not depend on this
    /// call succeeding.
    pub async fn logout(&self) -> Result<(), Error> {
        let response = self
            .request(reqwest::Method::POST, "auth/logout")?
            .send()
            .await?;

        Self::ensure_success(response, "logout", "logout failed").await?;
        Ok(())
    }

    /// Build a request with the bearer token from the store attached.
    ///
    /// A store read failure is logged and the request goes out
    /// unauthenticated; the backend answers it like any anonymous call.
    pub(crate) fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let url = self.endpoint(path)?;
        let mut request = self.http.request(method, url);
        match self.store.load() {
            Ok(Some(session)) => request = request.bearer_auth(&session.access_token),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path,
                    "token store read failed, sending request unauthenticated"
                );
            }
        }
        Ok(request)
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("endpoint {path}: {e}")))
    }

    /// Checks HTTP response status; returns the response on success or an
    /// error carrying the backend-reported reason (`fallback` otherwise).
    pub(crate) async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
        fallback: &str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| fallback.to_owned());
        Err(Error::Api {
            operation,
            status: Some(status),
            detail,
        })
    }
}
