use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::api::{
    ApiClient, AuthPayload, OtpDispatch, VerifiedProfile, VerifyPhoneRequest,
    VerifyPhoneResponse,
};
use crate::error::Error;
use crate::phone;
use crate::types::{Identity, Session};

use super::config::{PortalConfig, Routes};
use super::state::AuthState;
use super::store::TokenStore;

#[cfg(feature = "federated")]
use crate::federated::{
    self, PollOutcome, PopupOpener, ProviderConfig, RedirectPoller, TokioDelay,
};

/// Consumer-provided navigation.
///
/// The manager announces where the app should go after an auth transition;
/// the host shell (router, webview, TUI) decides how to get there.
///
/// # Example
///
/// ```rust,ignore
/// struct RouterNavigator {
///     router: AppRouter,
/// }
///
/// impl Navigator for RouterNavigator {
///     fn navigate(&self, path: &str) {
///         self.router.push(path);
///     }
/// }
/// ```
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, path: &str);
}

/// Navigator that goes nowhere, for headless use and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, _path: &str) {}
}

/// Owns the auth state machine and every operation that moves it.
///
/// State is observable two ways: [`state()`](Self::state) snapshots, and
/// [`subscribe()`](Self::subscribe) for reactive consumers. The persisted
/// token copy is written before any transition into `Authenticated` and
/// removed on any transition out, keeping the store (which the API client
/// reads) and the in-memory state in lockstep.
pub struct SessionManager {
    api: Arc<ApiClient>,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    routes: Routes,
    state: watch::Sender<AuthState>,
    guard: Mutex<()>,
    #[cfg(feature = "federated")]
    provider: Option<ProviderConfig>,
}

impl SessionManager {
    // ── Construction ───────────────────────────────────────────────────

    /// Create a manager in the `Unknown` state.
    ///
    /// Call [`initialize`](Self::initialize) once at boot to settle it.
    #[must_use]
    pub fn new(config: PortalConfig, store: Arc<dyn TokenStore>) -> Self {
        let api = Arc::new(ApiClient::new(&config, store.clone()));
        Self {
            api,
            store,
            navigator: Arc::new(NoopNavigator),
            routes: config.routes,
            state: watch::Sender::new(AuthState::Unknown),
            guard: Mutex::new(()),
            #[cfg(feature = "federated")]
            provider: None,
        }
    }

    /// Set the navigator invoked after auth transitions.
    #[must_use]
    pub fn with_navigator(mut self, navigator: impl Navigator) -> Self {
        self.navigator = Arc::new(navigator);
        self
    }

    /// Configure the federated identity provider.
    #[cfg(feature = "federated")]
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = Some(provider);
        self
    }

    // ── State access ───────────────────────────────────────────────────

    /// Current auth state snapshot.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Watch auth state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    /// True when the signed-in user is a dietitian.
    #[must_use]
    pub fn is_dietitian(&self) -> bool {
        self.state.borrow().is_dietitian()
    }

    /// The shared API client, for the portal calls that do not touch auth
    /// state (appointments, assessments, uploads).
    #[must_use]
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    /// The configured route targets.
    #[must_use]
    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    // ── Operations ─────────────────────────────────────────────────────

    /// Boot-time session probe; settles `Unknown` into a resolved state.
    ///
    /// Failure to check is treated exactly like "not signed in": the error
    /// is logged and the user lands on the login page. Never navigates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationInFlight`] if another auth operation is
    /// running; probe and store failures are swallowed into the signed-out
    /// outcome.
    pub async fn initialize(&self) -> Result<(), Error> {
        let _guard = self.begin("initialize")?;

        match self.api.fetch_session().await {
            Ok(probe) => match probe.into_authenticated() {
                Some((identity, session)) => {
                    match self.enter_authenticated(identity, session) {
                        Ok(()) => tracing::info!("session restored"),
                        Err(e) => {
                            tracing::warn!(error = %e, "could not persist restored session");
                            self.enter_unauthenticated();
                        }
                    }
                }
                None => self.enter_unauthenticated(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "session probe failed, treating as signed out");
                self.enter_unauthenticated();
            }
        }
        Ok(())
    }

    /// Sign in with email and password.
    ///
    /// On success the session is persisted, state becomes `Authenticated`,
    /// and the navigator is pointed at the user home. On failure the prior
    /// state is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with the backend-reported reason when the
    /// credentials are rejected, [`Error::Http`] on network failure,
    /// [`Error::Store`] if the session could not be persisted, or
    /// [`Error::OperationInFlight`].
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, Error> {
        let _guard = self.begin("login")?;

        let payload = self.api.login(email, password).await?;
        self.complete_sign_in("login", payload)
    }

    /// Create an account and sign in.
    ///
    /// Same contract as [`login`](Self::login); new accounts always land on
    /// the standard-user view.
    ///
    /// # Errors
    ///
    /// As for [`login`](Self::login).
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Identity, Error> {
        let _guard = self.begin("register")?;

        let payload = self.api.register(email, password, name).await?;
        self.complete_sign_in("register", payload)
    }

    /// Sign in through the federated provider popup.
    ///
    /// Opens the provider window, polls it for the redirect, exchanges the
    /// extracted token with the backend, then completes exactly as
    /// [`login`](Self::login).
    ///
    /// # Errors
    ///
    /// Returns [`Error::PopupBlocked`] if the shell refuses the window,
    /// [`Error::PopupClosed`] if the user closes it before finishing,
    /// [`Error::Config`] when no provider is configured, and otherwise as
    /// for [`login`](Self::login).
    #[cfg(feature = "federated")]
    pub async fn login_with_provider<O: PopupOpener>(
        &self,
        opener: &O,
    ) -> Result<Identity, Error> {
        let _guard = self.begin("federated login")?;
        self.federated_sign_in("federated login", opener).await
    }

    /// Register through the federated provider popup.
    ///
    /// The provider dance is identical to
    /// [`login_with_provider`](Self::login_with_provider); the backend
    /// decides whether the account is new.
    ///
    /// # Errors
    ///
    /// As for [`login_with_provider`](Self::login_with_provider).
    #[cfg(feature = "federated")]
    pub async fn register_with_provider<O: PopupOpener>(
        &self,
        opener: &O,
    ) -> Result<Identity, Error> {
        let _guard = self.begin("federated register")?;
        self.federated_sign_in("federated register", opener).await
    }

    /// Ask the backend to text a one-time code to `phone_number`.
    ///
    /// Validates the number locally and sends it normalized. Does not
    /// touch auth state, so it is not serialized against other operations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPhone`] before any network traffic when the
    /// number is malformed, otherwise [`Error::Api`]/[`Error::Http`].
    pub async fn send_otp(&self, phone_number: &str) -> Result<OtpDispatch, Error> {
        if !phone::is_valid_mobile(phone_number) {
            return Err(Error::InvalidPhone(
                "expected a 10-digit mobile number".into(),
            ));
        }
        self.api.send_otp(&phone::normalize(phone_number)).await
    }

    /// Verify a one-time code and merge the confirmed phone fields.
    ///
    /// An already-signed-in identity gains the verified fields in place,
    /// keeping its session token. A signed-out caller completes a first
    /// registration from the `user`/`session` the backend returns. Either
    /// way the navigator is pointed at the user home.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPhone`]/[`Error::InvalidOtp`] before any
    /// network traffic on malformed input, [`Error::Api`] when the backend
    /// rejects the code (detail defaults to "invalid code"), and otherwise
    /// as for [`login`](Self::login).
    pub async fn verify_phone(
        &self,
        phone_number: &str,
        code: &str,
        name: Option<&str>,
    ) -> Result<Identity, Error> {
        let _guard = self.begin("verify phone")?;

        if !phone::is_valid_mobile(phone_number) {
            return Err(Error::InvalidPhone(
                "expected a 10-digit mobile number".into(),
            ));
        }
        if !phone::is_valid_otp(code) {
            return Err(Error::InvalidOtp("expected a 6-digit code".into()));
        }

        let current = self.state.borrow().clone();
        let request = VerifyPhoneRequest {
            phone: phone::normalize(phone_number),
            otp: code.to_owned(),
            name: name.map(str::to_owned),
            user_id: current.identity().map(|identity| identity.id.clone()),
        };

        let response = self.api.verify_phone(&request).await?;
        let (identity, session) = merge_verified_profile(current, response)?;

        self.enter_authenticated(identity.clone(), session)?;
        tracing::info!(user = %identity.id, "phone verified");
        self.navigator.navigate(&self.routes.user_home);
        Ok(identity)
    }

    /// Sign out.
    ///
    /// Local state and the persisted token are cleared no matter what the
    /// backend says; a backend failure comes back to the caller for
    /// notification only, after local sign-out has already happened.
    ///
    /// # Errors
    ///
    /// Returns the backend error, if any, or
    /// [`Error::OperationInFlight`].
    pub async fn logout(&self) -> Result<(), Error> {
        let _guard = self.begin("logout")?;

        let result = self.api.logout().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "backend logout failed, clearing local session anyway");
        }
        self.enter_unauthenticated();
        self.navigator.navigate(&self.routes.login);
        result
    }

    // ── Transitions ────────────────────────────────────────────────────

    /// Write-through transition: the persisted copy is written before the
    /// in-memory state, so the API client can never observe an
    /// authenticated state whose token is missing from the store.
    fn enter_authenticated(&self, identity: Identity, session: Session) -> Result<(), Error> {
        self.store
            .save(&session)
            .map_err(|e| Error::Store(e.to_string()))?;
        self.state
            .send_replace(AuthState::Authenticated { identity, session });
        Ok(())
    }

    fn enter_unauthenticated(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
        self.state.send_replace(AuthState::Unauthenticated);
    }

    fn complete_sign_in(
        &self,
        operation: &'static str,
        payload: AuthPayload,
    ) -> Result<Identity, Error> {
        let AuthPayload { user, session } = payload;
        self.enter_authenticated(user.clone(), session)?;
        tracing::info!(user = %user.id, operation, "signed in");
        self.navigator.navigate(&self.routes.user_home);
        Ok(user)
    }

    #[cfg(feature = "federated")]
    async fn federated_sign_in<O: PopupOpener>(
        &self,
        operation: &'static str,
        opener: &O,
    ) -> Result<Identity, Error> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| Error::Config("no federated provider configured".into()))?;

        let request = provider.authorization_request();
        let popup = opener.open(&request.url).ok_or(Error::PopupBlocked)?;

        let poller = RedirectPoller::start(provider.redirect_uri().clone());
        let outcome =
            federated::drive(poller, &popup, &TokioDelay, provider.poll_interval()).await;

        let token = match outcome {
            PollOutcome::Token(token) => token,
            PollOutcome::Cancelled => return Err(Error::PopupClosed),
        };

        let payload = self.api.login_with_google(&token).await?;
        self.complete_sign_in(operation, payload)
    }

    /// Take the shared operation guard without waiting.
    fn begin(&self, operation: &'static str) -> Result<tokio::sync::MutexGuard<'_, ()>, Error> {
        self.guard.try_lock().map_err(|_| {
            tracing::warn!(operation, "rejected overlapping auth operation");
            Error::OperationInFlight
        })
    }
}

// ── Verify-phone merge ─────────────────────────────────────────────────

/// Fold a verify-phone response into the auth state.
///
/// An authenticated identity gains the verified fields in place and keeps
/// its session. A signed-out verification must carry the freshly
/// registered `user` and `session`; anything less is a backend contract
/// violation, never a half-authenticated state.
fn merge_verified_profile(
    current: AuthState,
    response: VerifyPhoneResponse,
) -> Result<(Identity, Session), Error> {
    let VerifyPhoneResponse {
        profile,
        user,
        session,
        ..
    } = response;

    if let AuthState::Authenticated {
        mut identity,
        session: current_session,
    } = current
    {
        apply_profile(&mut identity, &profile);
        return Ok((identity, current_session));
    }

    match (user, session) {
        (Some(mut identity), Some(session)) => {
            apply_profile(&mut identity, &profile);
            Ok((identity, session))
        }
        _ => Err(Error::Api {
            operation: "verify phone",
            status: None,
            detail: "verification reply carried no account for a signed-out client".into(),
        }),
    }
}

/// Overlay the verified fields. Name resolution order: verification reply,
/// then the existing name, then `User <last four digits>`.
fn apply_profile(identity: &mut Identity, profile: &VerifiedProfile) {
    identity.phone = Some(profile.phone.clone());
    identity.phone_verified = Some(profile.phone_verified);
    if let Some(name) = &profile.name {
        identity.name = Some(name.clone());
    }
    if identity.name.is_none() {
        identity.name = Some(fallback_name(&profile.phone));
    }
}

fn fallback_name(phone: &str) -> String {
    // Normalized numbers are ASCII, so byte indexing is safe.
    let start = phone.len().saturating_sub(4);
    format!("User {}", &phone[start..])
}
