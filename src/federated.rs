use std::future::Future;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use url::Url;

/// Default interval between popup location checks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Federated identity provider configuration.
///
/// Required fields are constructor parameters, so there are no runtime
/// "missing field" errors.
///
/// ```rust,ignore
/// use nourish_client::federated::ProviderConfig;
///
/// let provider = ProviderConfig::new("my-client-id", "https://my-app.com/auth/callback".parse()?);
/// // Optional overrides via chaining:
/// let provider = provider.with_scopes(vec!["openid".into(), "email".into()]);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ProviderConfig {
    pub(crate) client_id: String,
    pub(crate) auth_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
    pub(crate) poll_interval: Duration,
}

impl ProviderConfig {
    /// Create a provider configuration with Google defaults.
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri,
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth"
                .parse()
                .expect("valid default URL"),
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the provider authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the requested scopes (default: `openid email profile`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Override the popup poll interval (default: 500 ms).
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Authorization endpoint URL.
    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Redirect URI the provider sends the popup back to.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Requested scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Popup poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Build the authorization URL for the popup (fragment flow).
    ///
    /// Each call carries a fresh random `state`.
    #[must_use]
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let state = generate_state();
        let scope = self.scopes.join(" ");

        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "token")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("state", &state)
            .append_pair("scope", &scope);

        AuthorizationRequest { url, state }
    }
}

/// Authorization URL plus the `state` parameter baked into it.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
}

/// Generates a cryptographically random state parameter for the
/// authorization request.
///
/// Returns a 22-character URL-safe string (16 random bytes → base64url).
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// A provider window opened for the redirect dance.
///
/// Implemented over whatever browser shell hosts the client; tests use
/// scripted fakes.
pub trait PopupWindow: Send {
    /// The popup's current location, or `None` while the window sits on a
    /// page the host is not allowed to inspect (cross-origin).
    fn current_url(&self) -> Option<Url>;

    /// True once the user has closed the window.
    fn is_closed(&self) -> bool;

    /// Close the window. Must be idempotent.
    fn close(&self);
}

/// Opens provider popups.
pub trait PopupOpener: Send + Sync + 'static {
    type Window: PopupWindow;

    /// Open a popup at `url`. `None` means the shell refused (popup
    /// blocked).
    fn open(&self, url: &Url) -> Option<Self::Window>;
}

/// One observation of the popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Nothing decisive yet; keep polling.
    Pending,
    /// Terminal; stop the timer and release the popup.
    Settled(PollOutcome),
}

/// Terminal result of the redirect watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The provider redirected back with an access token.
    Token(String),
    /// The window was closed, the flow was cancelled, or the provider
    /// redirected back without a token.
    Cancelled,
}

/// Finite-state poller watching a popup for the provider redirect.
///
/// The poller holds no timer; the owner sets the cadence (see [`drive`])
/// and calls [`observe`](Self::observe) once per tick. Start and cancel are
/// explicit so a poll can never outlive the flow that started it.
#[derive(Debug)]
pub struct RedirectPoller {
    redirect_uri: Url,
    settled: Option<PollOutcome>,
}

impl RedirectPoller {
    /// Begin watching for `redirect_uri`.
    #[must_use]
    pub fn start(redirect_uri: Url) -> Self {
        Self {
            redirect_uri,
            settled: None,
        }
    }

    /// Inspect the popup once.
    ///
    /// A closed window settles as [`PollOutcome::Cancelled`]. A location
    /// matching the redirect URI (same origin and path) settles as
    /// [`PollOutcome::Token`] when the fragment carries one, and as a
    /// cancellation when it does not (the provider declined). Once settled,
    /// every further observation repeats the outcome.
    pub fn observe<W: PopupWindow>(&mut self, popup: &W) -> PollState {
        if let Some(outcome) = &self.settled {
            return PollState::Settled(outcome.clone());
        }
        if popup.is_closed() {
            return self.settle(PollOutcome::Cancelled);
        }
        let Some(url) = popup.current_url() else {
            return PollState::Pending;
        };
        if !self.matches_redirect(&url) {
            return PollState::Pending;
        }
        match extract_access_token(&url) {
            Some(token) => self.settle(PollOutcome::Token(token)),
            None => self.settle(PollOutcome::Cancelled),
        }
    }

    /// Mark the flow cancelled. A poller that already settled keeps its
    /// original outcome.
    pub fn cancel(&mut self) {
        if self.settled.is_none() {
            self.settled = Some(PollOutcome::Cancelled);
        }
    }

    fn settle(&mut self, outcome: PollOutcome) -> PollState {
        self.settled = Some(outcome.clone());
        PollState::Settled(outcome)
    }

    fn matches_redirect(&self, url: &Url) -> bool {
        url.origin() == self.redirect_uri.origin() && url.path() == self.redirect_uri.path()
    }
}

/// Pull `access_token` out of a redirect URL fragment.
///
/// The fragment reuses query-string encoding
/// (`#access_token=...&token_type=...`).
#[must_use]
pub fn extract_access_token(url: &Url) -> Option<String> {
    let fragment = url.fragment()?;
    url::form_urlencoded::parse(fragment.as_bytes())
        .find(|(key, value)| key == "access_token" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Timer seam so the poll cadence is testable without real time.
pub trait Delay: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Production delay backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

impl Delay for TokioDelay {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Poll `popup` every `interval` until the flow settles.
///
/// The popup is closed on every exit path; a finished flow never leaves a
/// provider window behind.
pub async fn drive<W, D>(
    mut poller: RedirectPoller,
    popup: &W,
    delay: &D,
    interval: Duration,
) -> PollOutcome
where
    W: PopupWindow,
    D: Delay,
{
    loop {
        match poller.observe(popup) {
            PollState::Settled(outcome) => {
                popup.close();
                return outcome;
            }
            PollState::Pending => delay.sleep(interval).await,
        }
    }
}
