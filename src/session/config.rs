use url::Url;

use crate::error::Error;

/// Application route targets used for post-auth navigation and gate
/// redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routes {
    /// Where unauthenticated visitors are sent.
    pub login: String,
    /// Landing page after any successful sign-in, and the downgrade target
    /// when a standard user reaches a dietitian-only route.
    pub user_home: String,
}

impl Routes {
    fn defaults() -> Self {
        Self {
            login: "/login".into(),
            user_home: "/user/dashboard".into(),
        }
    }
}

impl Default for Routes {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Portal client configuration.
///
/// Required field (`api_base_url`) is a constructor parameter, so there are
/// no runtime "missing field" errors.
///
/// Use [`from_env()`](PortalConfig::from_env) for convention-based setup,
/// or [`new()`](PortalConfig::new) with `with_*` methods for full control.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub(crate) api_base_url: Url,
    pub(crate) routes: Routes,
}

impl PortalConfig {
    /// Create config with the required backend base URL.
    ///
    /// The URL is normalized to a trailing slash so endpoint joins never
    /// swallow its final path segment. Optional fields use sensible
    /// defaults; override with `with_*` methods.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url: normalize_base(api_base_url),
            routes: Routes::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `NOURISH_API_URL`: portal backend base URL (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `NOURISH_LOGIN_PATH`: override the login route (default `/login`)
    /// - `NOURISH_USER_HOME`: override the post-login landing route
    ///   (default `/user/dashboard`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if required env vars are missing or the
    /// URL is invalid.
    pub fn from_env() -> Result<Self, Error> {
        let base_str = std::env::var("NOURISH_API_URL")
            .map_err(|_| Error::Config("NOURISH_API_URL is required".into()))?;
        let api_base_url: Url = base_str
            .parse()
            .map_err(|e| Error::Config(format!("NOURISH_API_URL: {e}")))?;

        let mut config = Self::new(api_base_url);

        if let Ok(path) = std::env::var("NOURISH_LOGIN_PATH") {
            config = config.with_login_route(path);
        }
        if let Ok(path) = std::env::var("NOURISH_USER_HOME") {
            config = config.with_user_home_route(path);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_login_route(mut self, path: impl Into<String>) -> Self {
        self.routes.login = path.into();
        self
    }

    #[must_use]
    pub fn with_user_home_route(mut self, path: impl Into<String>) -> Self {
        self.routes.user_home = path.into();
        self
    }

    #[must_use]
    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    #[must_use]
    pub fn routes(&self) -> &Routes {
        &self.routes
    }
}

/// `Url::join` drops the last path segment unless the base ends in `/`.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
