use crate::session::{AuthState, Routes};

/// Outcome of gating one guarded route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The boot probe has not settled; show a neutral placeholder and do
    /// not redirect.
    Loading,
    /// Render the guarded content unchanged.
    Render,
    /// Send the visitor to the login route, remembering where they were
    /// headed.
    RedirectToLogin { from: String },
    /// A standard user reached a dietitian-only route; silent downgrade to
    /// the user home, not an error page.
    RedirectToUserHome,
}

/// Decide what a guarded route should do for the current auth state.
///
/// Four mutually exclusive, exhaustive branches, recomputed synchronously
/// from current state on every call:
///
/// 1. still loading → [`GateDecision::Loading`],
/// 2. not authenticated → login redirect carrying `current_path`,
/// 3. `require_dietitian` without the role → user-home redirect,
/// 4. otherwise → render.
#[must_use]
pub fn decide(state: &AuthState, require_dietitian: bool, current_path: &str) -> GateDecision {
    if state.is_loading() {
        return GateDecision::Loading;
    }
    if !state.is_authenticated() {
        return GateDecision::RedirectToLogin {
            from: current_path.to_owned(),
        };
    }
    if require_dietitian && !state.is_dietitian() {
        return GateDecision::RedirectToUserHome;
    }
    GateDecision::Render
}

impl GateDecision {
    /// Redirect target rendered against the configured routes; `None` for
    /// the non-navigating branches.
    ///
    /// The login target carries the source path as `?from=`.
    #[must_use]
    pub fn location(&self, routes: &Routes) -> Option<String> {
        match self {
            Self::Loading | Self::Render => None,
            Self::RedirectToLogin { from } => {
                let encoded = urlencoding::encode(from);
                Some(format!("{}?from={encoded}", routes.login))
            }
            Self::RedirectToUserHome => Some(routes.user_home.clone()),
        }
    }
}
