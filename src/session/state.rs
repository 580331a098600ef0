use crate::types::{Identity, Session};

/// Reactive authentication state.
///
/// The enum encodes the "never half-set" rule: an identity without a
/// session, or the reverse, is unrepresentable.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AuthState {
    /// The boot-time session probe has not settled yet. Route gating treats
    /// this as "still loading" rather than signed-out.
    #[default]
    Unknown,
    /// A signed-in identity with its backing session.
    Authenticated {
        identity: Identity,
        session: Session,
    },
    /// Signed out, or boot found nothing usable.
    Unauthenticated,
}

impl AuthState {
    /// True until the boot probe settles.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// The live session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated { session, .. } => Some(session),
            _ => None,
        }
    }

    /// True when the signed-in user is a dietitian. False while loading or
    /// signed out.
    #[must_use]
    pub fn is_dietitian(&self) -> bool {
        self.identity().is_some_and(Identity::is_dietitian)
    }
}
