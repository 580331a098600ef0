/// Errors produced by the portal client.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level failure talking to the portal backend.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected a request. `detail` carries the backend-reported
    /// reason when one was returned, a per-operation fallback otherwise.
    #[error("{operation} failed: {detail}")]
    Api {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    /// The browser refused to open the provider popup.
    #[error("popup blocked: allow popups for this site and try again")]
    PopupBlocked,

    /// The provider popup was closed before sign-in completed.
    #[error("sign-in cancelled: the provider window was closed")]
    PopupClosed,

    /// An auth operation was called while another one was still in flight.
    #[error("another sign-in operation is already in progress")]
    OperationInFlight,

    /// Token store operation failed.
    #[error("token store error: {0}")]
    Store(String),

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Phone number failed local validation.
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    /// One-time code failed local validation.
    #[error("invalid one-time code: {0}")]
    InvalidOtp(String),
}
