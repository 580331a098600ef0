#![doc = include_str!("../README.md")]

pub mod api;
pub mod appointments;
pub mod assessment;
pub mod error;
#[cfg(feature = "federated")]
pub mod federated;
pub mod gate;
pub mod phone;
pub mod session;
pub mod storage;
pub mod types;

// Re-exports for convenient access
pub use api::ApiClient;
pub use error::Error;
#[cfg(feature = "federated")]
pub use federated::{PollOutcome, PopupOpener, PopupWindow, ProviderConfig, RedirectPoller};
pub use gate::{GateDecision, decide};
pub use phone::{is_valid_mobile, is_valid_otp};
pub use session::{
    AuthState, FileTokenStore, MemoryTokenStore, Navigator, PortalConfig, Routes,
    SessionManager, TokenStore,
};
pub use types::{Identity, Role, Session, UserId};
