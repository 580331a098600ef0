//! Session management for the portal client.
//!
//! The [`SessionManager`] owns the auth state machine; everything else in
//! the crate observes it. Token persistence is injected through
//! [`TokenStore`], navigation through
//! [`Navigator`](crate::session::Navigator), so the manager runs unchanged
//! under a webview, a TUI, or a test harness.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nourish_client::session::{FileTokenStore, PortalConfig, SessionManager};
//!
//! let config = PortalConfig::from_env()?;
//! let store = Arc::new(FileTokenStore::new(data_dir.join("session.json")));
//! let manager = SessionManager::new(config, store);
//!
//! // Settle the Unknown state before rendering anything gated.
//! manager.initialize().await?;
//!
//! let mut changes = manager.subscribe();
//! ```

mod config;
mod manager;
mod state;
mod store;

pub use config::{PortalConfig, Routes};
pub use manager::{Navigator, NoopNavigator, SessionManager};
pub use state::AuthState;
pub use store::{FileTokenStore, MemoryTokenStore, PersistedSession, TokenStore};
