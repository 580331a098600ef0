//! Federated popup sign-in against the in-process portal: the scripted
//! popup walks the provider redirect and the manager exchanges the
//! extracted token for a session.

#![cfg(feature = "federated")]

mod common;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use url::Url;

use nourish_client::Error;
use nourish_client::federated::{PopupOpener, PopupWindow, ProviderConfig};
use nourish_client::session::{MemoryTokenStore, TokenStore};

use common::{PROVIDER_TOKEN, spawn_portal};

struct ScriptedPopup {
    frames: Mutex<VecDeque<Option<Url>>>,
    closed: AtomicBool,
}

impl ScriptedPopup {
    /// A popup that shows each frame once, then stays on the last.
    fn visiting(frames: Vec<Option<Url>>) -> Self {
        Self {
            frames: Mutex::new(frames.into()),
            closed: AtomicBool::new(false),
        }
    }

    /// A popup the user has already closed.
    fn already_closed() -> Self {
        let popup = Self::visiting(vec![None]);
        popup.closed.store(true, Ordering::SeqCst);
        popup
    }
}

impl PopupWindow for ScriptedPopup {
    fn current_url(&self) -> Option<Url> {
        let mut frames = self.frames.lock().unwrap();
        if frames.len() > 1 {
            frames.pop_front().unwrap()
        } else {
            frames.front().cloned().flatten()
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct ScriptedOpener(Mutex<Option<ScriptedPopup>>);

impl ScriptedOpener {
    fn opening(popup: ScriptedPopup) -> Self {
        Self(Mutex::new(Some(popup)))
    }

    fn blocked() -> Self {
        Self(Mutex::new(None))
    }
}

impl PopupOpener for ScriptedOpener {
    type Window = ScriptedPopup;

    fn open(&self, _url: &Url) -> Option<ScriptedPopup> {
        self.0.lock().unwrap().take()
    }
}

fn redirect_uri() -> Url {
    "https://portal.example/auth/callback".parse().unwrap()
}

fn provider() -> ProviderConfig {
    ProviderConfig::new("client-1", redirect_uri())
        .with_poll_interval(Duration::from_millis(1))
}

#[tokio::test]
async fn provider_popup_signs_the_user_in() {
    let portal = spawn_portal().await;
    let store = Arc::new(MemoryTokenStore::new());
    let manager = portal.manager(store.clone()).with_provider(provider());

    let landed: Url = format!(
        "https://portal.example/auth/callback#access_token={PROVIDER_TOKEN}&token_type=bearer"
    )
    .parse()
    .unwrap();
    let opener = ScriptedOpener::opening(ScriptedPopup::visiting(vec![
        None, // still on the provider's page, cross-origin
        Some(landed),
    ]));

    let identity = manager.login_with_provider(&opener).await.unwrap();

    assert_eq!(identity.id.as_str(), "u-1");
    assert!(manager.state().is_authenticated());
    assert!(store.load().unwrap().is_some());
}

#[tokio::test]
async fn closing_the_popup_cancels_the_flow() {
    let portal = spawn_portal().await;
    let store = Arc::new(MemoryTokenStore::new());
    let manager = portal.manager(store.clone()).with_provider(provider());

    let opener = ScriptedOpener::opening(ScriptedPopup::already_closed());
    let err = manager.login_with_provider(&opener).await.unwrap_err();

    assert!(matches!(err, Error::PopupClosed));
    assert!(!manager.state().is_authenticated());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn a_denied_grant_reads_as_cancelled() {
    let portal = spawn_portal().await;
    let manager = portal
        .manager(Arc::new(MemoryTokenStore::new()))
        .with_provider(provider());

    let denied: Url = "https://portal.example/auth/callback#error=access_denied"
        .parse()
        .unwrap();
    let opener = ScriptedOpener::opening(ScriptedPopup::visiting(vec![Some(denied)]));

    let err = manager.login_with_provider(&opener).await.unwrap_err();
    assert!(matches!(err, Error::PopupClosed));
}

#[tokio::test]
async fn blocked_popups_are_reported_as_such() {
    let portal = spawn_portal().await;
    let manager = portal
        .manager(Arc::new(MemoryTokenStore::new()))
        .with_provider(provider());

    let err = manager
        .login_with_provider(&ScriptedOpener::blocked())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PopupBlocked));
}

#[tokio::test]
async fn provider_sign_in_requires_configuration() {
    let portal = spawn_portal().await;
    let manager = portal.manager(Arc::new(MemoryTokenStore::new()));

    let err = manager
        .login_with_provider(&ScriptedOpener::blocked())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn registration_walks_the_same_dance() {
    let portal = spawn_portal().await;
    let manager = portal
        .manager(Arc::new(MemoryTokenStore::new()))
        .with_provider(provider());

    let landed: Url = format!(
        "https://portal.example/auth/callback#access_token={PROVIDER_TOKEN}&token_type=bearer"
    )
    .parse()
    .unwrap();
    let opener = ScriptedOpener::opening(ScriptedPopup::visiting(vec![Some(landed)]));

    let identity = manager.register_with_provider(&opener).await.unwrap();
    assert_eq!(identity.id.as_str(), "u-1");
}
