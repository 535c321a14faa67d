//! App-facing state: installability, online status and update availability.
//!
//! Browser-ish events are folded into [`AppState`] by a pure reducer; the
//! resulting state is published on a watch channel and side effects (toast
//! notices, reloads) on a broadcast channel.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use souk_core::Error;
use tokio::sync::{Mutex, broadcast, watch};

use crate::worker::StorageEstimate;

/// Snapshot exposed to the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppState {
    pub is_installable: bool,
    pub is_installed: bool,
    pub is_online: bool,
    pub update_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Browser,
    Standalone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptOutcome {
    Accepted,
    Dismissed,
}

/// A deferred platform install prompt. Showing it consumes it.
#[async_trait]
pub trait InstallPrompt: Send {
    async fn prompt(self: Box<Self>) -> PromptOutcome;
}

/// Source of storage usage figures.
#[async_trait]
pub trait StorageEstimator: Send + Sync {
    async fn estimate(&self) -> Result<StorageEstimate, Error>;
}

pub enum HookEvent {
    Startup { display_mode: DisplayMode, online: bool },
    InstallPromptAvailable(Box<dyn InstallPrompt>),
    AppInstalled,
    Online,
    Offline,
    /// A new worker finished installing.
    WorkerInstalled { has_controller: bool },
    RegistrationFailed(String),
}

impl fmt::Debug for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup { display_mode, online } => f
                .debug_struct("Startup")
                .field("display_mode", display_mode)
                .field("online", online)
                .finish(),
            Self::InstallPromptAvailable(_) => f.write_str("InstallPromptAvailable"),
            Self::AppInstalled => f.write_str("AppInstalled"),
            Self::Online => f.write_str("Online"),
            Self::Offline => f.write_str("Offline"),
            Self::WorkerInstalled { has_controller } => f
                .debug_struct("WorkerInstalled")
                .field("has_controller", has_controller)
                .finish(),
            Self::RegistrationFailed(reason) => f.debug_tuple("RegistrationFailed").field(reason).finish(),
        }
    }
}

/// User-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    Installed,
    /// Stays until the user acts on it.
    UpdateAvailable,
    Online,
    Offline,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Installed => "App installed successfully",
            Self::UpdateAvailable => "A new version is available. Reload to update.",
            Self::Online => "You're back online",
            Self::Offline => "You're offline. Some features may be limited.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", content = "notice", rename_all = "snake_case")]
pub enum Effect {
    Notify(Notice),
    Reload,
}

/// Reducer state: the public snapshot plus the deferred install prompt.
#[derive(Default)]
pub struct HookState {
    app: AppState,
    deferred_prompt: Option<Box<dyn InstallPrompt>>,
}

impl HookState {
    pub fn app(&self) -> AppState {
        self.app
    }
}

/// Fold one event into the state, returning the effects it causes.
pub fn reduce(state: &mut HookState, event: HookEvent) -> Vec<Effect> {
    match event {
        HookEvent::Startup { display_mode, online } => {
            state.app.is_installed = display_mode == DisplayMode::Standalone;
            state.app.is_online = online;
            Vec::new()
        }
        HookEvent::InstallPromptAvailable(prompt) => {
            state.deferred_prompt = Some(prompt);
            state.app.is_installable = true;
            Vec::new()
        }
        HookEvent::AppInstalled => {
            state.deferred_prompt = None;
            state.app.is_installed = true;
            state.app.is_installable = false;
            vec![Effect::Notify(Notice::Installed)]
        }
        HookEvent::Online => {
            if state.app.is_online {
                return Vec::new();
            }
            state.app.is_online = true;
            vec![Effect::Notify(Notice::Online)]
        }
        HookEvent::Offline => {
            if !state.app.is_online {
                return Vec::new();
            }
            state.app.is_online = false;
            vec![Effect::Notify(Notice::Offline)]
        }
        HookEvent::WorkerInstalled { has_controller } => {
            if !has_controller {
                return Vec::new();
            }
            state.app.update_available = true;
            vec![Effect::Notify(Notice::UpdateAvailable)]
        }
        HookEvent::RegistrationFailed(reason) => {
            tracing::warn!(reason = %reason, "worker registration failed");
            Vec::new()
        }
    }
}

/// Owned hook state with change subscriptions.
#[derive(Clone)]
pub struct ClientHook {
    state: Arc<Mutex<HookState>>,
    app_tx: watch::Sender<AppState>,
    effect_tx: broadcast::Sender<Effect>,
    storage: Option<Arc<dyn StorageEstimator>>,
}

impl Default for ClientHook {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientHook {
    pub fn new() -> Self {
        let (app_tx, _) = watch::channel(AppState::default());
        let (effect_tx, _) = broadcast::channel(32);
        Self { state: Arc::new(Mutex::new(HookState::default())), app_tx, effect_tx, storage: None }
    }

    pub fn with_storage(mut self, storage: Arc<dyn StorageEstimator>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub async fn handle(&self, event: HookEvent) {
        tracing::debug!(event = ?event, "hook event");
        let mut state = self.state.lock().await;
        let effects = reduce(&mut state, event);
        self.publish(state.app, effects);
    }

    fn publish(&self, app: AppState, effects: Vec<Effect>) {
        self.app_tx.send_replace(app);
        for effect in effects {
            // no subscribers is fine
            let _ = self.effect_tx.send(effect);
        }
    }

    pub fn state(&self) -> AppState {
        *self.app_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<AppState> {
        self.app_tx.subscribe()
    }

    pub fn subscribe_effects(&self) -> broadcast::Receiver<Effect> {
        self.effect_tx.subscribe()
    }

    /// Show the deferred install prompt.
    ///
    /// Returns false when no prompt is stored or the user dismissed it. The
    /// prompt is used at most once either way.
    pub async fn install_app(&self) -> bool {
        let prompt = {
            let mut state = self.state.lock().await;
            let prompt = state.deferred_prompt.take();
            state.app.is_installable = false;
            self.app_tx.send_replace(state.app);
            prompt
        };

        let Some(prompt) = prompt else {
            return false;
        };

        let outcome = prompt.prompt().await;
        tracing::info!(outcome = ?outcome, "install prompt answered");
        outcome == PromptOutcome::Accepted
    }

    /// Reload onto the waiting worker version.
    pub async fn update_app(&self) {
        let mut state = self.state.lock().await;
        state.app.update_available = false;
        self.publish(state.app, vec![Effect::Reload]);
    }

    pub async fn storage_estimate(&self) -> Option<StorageEstimate> {
        let storage = self.storage.as_ref()?;
        match storage.estimate().await {
            Ok(estimate) => Some(estimate),
            Err(e) => {
                tracing::warn!(error = %e, "storage estimate failed");
                None
            }
        }
    }
}
