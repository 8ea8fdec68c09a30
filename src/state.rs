use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::chat::{ChatResponse, Session, Submission, Trust, TurnOutcome};
use crate::client::ChatClient;

/// Rendering parameters (admins can modify at runtime).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Insert backend text as live markup instead of escaping it.
    pub trust_markup: bool,
    /// Wrap width for Discord text.
    pub render_width: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            trust_markup: true,
            render_width: 100,
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            trust_markup: dotenv::var("TOA_TRUST_BACKEND_MARKUP")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.trust_markup),
            render_width: dotenv::var("TOA_RENDER_WIDTH")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.render_width),
        }
    }

    pub fn trust(&self) -> Trust {
        Trust::from_flag(self.trust_markup)
    }
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// How a dispatched turn ended, as seen by the command that started it.
#[derive(Debug)]
pub enum TurnReply {
    Answered(TurnOutcome),
    Failed(String),
}

/// Conversation sessions keyed by Discord channel, created on first use.
#[derive(Default)]
pub struct Sessions {
    inner: RwLock<HashMap<u64, Session>>,
}

impl Sessions {
    pub async fn submit(&self, channel: u64, message: &str) -> Submission {
        let mut sessions = self.inner.write().await;
        sessions.entry(channel).or_default().begin_turn(message)
    }

    /// Settle a turn with the backend result. `None` when the turn is stale
    /// or the session was dropped meanwhile.
    pub async fn finish(
        &self,
        channel: u64,
        id: u64,
        result: anyhow::Result<ChatResponse>,
        trust: Trust,
    ) -> Option<TurnReply> {
        let mut sessions = self.inner.write().await;
        let session = sessions.get_mut(&channel)?;
        match result {
            Ok(response) => session
                .complete_turn(id, &response, trust)
                .map(TurnReply::Answered),
            Err(e) => {
                warn!(channel, turn = id, "Chat request failed: {:#}", e);
                session.fail_turn(id).map(TurnReply::Failed)
            }
        }
    }

    /// Run `f` against the channel's session, creating it if needed.
    pub async fn with<R>(&self, channel: u64, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.inner.write().await;
        f(sessions.entry(channel).or_default())
    }

    /// Read the channel's session without creating one.
    pub async fn read<R>(&self, channel: u64, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let sessions = self.inner.read().await;
        sessions.get(&channel).map(f)
    }

    /// Mutate the channel's session only if it already exists.
    pub async fn update<R>(&self, channel: u64, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.inner.write().await;
        sessions.get_mut(&channel).map(f)
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Start the channel over. Refused while a request is pending.
    pub async fn reset(&self, channel: u64) -> bool {
        let mut sessions = self.inner.write().await;
        if sessions.get(&channel).is_some_and(Session::is_pending) {
            return false;
        }
        sessions.insert(channel, Session::new());
        true
    }
}

pub struct AppState {
    pub client: Arc<ChatClient>,
    pub sessions: Arc<Sessions>,
    pub admin_ids: HashSet<u64>,
    pub render_config: Arc<RwLock<RenderConfig>>,
}

impl AppState {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
