//! Host bridge: capabilities injected by the embedding app.
//!
//! The mobile shell provides identity lookup and vibration; the core only
//! sees this trait. Identity resolution can fail or time out; until it
//! succeeds, chat submission stays disabled.

use async_trait::async_trait;
use thiserror::Error;

use crate::avatar::avatar_url;
use crate::error::ClientError;

/// Resolved user identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Host bridge is unavailable")]
    Unavailable,

    #[error("Host bridge call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Host bridge call failed: {0}")]
    Failed(String),
}

/// Vibration patterns the shell understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibratePattern {
    Short,
    Long,
}

/// Capabilities provided by the embedding app.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Resolve the current user. May fail or time out.
    async fn user_info(&self) -> Result<UserInfo, BridgeError>;

    /// Fire a haptic cue. Best effort; failures are invisible.
    fn vibrate(&self, pattern: VibratePattern);
}

/// Cached identity resolution state.
///
/// `resolve` normalizes the bridge's answer: a missing avatar is replaced
/// with a generated placeholder so every danmaku carries a usable URL.
#[derive(Debug, Default)]
pub struct Identity {
    user: Option<UserInfo>,
}

impl Identity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve (or return the cached) identity through the bridge.
    pub async fn resolve(&mut self, bridge: &dyn HostBridge) -> Result<&UserInfo, BridgeError> {
        if self.user.is_none() {
            let info = bridge.user_info().await?;
            let avatar = avatar_url(info.avatar.as_deref().unwrap_or(""), &info.name);
            self.user = Some(UserInfo {
                avatar: Some(avatar),
                ..info
            });
        }
        Ok(self.user.as_ref().expect("identity was just resolved"))
    }

    /// The resolved identity, if resolution has succeeded.
    pub fn resolved(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    /// Whether chat submission is allowed.
    pub fn can_submit(&self) -> bool {
        self.user.is_some()
    }

    /// The resolved identity, or the error shown when submitting without one.
    pub fn require(&self) -> Result<&UserInfo, ClientError> {
        self.user.as_ref().ok_or(ClientError::IdentityUnresolved)
    }
}
