//! Version context capability.
//!
//! The version management service owns edit sessions on a named version. This
//! crate only consumes it: every mutation is bracketed by
//! [`VersionContext::start_session`] and [`VersionContext::stop_session`].

use crate::core::{ObjectIdReservation, Result, SessionId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of lease taken on the version for the duration of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// startReading / stopReading
    #[default]
    Reading,
    /// startEditing / stopEditing
    Editing,
}

impl SessionMode {
    pub fn start_action(&self) -> &'static str {
        match self {
            Self::Reading => "startReading",
            Self::Editing => "startEditing",
        }
    }

    pub fn stop_action(&self) -> &'static str {
        match self {
            Self::Reading => "stopReading",
            Self::Editing => "stopEditing",
        }
    }
}

/// What a session body needs to scope its remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    pub session_id: SessionId,
    pub version_name: String,
}

#[async_trait]
pub trait VersionContext: Send + Sync {
    /// Fully qualified name of the version edits are scoped to.
    fn version_name(&self) -> String;

    /// Session id of the currently open session, if any.
    fn current_session_id(&self) -> Option<SessionId>;

    /// Opens a session on the version and returns its id.
    async fn start_session(&self, mode: SessionMode) -> Result<SessionId>;

    /// Closes the session opened by the matching `start_session`.
    async fn stop_session(&self, mode: SessionMode) -> Result<()>;

    /// Reserves `count` object ids on the layer at `target_url`.
    async fn reserve_object_ids(&self, target_url: &str, count: u32)
    -> Result<ObjectIdReservation>;

    /// Produces a fresh unique id for a client-keyed feature.
    fn generate_unique_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
