//! Presence status for sessions.

use serde::{Deserialize, Serialize};

/// Presence status of a session.
///
/// Presence is a realtime-transport concern and never affects seat
/// accounting; it is stored on the session for the benefit of external
/// presence consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "presence_status", rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Actively using the application.
    Active,
    /// Connected but inactive.
    Idle,
    /// Marked away.
    Away,
    /// Do not disturb.
    DoNotDisturb,
    /// No live connection.
    Offline,
}

impl PresenceStatus {
    /// Whether this status counts as online for presence consumers.
    pub fn is_online(&self) -> bool {
        !matches!(self, Self::Offline)
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Idle => write!(f, "idle"),
            Self::Away => write!(f, "away"),
            Self::DoNotDisturb => write!(f, "do_not_disturb"),
            Self::Offline => write!(f, "offline"),
        }
    }
}
