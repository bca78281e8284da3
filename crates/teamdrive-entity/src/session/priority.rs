//! Session priority classification.

use serde::{Deserialize, Serialize};

/// Priority class of a session, fixed at admission time.
///
/// The user table (and therefore the role model) lives outside the seat
/// admission core, so the caller's priority is denormalized onto the
/// session row. Priority decides preemption rights when the pool is
/// exhausted: admin requests may evict, general requests may not, and
/// admin sessions are never selected as eviction victims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "session_priority", rename_all = "snake_case")]
pub enum SessionPriority {
    /// Ordinary login; cannot preempt and may be evicted.
    General,
    /// Administrator login; may preempt and is protected from eviction.
    Admin,
}

impl SessionPriority {
    /// Whether this priority is allowed to preempt a lower-priority session.
    pub fn can_preempt(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for SessionPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Admin => write!(f, "admin"),
        }
    }
}
