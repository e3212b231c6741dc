use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: i64,
    pub user_id: i64,
    pub vacation_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Result of a plain "like" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    AlreadyLiked,
}

impl LikeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Liked => "liked",
            Self::AlreadyLiked => "already liked",
        }
    }
}

/// Result of a toggle: the viewer's like state after the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Liked,
    Unliked,
}

impl ToggleOutcome {
    pub fn is_liked(&self) -> bool {
        matches!(self, Self::Liked)
    }
}
