use serde::{Deserialize, Serialize};

/// Backfill position of a room.
///
/// Keeps "never fetched" apart from "no more history", which a bare
/// `Option<String>` cannot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "token", rename_all = "camelCase")]
pub enum CursorState {
    /// No backfill response has been applied yet.
    #[default]
    NotFetched,
    /// More history is available from this token.
    Cursor(String),
    /// The last response carried a null cursor.
    Exhausted,
}

impl CursorState {
    /// State after applying a response whose `nextCursor` was `next`.
    pub fn from_next(next: Option<String>) -> Self {
        match next {
            Some(token) => Self::Cursor(token),
            None => Self::Exhausted,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Cursor(token) => Some(token),
            Self::NotFetched | Self::Exhausted => None,
        }
    }

    pub fn is_fetched(&self) -> bool {
        !matches!(self, Self::NotFetched)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }
}
