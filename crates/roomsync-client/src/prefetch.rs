//! Scroll-triggered prefetch policy.

use roomsync_shared::constants::SCROLL_PREFETCH_THRESHOLD;
use roomsync_shared::ScrollPosition;
use roomsync_store::CursorState;

use crate::backfill::SkipReason;

/// Decide whether a scroll tick should load older history.
///
/// Only the distance from the top of the loaded history (`y`) matters.
/// Returns the reason to stay idle, or `None` to prefetch.
pub fn evaluate(position: ScrollPosition, cursor: &CursorState) -> Option<SkipReason> {
    if position.y.is_nan() || position.y > SCROLL_PREFETCH_THRESHOLD {
        return Some(SkipReason::OutOfRange);
    }
    match cursor {
        CursorState::Cursor(_) => None,
        CursorState::NotFetched => Some(SkipReason::NotFetched),
        CursorState::Exhausted => Some(SkipReason::Exhausted),
    }
}
