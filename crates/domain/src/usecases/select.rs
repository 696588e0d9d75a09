//! Repeat-avoiding content selection

use time::OffsetDateTime;

use crate::block_list::BlockList;
use crate::ports::RandomSource;

/// Default number of random picks before the block list is wiped
pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

/// Outcome of a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub key: String,
    /// Number of random picks made
    pub attempts: usize,
    /// Whether the attempt bound was hit and the block list cleared
    pub cleared_blocks: bool,
}

/// Errors from selection
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("No content available to post")]
    NoContent,
    #[error("Selected key '{0}' is missing from the catalog")]
    UnknownKey(String),
}

/// Picks one key uniformly at random, retrying while the pick is blocked.
///
/// After `max_attempts` blocked picks the whole block list is cleared and one
/// more pick is returned unconditionally, so the call always terminates.
pub fn select_content<R: RandomSource + ?Sized>(
    keys: &[&str],
    blocks: &mut BlockList,
    now: OffsetDateTime,
    random: &R,
    max_attempts: usize,
) -> Result<Selection, SelectionError> {
    if keys.is_empty() {
        return Err(SelectionError::NoContent);
    }

    let max_attempts = max_attempts.max(1);
    for attempt in 1..=max_attempts {
        let key = keys[random.pick(keys.len()) % keys.len()];
        if !blocks.is_blocked(key, now) {
            return Ok(Selection {
                key: key.to_string(),
                attempts: attempt,
                cleared_blocks: false,
            });
        }
        tracing::trace!(key = %key, attempt, "Picked blocked content, retrying");
    }

    tracing::warn!(
        attempts = max_attempts,
        blocked = blocks.len(),
        "No eligible content found, clearing block list"
    );
    blocks.clear();

    let key = keys[random.pick(keys.len()) % keys.len()];
    Ok(Selection {
        key: key.to_string(),
        attempts: max_attempts + 1,
        cleared_blocks: true,
    })
}
