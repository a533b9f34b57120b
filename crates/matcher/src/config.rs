use serde::{Deserialize, Serialize};

pub use embedding::DEFAULT_TOLERANCE;

/// Candidates fetched and held in memory at once.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Tuning knobs for one [`find_matches`](crate::MatchEngine::find_matches) call.
///
/// Batch size only bounds how many decoded images are alive at once; it
/// never changes which URLs match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    pub batch_size: usize,
    /// Maximum embedding distance still considered the same person.
    pub tolerance: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl MatchConfig {
    /// Batch size with `0` clamped to `1`.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}
