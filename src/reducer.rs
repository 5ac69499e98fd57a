//! Best-frame selection. Ties go to the earliest frame in iteration order.

use serde::{Deserialize, Serialize};

use crate::frames::ScoredFrame;

/// Output of scoring every group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAnalysis {
    /// One winner per non-empty group, in group order
    pub best_per_group: Vec<ScoredFrame>,
    /// Every scored frame, in sampling order
    pub all_frames: Vec<ScoredFrame>,
}

impl GroupAnalysis {
    pub fn global_best(&self) -> Option<&ScoredFrame> {
        global_best(&self.best_per_group)
    }
}

/// Highest-scoring frame; `Iterator::max_by_key` would keep the last tie,
/// so the fold only replaces on a strictly greater score.
fn first_max(frames: &[ScoredFrame]) -> Option<&ScoredFrame> {
    frames.iter().fold(None, |best: Option<&ScoredFrame>, candidate| match best {
        Some(current) if current.score() >= candidate.score() => Some(current),
        _ => Some(candidate),
    })
}

/// Best frame within one group
pub fn best_of_group(group: &[ScoredFrame]) -> Option<&ScoredFrame> {
    first_max(group)
}

/// Best frame across the group winners. `None` means there is nothing to
/// attach as article image.
pub fn global_best(best_per_group: &[ScoredFrame]) -> Option<&ScoredFrame> {
    first_max(best_per_group)
}
