use crate::leaderboard::{Entry, EntryId};

/// How many entries the ranked leaderboard window holds. Scores that would
/// fall outside this window are durable in the store but never ranked.
pub const LEADERBOARD_CAPACITY: usize = 100;

/// Outcome of a rank computation. `Unranked` is a valid answer (the score
/// does not make the bounded window), not a failure; store failures travel
/// separately as `LeaderboardError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankOutcome {
    Ranked {
        /// 1-based standing within the window.
        rank: usize,
        /// Whether another window entry holds the exact same score.
        is_tied: bool,
        /// Store id of the entry, when the rank refers to a committed one.
        id: Option<EntryId>,
    },
    Unranked,
}

impl RankOutcome {
    pub fn is_ranked(&self) -> bool {
        matches!(self, RankOutcome::Ranked { .. })
    }
}

/// Standard competition ranking over an ascending-by-score window: tied
/// scores share the lower rank, and the next distinct score jumps to its
/// 1-based position. `[10, 10, 20, 30]` ranks as `[1, 1, 3, 4]`.
pub fn with_ranks(entries: &[Entry]) -> Vec<(usize, &Entry)> {
    let mut ranked = Vec::with_capacity(entries.len());
    let mut prev_rank = 0;

    for (pos, entry) in entries.iter().enumerate() {
        let rank = match pos.checked_sub(1).map(|p| &entries[p]) {
            Some(prev) if prev.score_ms == entry.score_ms => prev_rank,
            _ => pos + 1,
        };
        prev_rank = rank;
        ranked.push((rank, entry));
    }

    ranked
}

/// Speculative rank of `score_ms` against the current window, without
/// committing anything. A saturated window rejects scores strictly worse
/// than its current worst entry.
pub fn peek(window: &[Entry], capacity: usize, score_ms: u32) -> RankOutcome {
    if capacity == 0 {
        return RankOutcome::Unranked;
    }

    if window.len() >= capacity {
        if let Some(worst) = window.last() {
            if score_ms > worst.score_ms {
                return RankOutcome::Unranked;
            }
        }
    }

    RankOutcome::Ranked {
        rank: strictly_better_count(window, score_ms) + 1,
        is_tied: window.iter().any(|e| e.score_ms == score_ms),
        id: None,
    }
}

/// Authoritative rank of a freshly committed entry, computed against the
/// re-queried window. An id missing from the window means the entry fell
/// outside the bounded leaderboard even though it durably exists.
pub fn confirm(window: &[Entry], id: EntryId, score_ms: u32) -> RankOutcome {
    if !window.iter().any(|e| e.id == id) {
        return RankOutcome::Unranked;
    }

    let same_score = window.iter().filter(|e| e.score_ms == score_ms).count();

    RankOutcome::Ranked {
        rank: strictly_better_count(window, score_ms) + 1,
        is_tied: same_score > 1,
        id: Some(id),
    }
}

fn strictly_better_count(window: &[Entry], score_ms: u32) -> usize {
    window.iter().filter(|e| e.score_ms < score_ms).count()
}
