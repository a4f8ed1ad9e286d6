//! Engagement ranking over users and livestreams.
//!
//! A score is the number of reactions plus the sum of tips on visible
//! livecomments, always recomputed from storage. Entities are ranked by
//! descending score; equal scores are ordered by their natural key
//! (livestream id, user name) ascending, so the smallest key in a tie gets
//! the better rank. Ranks over a population are exactly `1..=N`.
use rusqlite::Connection;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::db::queries;
use crate::error::{AppError, AppResult};

/// Bulk score source: one round trip per metric for the whole population.
/// Entities with nothing to count may be left out of the maps.
pub trait ScoreLookup {
    fn reaction_counts(&self) -> AppResult<HashMap<i64, i64>>;
    fn tip_sums(&self) -> AppResult<HashMap<i64, i64>>;
}

/// Scores keyed by livestream id.
pub struct LivestreamScores<'a>(pub &'a Connection);

impl ScoreLookup for LivestreamScores<'_> {
    fn reaction_counts(&self) -> AppResult<HashMap<i64, i64>> {
        queries::reaction_counts_by_livestream(self.0)
    }

    fn tip_sums(&self) -> AppResult<HashMap<i64, i64>> {
        queries::tip_sums_by_livestream(self.0)
    }
}

/// Scores keyed by user id, aggregated over the livestreams each user owns.
pub struct UserScores<'a>(pub &'a Connection);

impl ScoreLookup for UserScores<'_> {
    fn reaction_counts(&self) -> AppResult<HashMap<i64, i64>> {
        queries::reaction_counts_by_owner(self.0)
    }

    fn tip_sums(&self) -> AppResult<HashMap<i64, i64>> {
        queries::tip_sums_by_owner(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingEntry<K> {
    pub id: i64,
    pub key: K,
    pub score: i64,
}

/// Best entry first: higher score, then smaller tie-break key.
pub fn standing_order<K: Ord>(a: &RankingEntry<K>, b: &RankingEntry<K>) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.key.cmp(&b.key))
        .then_with(|| a.id.cmp(&b.id))
}

/// Attaches scores to `(id, key)` candidates. Ids absent from a metric score 0.
pub fn score_candidates<K, L>(
    candidates: Vec<(i64, K)>,
    lookup: &L,
) -> AppResult<Vec<RankingEntry<K>>>
where
    L: ScoreLookup + ?Sized,
{
    let reactions = lookup.reaction_counts()?;
    let tips = lookup.tip_sums()?;

    Ok(candidates
        .into_iter()
        .map(|(id, key)| {
            let score = reactions.get(&id).copied().unwrap_or(0)
                + tips.get(&id).copied().unwrap_or(0);
            RankingEntry { id, key, score }
        })
        .collect())
}

/// Sorts entries best-first.
pub fn standings<K: Ord>(mut entries: Vec<RankingEntry<K>>) -> Vec<RankingEntry<K>> {
    entries.sort_unstable_by(standing_order);
    entries
}

/// 1-based rank of `target_id`, or `None` if it is not in the population.
pub fn rank_in<K: Ord>(entries: Vec<RankingEntry<K>>, target_id: i64) -> Option<u64> {
    standings(entries)
        .iter()
        .position(|entry| entry.id == target_id)
        .map(|index| index as u64 + 1)
}

/// Scores the full population and returns the target's rank.
///
/// The target must be part of `candidates`; a missing target is a caller bug
/// and surfaces as an internal error.
pub fn compute_rank<K, L>(target_id: i64, candidates: Vec<(i64, K)>, lookup: &L) -> AppResult<u64>
where
    K: Ord,
    L: ScoreLookup + ?Sized,
{
    let population = candidates.len();
    let entries = score_candidates(candidates, lookup)?;
    rank_in(entries, target_id).ok_or_else(|| {
        AppError::Internal(format!(
            "ranking target {} missing from population of {}",
            target_id, population
        ))
    })
}

pub fn livestream_rank(conn: &Connection, livestream_id: i64) -> AppResult<u64> {
    let candidates = queries::all_livestream_ids(conn)?
        .into_iter()
        .map(|id| (id, id))
        .collect();
    compute_rank(livestream_id, candidates, &LivestreamScores(conn))
}

pub fn user_rank(conn: &Connection, user_id: i64) -> AppResult<u64> {
    let candidates = queries::all_user_names(conn)?;
    compute_rank(user_id, candidates, &UserScores(conn))
}
