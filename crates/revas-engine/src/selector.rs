//! # Reviewer Selection
//!
//! One algorithm serves initial assignment, single reassignment and the
//! bulk cascade: filter the pool, draw a uniformly random permutation,
//! keep a prefix.
//!
//! The random source is injected. [`ReviewerSelector::from_seed`] gives
//! repeatable draws in tests; production seeds once from OS entropy. The
//! generator is never reseeded per call.

use std::collections::HashSet;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use revas_core::{Team, UserId};

/// Pick at most `max_count` users from `pool`.
///
/// Users in `exclude` and users for which `is_active` is false are
/// dropped; duplicates in `pool` count once. Every ordering of the
/// remaining candidates is equally likely, and the first `max_count` of
/// that ordering are returned.
pub fn select<R, F>(
    pool: &[UserId],
    exclude: &HashSet<UserId>,
    is_active: F,
    max_count: usize,
    rng: &mut R,
) -> Vec<UserId>
where
    R: Rng + ?Sized,
    F: Fn(&UserId) -> bool,
{
    let mut seen = HashSet::with_capacity(pool.len());
    let mut candidates: Vec<UserId> = pool
        .iter()
        .filter(|id| !exclude.contains(*id) && is_active(*id))
        .filter(|id| seen.insert(**id))
        .copied()
        .collect();
    if candidates.is_empty() || max_count == 0 {
        return Vec::new();
    }
    candidates.shuffle(rng);
    candidates.truncate(max_count);
    candidates
}

/// [`select`] bound to an owned, seeded random source.
///
/// The lock is held only for the duration of one draw and never across an
/// await point.
#[derive(Debug)]
pub struct ReviewerSelector {
    rng: Mutex<StdRng>,
}

impl ReviewerSelector {
    /// Deterministic selector for tests and reproducible runs.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Selector seeded once from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Pick from an explicit pool.
    pub fn pick<F>(
        &self,
        pool: &[UserId],
        exclude: &HashSet<UserId>,
        is_active: F,
        max_count: usize,
    ) -> Vec<UserId>
    where
        F: Fn(&UserId) -> bool,
    {
        let mut rng = self.rng.lock();
        select(pool, exclude, is_active, max_count, &mut *rng)
    }

    /// Pick active members of `team` outside `exclude`.
    pub fn pick_from_team(
        &self,
        team: &Team,
        exclude: &HashSet<UserId>,
        max_count: usize,
    ) -> Vec<UserId> {
        let pool = team.member_ids();
        self.pick(&pool, exclude, |id| team.is_active_member(id), max_count)
    }
}

impl Default for ReviewerSelector {
    fn default() -> Self {
        Self::from_entropy()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Picks are distinct, bounded, active and never excluded.
        #[test]
        fn picks_respect_filters(
            pool_size in 0usize..12,
            excluded_mask in proptest::collection::vec(any::<bool>(), 12),
            active_mask in proptest::collection::vec(any::<bool>(), 12),
            max_count in 0usize..4,
            seed in any::<u64>(),
        ) {
            let pool: Vec<UserId> = (0..pool_size).map(|_| UserId::new()).collect();
            let exclude: HashSet<UserId> = pool
                .iter()
                .zip(&excluded_mask)
                .filter(|(_, e)| **e)
                .map(|(id, _)| *id)
                .collect();
            let active: HashSet<UserId> = pool
                .iter()
                .zip(&active_mask)
                .filter(|(_, a)| **a)
                .map(|(id, _)| *id)
                .collect();

            let mut rng = StdRng::seed_from_u64(seed);
            let picked = select(&pool, &exclude, |id| active.contains(id), max_count, &mut rng);

            let eligible = pool
                .iter()
                .filter(|id| !exclude.contains(*id) && active.contains(*id))
                .count();
            prop_assert_eq!(picked.len(), eligible.min(max_count));
            let unique: HashSet<&UserId> = picked.iter().collect();
            prop_assert_eq!(unique.len(), picked.len());
            for id in &picked {
                prop_assert!(!exclude.contains(id));
                prop_assert!(active.contains(id));
                prop_assert!(pool.contains(id));
            }
        }
    }
}
