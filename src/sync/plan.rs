use crate::db::models::User;
use std::collections::{BTreeSet, HashSet};

/// Outcome of comparing this week's Discover Weekly against a user's history.
///
/// `discovered` is the fetched track list with duplicates collapsed, in first
/// occurrence order. `repeats` and `novel` partition it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub discovered: Vec<String>,
    pub repeats: BTreeSet<String>,
    pub novel: Vec<String>,
}

impl SyncPlan {
    pub fn compute(discover_weekly: &[String], seen: &BTreeSet<String>) -> Self {
        let mut unique = HashSet::with_capacity(discover_weekly.len());
        let discovered: Vec<String> = discover_weekly
            .iter()
            .filter(|id| unique.insert(*id))
            .cloned()
            .collect();

        let (repeated, novel): (Vec<String>, Vec<String>) = discovered
            .iter()
            .cloned()
            .partition(|id| seen.contains(id));

        Self {
            discovered,
            repeats: repeated.into_iter().collect(),
            novel,
        }
    }

    /// Fold this plan into the user's history.
    ///
    /// `track_ids` and `repeat_ids` only ever grow; `latest_repeat_ids` is
    /// replaced.
    pub fn apply_to(&self, user: &mut User) {
        user.track_ids.extend(self.discovered.iter().cloned());
        user.repeat_ids.extend(self.repeats.iter().cloned());
        user.latest_repeat_ids = self.repeats.clone();
    }
}
