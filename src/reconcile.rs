//! Keyed diff between two consecutive renders.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Enter,
    Update,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<K> {
    /// Keys only in the new set, in new-set order.
    pub entering: Vec<K>,
    /// Keys in both sets, in new-set order.
    pub updating: Vec<K>,
    /// Keys only in the previous set, in previous-set order.
    pub exiting: Vec<K>,
}

impl<K> Reconciliation<K> {
    pub fn is_unchanged(&self) -> bool {
        self.entering.is_empty() && self.exiting.is_empty()
    }
}

impl<K: Eq + Hash> Reconciliation<K> {
    /// Phase of every key, for lookups inside per-node loops.
    pub fn phases(&self) -> HashMap<&K, Phase> {
        let mut phases = HashMap::with_capacity(
            self.entering.len() + self.updating.len() + self.exiting.len(),
        );
        phases.extend(self.entering.iter().map(|key| (key, Phase::Enter)));
        phases.extend(self.updating.iter().map(|key| (key, Phase::Update)));
        phases.extend(self.exiting.iter().map(|key| (key, Phase::Exit)));
        phases
    }

    pub fn phase_of(&self, key: &K) -> Option<Phase> {
        if self.entering.contains(key) {
            Some(Phase::Enter)
        } else if self.updating.contains(key) {
            Some(Phase::Update)
        } else if self.exiting.contains(key) {
            Some(Phase::Exit)
        } else {
            None
        }
    }
}

/// Classifies every key of `previous` and `next`. Duplicate keys within one
/// side are counted once.
pub fn reconcile<K>(previous: &[K], next: &[K]) -> Reconciliation<K>
where
    K: Eq + Hash + Clone,
{
    let before: HashSet<&K> = previous.iter().collect();
    let after: HashSet<&K> = next.iter().collect();

    let mut seen = HashSet::new();
    let mut entering = Vec::new();
    let mut updating = Vec::new();
    for key in next {
        if !seen.insert(key) {
            continue;
        }
        if before.contains(key) {
            updating.push(key.clone());
        } else {
            entering.push(key.clone());
        }
    }

    let mut exiting = Vec::new();
    let mut seen_exit = HashSet::new();
    for key in previous {
        if !after.contains(key) && seen_exit.insert(key) {
            exiting.push(key.clone());
        }
    }

    Reconciliation {
        entering,
        updating,
        exiting,
    }
}
