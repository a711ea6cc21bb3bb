//! Ambiguity detection.
//!
//! A matcher is ambiguous when two keys demanding different return
//! expressions cannot be told apart: they collapse to the same mangled
//! image, or they meet the scanner in the same state on the same terminal
//! rune. This module partitions keys by `(final state, terminal rune)`,
//! prunes keys that are merely redundant (same return expression, so the
//! shortest one suffices), and collects the genuinely conflicting groups.
//!
//! Analysis never stops at the first conflict; every group is collected so
//! the error names all of them at once.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::state::Machine;

/// Terminal-rune marker for keys that end at end-of-string rather than on
/// a recorded rune.
const NO_RUNE: u32 = 0;

/// Groups of keys the matcher cannot distinguish.
///
/// Adding a group merges it with every existing group it shares a key
/// with, so each key ends up in at most one group. Groups render with the
/// keys sorted lexicographically and the groups ordered by first key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ambiguities {
    groups: Vec<BTreeSet<String>>,
}

impl Ambiguities {
    pub(crate) fn new() -> Ambiguities {
        Ambiguities::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Record a group of mutually indistinguishable keys, merging with any
    /// existing group that shares a key.
    pub(crate) fn add<I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut merged: BTreeSet<String> = keys.into_iter().collect();
        if merged.is_empty() {
            return;
        }
        let mut remaining = Vec::with_capacity(self.groups.len());
        for group in self.groups.drain(..) {
            if group.iter().any(|k| merged.contains(k)) {
                merged.extend(group);
            } else {
                remaining.push(group);
            }
        }
        remaining.push(merged);
        self.groups = remaining;
    }

    /// The groups in rendering order: keys sorted within each group,
    /// groups sorted by their first key.
    pub fn groups(&self) -> Vec<Vec<String>> {
        let mut out: Vec<Vec<String>> = self
            .groups
            .iter()
            .map(|g| g.iter().cloned().collect())
            .collect();
        out.sort();
        out
    }
}

impl fmt::Display for Ambiguities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ambiguous matches: ")?;
        for (n, group) in self.groups().iter().enumerate() {
            if n != 0 {
                f.write_str("; ")?;
            }
            for (m, key) in group.iter().enumerate() {
                if m != 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{:?}", key)?;
            }
        }
        Ok(())
    }
}

/// Verify that each `(final state, terminal rune)` partition of a machine
/// chain maps to exactly one return expression.
///
/// Partitions with one return expression but several keys are collapsed:
/// every key but the shortest is deleted from the chain, which keeps the
/// emitted dispatch free of duplicate and unreachable arms. Partitions
/// with several return expressions become ambiguity groups, reported in
/// original (pre-mangling) form via `originals`.
pub(crate) fn check_ambiguity(
    machine: &mut Machine,
    cases: &BTreeMap<String, String>,
    originals: &BTreeMap<String, Vec<String>>,
    ambiguities: &mut Ambiguities,
) {
    let mut deletions: BTreeSet<String> = BTreeSet::new();

    for m in machine.chain() {
        // (final state, terminal rune) -> return expression -> keys
        let mut buckets: BTreeMap<(u64, u32), BTreeMap<&str, BTreeSet<&str>>> = BTreeMap::new();
        let mut ended_here: BTreeSet<&str> = BTreeSet::new();

        for (idx, per_rune) in m.no_more.iter().enumerate() {
            let off = m.offset + idx;
            let slot = m.weight_index(off);
            for (&r, keys) in per_rune {
                let transition = m.changes[idx].get(&r).copied().unwrap_or(0);
                for key in keys {
                    let sum = m.final_state(key);
                    let bucket = buckets.entry((sum, r as u32)).or_default();
                    bucket
                        .entry(cases[key].as_str())
                        .or_default()
                        .insert(key.as_str());
                    ended_here.insert(key.as_str());

                    // Longer keys that pass through the same intermediate
                    // state on the same rune are part of this partition.
                    for (other, weights) in &m.finals {
                        if other.len() <= key.len() {
                            continue;
                        }
                        if weights.get(slot).copied().unwrap_or(0) != transition {
                            continue;
                        }
                        let prefix: u64 = weights[..slot].iter().sum();
                        if prefix != sum {
                            continue;
                        }
                        buckets
                            .entry((sum, r as u32))
                            .or_default()
                            .entry(cases[other].as_str())
                            .or_default()
                            .insert(other.as_str());
                    }
                }
            }
        }

        // Keys that run the machine to completion here are partitioned by
        // final state alone. Keys handed to a successor are checked there.
        for key in m.finals.keys() {
            if let Some(successor) = &m.continued {
                if successor.finals.contains_key(key) {
                    continue;
                }
            }
            if ended_here.contains(key.as_str()) {
                continue;
            }
            buckets
                .entry((m.final_state(key), NO_RUNE))
                .or_default()
                .entry(cases[key].as_str())
                .or_default()
                .insert(key.as_str());
        }

        for by_value in buckets.values() {
            let all: BTreeSet<&str> = by_value.values().flatten().copied().collect();
            if by_value.len() == 1 {
                if all.len() > 1 {
                    let keep = all
                        .iter()
                        .copied()
                        .min_by_key(|k: &&str| (k.len(), *k))
                        .expect("partition is non-empty");
                    deletions.extend(
                        all.iter()
                            .filter(|&&k| k != keep)
                            .map(|k| k.to_string()),
                    );
                }
            } else {
                ambiguities.add(
                    all.iter()
                        .flat_map(|k| originals[*k].iter().cloned()),
                );
            }
        }
    }

    for key in deletions {
        machine.delete_key(&key);
    }
}
