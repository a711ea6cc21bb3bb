//! Rune equivalence classes.
//!
//! Flags like `Insensitive` and `Equivalent` declare that certain runes
//! should be treated identically when matching. This module closes those
//! declarations into a symmetric, reflexive, transitive relation and
//! provides the lookups the state machine builds on: per-rune class
//! membership, set expansion with exclusions, and the set of distinct
//! runes possible at a byte offset across a group of keys.
//!
//! Keys are indexed by byte position throughout the crate, so equivalence
//! is only meaningful for runes that occupy a single byte. Declaring wider
//! runes equivalent is accepted but has no effect on matching.

use std::collections::{BTreeMap, BTreeSet};

use crate::flags::Flag;

/// The frozen rune-equivalence relation: each rune maps to the sorted,
/// de-duplicated set of runes equivalent to it, itself included. Runes
/// without an entry are implicitly equivalent only to themselves.
#[derive(Debug, Clone, Default)]
pub(crate) struct RuneClasses {
    classes: BTreeMap<char, Vec<char>>,
}

impl RuneClasses {
    /// Build the relation from a flag list.
    ///
    /// Seeds come from `Insensitive` (26 case pairs) and each `Equivalent`
    /// flag (the full clique on its runes). The seeds are then closed
    /// transitively: if 'a' is equivalent to 'b' and 'b' to 'c', then 'a'
    /// must list 'c'. Closure loops until no set grows.
    pub fn from_flags(flags: &[Flag]) -> RuneClasses {
        let mut sets: BTreeMap<char, BTreeSet<char>> = BTreeMap::new();
        let mut seed = |r: char, others: &[char]| {
            let entry = sets.entry(r).or_default();
            entry.insert(r);
            entry.extend(others.iter().copied());
        };

        for flag in flags {
            match flag {
                Flag::Insensitive => {
                    for lower in 'a'..='z' {
                        let upper = lower.to_ascii_uppercase();
                        seed(lower, &[upper]);
                        seed(upper, &[lower]);
                    }
                }
                Flag::Equivalent(rs) => {
                    for &r in rs {
                        seed(r, rs);
                    }
                }
                _ => {}
            }
        }

        loop {
            let mut grew = false;
            let keys: Vec<char> = sets.keys().copied().collect();
            for r in keys {
                let members: Vec<char> = sets[&r].iter().copied().collect();
                let mut merged = sets[&r].clone();
                for m in members {
                    if let Some(other) = sets.get(&m) {
                        merged.extend(other.iter().copied());
                    }
                }
                if merged.len() > sets[&r].len() {
                    sets.insert(r, merged);
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        RuneClasses {
            classes: sets
                .into_iter()
                .map(|(r, set)| (r, set.into_iter().collect()))
                .collect(),
        }
    }

    /// The sorted equivalence set for `r`, defaulting to the singleton of
    /// `r` itself.
    pub fn lookup(&self, r: char) -> Vec<char> {
        self.classes.get(&r).cloned().unwrap_or_else(|| vec![r])
    }

    /// Whether two runes are equivalent.
    pub fn is_equiv(&self, a: char, b: char) -> bool {
        if a == b {
            return true;
        }
        match self.classes.get(&a) {
            Some(set) => set.binary_search(&b).is_ok(),
            None => false,
        }
    }

    /// The sorted, de-duplicated union of the equivalence sets of `rs`,
    /// minus every rune equivalent to any member of any `excludes` list.
    pub fn expand(&self, rs: &[char], excludes: &[&[char]]) -> Vec<char> {
        let mut out: BTreeSet<char> = BTreeSet::new();
        'runes: for &r in rs {
            for excluded in excludes {
                if excluded.iter().any(|&e| self.is_equiv(r, e)) {
                    continue 'runes;
                }
            }
            out.extend(self.lookup(r));
        }
        out.into_iter().collect()
    }

    /// The sorted list of distinct runes possible at byte offset `off`
    /// across `keys`, one representative per equivalence class. The first
    /// key (in slice order) to reach a class contributes the
    /// representative.
    pub fn unique_at_offset(&self, keys: &[String], off: usize) -> Vec<char> {
        let mut seen: BTreeSet<char> = BTreeSet::new();
        let mut runes = Vec::new();
        for key in keys {
            let bytes = key.as_bytes();
            if bytes.len() > off {
                let r = bytes[off] as char;
                let class = self.lookup(r);
                if class.iter().any(|c| seen.contains(c)) {
                    continue;
                }
                seen.extend(class);
                runes.push(r);
            }
        }
        runes.sort_unstable();
        runes
    }
}
