//! Pipeline orchestration.
//!
//! Runs the offline stages in order and hands the emitter a fully
//! prepared, ambiguity-checked set of machines:
//!
//! 1. Normalize flags and compute rune equivalence
//! 2. Reverse and mangle keys into the working set
//! 3. Bucket working keys by length, largest first
//! 4. Build one weighted state machine per bucket
//! 5. Check every machine chain for ambiguity, pruning redundant keys
//!
//! Construction errors surface before a single byte of output is written;
//! ambiguity is collected across all buckets so the error lists every
//! conflicting group, not just the first.

use std::collections::BTreeMap;

use crate::ambiguity::{check_ambiguity, Ambiguities};
use crate::flags::{Flag, FlagSet};
use crate::keyset::KeySet;
use crate::state::Machine;
use crate::Error;

/// One length bucket: the working keys of this length (plus all shorter
/// keys under partial matching) and their machine chain.
#[derive(Debug)]
pub(crate) struct Bucket {
    pub len: usize,
    pub machine: Machine,
}

/// Everything the emitter needs, produced by [`prepare`].
#[derive(Debug)]
pub(crate) struct Prepared {
    pub flags: FlagSet,
    pub keyset: KeySet,
    /// Buckets in descending length order.
    pub buckets: Vec<Bucket>,
}

/// Run stages 1 through 5.
pub(crate) fn prepare(
    cases: &BTreeMap<String, String>,
    flags: &[Flag],
    max_state: u64,
) -> Result<Prepared, Error> {
    let flags = FlagSet::new(flags)?;
    let keyset = KeySet::new(cases, &flags);

    let mut by_len: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for key in keyset.cases.keys() {
        by_len.entry(key.len()).or_default().push(key.clone());
    }

    // A short key also matches the front of any longer input, so under
    // partial matching each bucket absorbs the keys of all shorter ones.
    if flags.partial_match {
        let lengths: Vec<usize> = by_len.keys().copied().collect();
        for window in lengths.windows(2) {
            let (smaller, bigger) = (window[0], window[1]);
            let absorbed = by_len[&smaller].clone();
            by_len
                .get_mut(&bigger)
                .expect("length bucket exists")
                .extend(absorbed);
        }
    }

    let mut ambiguities = Ambiguities::new();
    for group in &keyset.collisions {
        ambiguities.add(group.iter().cloned());
    }

    let mut buckets = Vec::with_capacity(by_len.len());
    for (&len, keys) in by_len.iter().rev() {
        let mut machine = Machine::build(keys, &flags.classes, flags.partial_match, max_state)?;
        check_ambiguity(
            &mut machine,
            &keyset.cases,
            &keyset.originals,
            &mut ambiguities,
        );
        buckets.push(Bucket { len, machine });
    }

    if !ambiguities.is_empty() {
        return Err(Error::Ambiguous(ambiguities));
    }

    Ok(Prepared {
        flags,
        keyset,
        buckets,
    })
}
