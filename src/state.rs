//! Weighted state machines.
//!
//! One machine is built per length bucket. Scanning a key, each position
//! that can distinguish keys assigns an additive weight to every possible
//! rune transition, chosen so that the running sum along any accepted path
//! identifies the match uniquely. Positions that cannot distinguish
//! anything assign nothing, but every key still accrues a zero placeholder
//! so that weight slots stay aligned with byte offsets.
//!
//! When the next weight would no longer fit in a `u64` (or in the lowered
//! ceiling the tests use), the machine is chained: the partial sums
//! accumulated so far are collapsed to small seed values and a successor
//! machine picks up at the incomplete position.

use std::collections::BTreeMap;
use std::iter;

use crate::runes::RuneClasses;
use crate::Error;

/// A state machine for one length bucket, possibly chained.
#[derive(Debug)]
pub(crate) struct Machine {
    /// Absolute byte offset at which this machine picks up.
    pub offset: usize,
    /// Next weight to assign.
    pub next: u64,
    /// Stride added to `next` after each assignment at the current
    /// position.
    pub base: u64,
    /// Weight ceiling; `u64::MAX` outside of tests.
    pub max_state: u64,
    /// Working key to its per-position weights. Slot `i` covers byte
    /// offset `offset + i`, shifted by one when a collapsed seed occupies
    /// slot 0.
    pub finals: BTreeMap<String, Vec<u64>>,
    /// Possible runes per position, one representative per equivalence
    /// class, sorted.
    pub possible: Vec<Vec<char>>,
    /// Rune to assigned weight per position.
    pub changes: Vec<BTreeMap<char, u64>>,
    /// Keys for which a position is terminal, per rune. Only populated
    /// under partial matching.
    pub no_more: Vec<BTreeMap<char, Vec<String>>>,
    /// Predecessor final state to seed weight, for chained machines.
    pub collapsed: BTreeMap<u64, u64>,
    /// Successor machine, when the weight space overflowed.
    pub continued: Option<Box<Machine>>,
}

impl Machine {
    /// Build and index the machine for one bucket of working keys.
    pub fn build(
        keys: &[String],
        classes: &RuneClasses,
        partial_match: bool,
        max_state: u64,
    ) -> Result<Machine, Error> {
        let mut machine = Machine {
            offset: 0,
            next: 1,
            base: 1,
            max_state,
            finals: keys
                .iter()
                .map(|k| (k.clone(), Vec::with_capacity(k.len())))
                .collect(),
            possible: Vec::new(),
            changes: Vec::new(),
            no_more: Vec::new(),
            collapsed: BTreeMap::new(),
            continued: None,
        };
        machine.index(classes, partial_match)?;
        Ok(machine)
    }

    /// Number of leading weight slots occupied by a collapsed seed.
    pub fn seed_slots(&self) -> usize {
        usize::from(!self.collapsed.is_empty())
    }

    /// The weight-slot index for absolute byte offset `off`.
    pub fn weight_index(&self, off: usize) -> usize {
        off - self.offset + self.seed_slots()
    }

    /// The final state of a key: the sum of its weights.
    pub fn final_state(&self, key: &str) -> u64 {
        self.finals.get(key).into_iter().flatten().sum()
    }

    /// This machine followed by its chained successors.
    pub fn chain(&self) -> impl Iterator<Item = &Machine> {
        iter::successors(Some(self), |m| m.continued.as_deref())
    }

    /// The last machine in the chain.
    pub fn last(&self) -> &Machine {
        self.chain().last().expect("chain is never empty")
    }

    /// Assign a weight to each state change that can distinguish keys.
    /// Under partial matching, also record where a key's discrimination
    /// ends so the emitter can check for a match mid-scan.
    fn index(&mut self, classes: &RuneClasses, partial_match: bool) -> Result<(), Error> {
        let keys: Vec<String> = self.finals.keys().cloned().collect();
        let longest = keys.iter().map(|k| k.len()).max().unwrap_or(0);
        let seed = self.seed_slots();
        let mut need_shift = true;

        for off in self.offset..longest {
            let idx = off - self.offset;
            let u = classes.unique_at_offset(&keys, off);
            self.possible.push(u.clone());
            self.changes.push(BTreeMap::new());
            self.no_more.push(BTreeMap::new());

            if u.len() > 1 {
                if need_shift {
                    self.base = self.next;
                    need_shift = false;
                }
                for &r in &u {
                    let mut assigned = false;
                    for key in &keys {
                        let bytes = key.as_bytes();
                        if bytes.len() <= off {
                            continue;
                        }
                        if partial_match && off >= bytes.len() - 1 {
                            // The key's last rune never takes a weight
                            // under partial matching; `no_more` covers it.
                            continue;
                        }
                        if classes.is_equiv(bytes[off] as char, r) {
                            self.finals
                                .get_mut(key)
                                .expect("key is present")
                                .push(self.next);
                            assigned = true;
                        }
                    }
                    if assigned {
                        self.changes[idx].insert(r, self.next);
                        if self.base > self.max_state - self.next {
                            return self.overflow(off, classes, partial_match);
                        }
                        self.next += self.base;
                        need_shift = true;
                    }
                }
            }

            // Zero placeholders keep weight slots aligned with offsets.
            let want = idx + seed + 1;
            for key in &keys {
                if key.len() > off {
                    let weights = self.finals.get_mut(key).expect("key is present");
                    if weights.len() < want {
                        weights.push(0);
                    }
                }
            }

            if partial_match {
                for &r in &u {
                    for key in &keys {
                        let bytes = key.as_bytes();
                        if bytes.len() == off + 1 && classes.is_equiv(bytes[off] as char, r) {
                            self.no_more[idx].entry(r).or_default().push(key.clone());
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Handle weight-space exhaustion at absolute offset `real_offset` by
    /// chaining a successor machine. The incomplete position is discarded
    /// here and re-indexed by the successor; keys whose discrimination
    /// already finished stay behind.
    fn overflow(
        &mut self,
        real_offset: usize,
        classes: &RuneClasses,
        partial_match: bool,
    ) -> Result<(), Error> {
        if real_offset == self.offset {
            // A fresh machine could not fit this position either, so
            // chaining cannot make progress.
            return Err(Error::Overflow);
        }

        let keep = real_offset - self.offset;
        let seed = self.seed_slots();
        self.possible.truncate(keep);
        self.changes.truncate(keep);
        self.no_more.truncate(keep);
        for weights in self.finals.values_mut() {
            weights.truncate(keep + seed);
        }

        let mut collapsed: BTreeMap<u64, u64> = BTreeMap::new();
        let mut finals: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for key in self.finals.keys() {
            if key.len() <= real_offset {
                continue;
            }
            let sum = self.final_state(key);
            let fresh = collapsed.len() as u64 + 1;
            let seed_weight = *collapsed.entry(sum).or_insert(fresh);
            finals.insert(key.clone(), vec![seed_weight]);
        }

        let start = collapsed.len() as u64 + 1;
        let mut successor = Machine {
            offset: real_offset,
            next: start,
            base: start,
            max_state: self.max_state,
            finals,
            possible: Vec::new(),
            changes: Vec::new(),
            no_more: Vec::new(),
            collapsed,
            continued: None,
        };
        successor.index(classes, partial_match)?;
        self.continued = Some(Box::new(successor));
        Ok(())
    }

    /// Forget a possible match, across the whole chain. Called by the
    /// ambiguity pass to prune redundant keys so the emitted dispatch has
    /// no duplicate or unreachable arms.
    pub fn delete_key(&mut self, key: &str) {
        self.finals.remove(key);
        for per_rune in &mut self.no_more {
            for keys in per_rune.values_mut() {
                keys.retain(|k| k != key);
            }
        }
        if let Some(successor) = &mut self.continued {
            successor.delete_key(key);
        }
    }
}
