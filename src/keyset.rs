//! Key preparation: reversal and mangling.
//!
//! The state machine never sees the caller's keys directly. Under
//! `HasSuffix` each key is reversed so matching can scan right-to-left;
//! under stop/ignore rules each key is rewritten to the form the scanner
//! will actually observe. Several original keys can collapse onto one
//! working key, so a reverse index is kept for error reporting, and
//! collisions with conflicting return expressions are collected as
//! ambiguity groups.

use std::collections::BTreeMap;

use crate::flags::FlagSet;

/// The working key set: what the state machine indexes, plus enough
/// information to talk about the caller's original keys in errors.
#[derive(Debug)]
pub(crate) struct KeySet {
    /// Working (reversed and mangled) key to return expression. When
    /// several originals collapse onto one working key with the same
    /// return expression, one entry survives.
    pub cases: BTreeMap<String, String>,
    /// Working key back to the original keys that produced it, sorted.
    pub originals: BTreeMap<String, Vec<String>>,
    /// Groups of original keys that collapsed onto the same working key
    /// with conflicting return expressions.
    pub collisions: Vec<Vec<String>>,
}

impl KeySet {
    pub fn new(cases: &BTreeMap<String, String>, flags: &FlagSet) -> KeySet {
        let mut working: BTreeMap<String, String> = BTreeMap::new();
        let mut originals: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (key, value) in cases {
            let mut work = if flags.backwards {
                key.chars().rev().collect()
            } else {
                key.clone()
            };
            if flags.mangles() {
                work = mangle(&work, flags);
            }
            originals.entry(work.clone()).or_default().push(key.clone());
            working.entry(work).or_insert_with(|| value.clone());
        }

        let mut collisions = Vec::new();
        for origs in originals.values() {
            if origs.len() < 2 {
                continue;
            }
            let mut values: Vec<&String> = origs.iter().map(|k| &cases[k]).collect();
            values.sort_unstable();
            values.dedup();
            if values.len() > 1 {
                collisions.push(origs.clone());
            }
        }

        KeySet {
            cases: working,
            originals,
            collisions,
        }
    }
}

/// Rewrite a (possibly reversed) key into the form the scanner observes:
/// truncate at the first stop rune, keep only significant runes under
/// `IgnoreExcept`, and drop ignored runes.
fn mangle(key: &str, flags: &FlagSet) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if flags.stop.contains(&c) {
            break;
        }
        if !flags.ignore_except.is_empty() && !flags.ignore_except.contains(&c) {
            continue;
        }
        if flags.ignore.contains(&c) {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flag;

    fn cases(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn stop_truncates() {
        let flags = FlagSet::new(&[Flag::stop_upon(['.'])]).unwrap();
        assert_eq!(mangle("foo.bar", &flags), "foo");
        assert_eq!(mangle(".foo", &flags), "");
        assert_eq!(mangle("foo", &flags), "foo");
    }

    #[test]
    fn ignore_skips() {
        let flags = FlagSet::new(&[Flag::ignore(['-'])]).unwrap();
        assert_eq!(mangle("a-b-c", &flags), "abc");
    }

    #[test]
    fn ignore_except_keeps_only_significant() {
        let flags = FlagSet::new(&[Flag::ignore_except(['0', '1'])]).unwrap();
        assert_eq!(mangle("f0o1o", &flags), "01");
    }

    #[test]
    fn stop_wins_over_ignore_except() {
        let flags =
            FlagSet::new(&[Flag::stop_upon(['.']), Flag::ignore_except(['a', '.'])]).unwrap();
        assert_eq!(mangle("a.a", &flags), "a");
    }

    #[test]
    fn suffix_reverses_before_mangling() {
        let flags = FlagSet::new(&[Flag::HasSuffix, Flag::stop_upon(['.'])]).unwrap();
        let set = KeySet::new(&cases(&[("exe", "1")]), &flags);
        assert!(set.cases.contains_key("exe"));
        assert_eq!(set.originals["exe"], vec!["exe".to_string()]);
    }

    #[test]
    fn collisions_with_same_value_merge() {
        let flags = FlagSet::new(&[Flag::ignore(['.'])]).unwrap();
        let set = KeySet::new(&cases(&[("foo", "1"), ("f.oo", "1")]), &flags);
        assert_eq!(set.cases.len(), 1);
        assert_eq!(set.cases["foo"], "1");
        assert!(set.collisions.is_empty());
        assert_eq!(
            set.originals["foo"],
            vec!["f.oo".to_string(), "foo".to_string()]
        );
    }

    #[test]
    fn collisions_with_conflicting_values_are_reported() {
        let flags = FlagSet::new(&[Flag::ignore(['.'])]).unwrap();
        let set = KeySet::new(&cases(&[("foo", "1"), ("foo.", "2")]), &flags);
        assert_eq!(set.collisions.len(), 1);
        assert_eq!(
            set.collisions[0],
            vec!["foo".to_string(), "foo.".to_string()]
        );
    }
}
