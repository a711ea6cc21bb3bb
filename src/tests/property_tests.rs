//! Property tests over the equivalence relation and matcher behavior.

use proptest::prelude::*;

use super::harness::{cases, matcher, matcher_with_ceiling};
use crate::runes::RuneClasses;
use crate::Flag;

fn classes_from(cliques: &[Vec<char>]) -> RuneClasses {
    let flags: Vec<Flag> = cliques
        .iter()
        .map(|c| Flag::equivalent(c.iter().copied()))
        .collect();
    RuneClasses::from_flags(&flags)
}

proptest! {
    #[test]
    fn equivalence_is_symmetric_and_transitive(
        cliques in proptest::collection::vec(
            proptest::collection::vec(proptest::char::range('a', 'h'), 2..4),
            0..4,
        )
    ) {
        let classes = classes_from(&cliques);
        let alphabet: Vec<char> = ('a'..='h').collect();

        for &a in &alphabet {
            prop_assert!(classes.is_equiv(a, a));
            for &b in &alphabet {
                prop_assert_eq!(classes.is_equiv(a, b), classes.is_equiv(b, a));
                for &c in &alphabet {
                    if classes.is_equiv(a, b) && classes.is_equiv(b, c) {
                        prop_assert!(classes.is_equiv(a, c));
                    }
                }
            }
        }
    }

    #[test]
    fn expand_is_idempotent(
        cliques in proptest::collection::vec(
            proptest::collection::vec(proptest::char::range('a', 'h'), 2..4),
            0..4,
        ),
        runes in proptest::collection::vec(proptest::char::range('a', 'h'), 0..6),
    ) {
        let classes = classes_from(&cliques);
        let expanded = classes.expand(&runes, &[]);
        prop_assert_eq!(classes.expand(&expanded, &[]), expanded.clone());

        // Sorted and de-duplicated.
        let mut sorted = expanded.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(sorted, expanded);
    }

    #[test]
    fn expand_excludes_whole_classes(
        cliques in proptest::collection::vec(
            proptest::collection::vec(proptest::char::range('a', 'h'), 2..4),
            0..4,
        ),
        runes in proptest::collection::vec(proptest::char::range('a', 'h'), 0..6),
        excluded in proptest::collection::vec(proptest::char::range('a', 'h'), 0..3),
    ) {
        let classes = classes_from(&cliques);
        for r in classes.expand(&runes, &[&excluded]) {
            for &e in &excluded {
                prop_assert!(!classes.is_equiv(r, e), "{:?} is equivalent to excluded {:?}", r, e);
            }
        }
    }

    #[test]
    fn insensitive_matches_any_casing(mask in proptest::collection::vec(any::<bool>(), 4)) {
        let table = cases(&[("quux", "1"), ("corge", "2")]);
        let input: String = "quux"
            .chars()
            .zip(mask)
            .map(|(c, upper)| if upper { c.to_ascii_uppercase() } else { c })
            .collect();
        prop_assert_eq!(matcher(&table, "0", &[Flag::Insensitive], &input), "1");
    }

    #[test]
    fn chaining_agrees_with_unchained(input in "[a-l]{0,8}") {
        let table = cases(&[("abcdef", "1"), ("ghijkl", "2"), ("abghij", "3")]);
        let unchained = matcher(&table, "0", &[], &input);
        for ceiling in [0xff_u64, 0xffff] {
            let chained = matcher_with_ceiling(&table, "0", &[], ceiling, &input);
            prop_assert_eq!(&chained, &unchained, "ceiling {:#x}", ceiling);
        }
    }

    #[test]
    fn non_keys_are_rejected(input in "[a-c]{0,4}") {
        let table = cases(&[("abc", "1"), ("cba", "2")]);
        let want = match input.as_str() {
            "abc" => "1",
            "cba" => "2",
            _ => "0",
        };
        prop_assert_eq!(matcher(&table, "0", &[], &input), want);
    }

    #[test]
    fn ignored_insertions_never_change_the_match(positions in proptest::collection::vec(0usize..=3, 0..4)) {
        let table = cases(&[("foo", "1"), ("bar", "2")]);
        let mut input: Vec<char> = "foo".chars().collect();
        // Insert dots at arbitrary positions; ignored runes are invisible.
        for &p in &positions {
            let p = p.min(input.len());
            input.insert(p, '.');
        }
        let input: String = input.into_iter().collect();
        prop_assert_eq!(matcher(&table, "0", &[Flag::ignore(['.'])], &input), "1");
    }
}
