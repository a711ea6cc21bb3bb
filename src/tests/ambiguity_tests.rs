//! Ambiguity detection across flag combinations, including chained
//! machines and mangling collisions.

use std::collections::BTreeMap;
use std::io;

use super::harness::cases;
use crate::{generate_reverse, Error, Flag, Generator};

/// Generation must fail with exactly the expected groups; making every
/// return value identical must make the same input succeed.
fn expect_ambiguous(
    table: &BTreeMap<String, String>,
    flags: &[Flag],
    max_state: u64,
    want: &[&[&str]],
) {
    let generator = Generator::new().max_state(max_state);

    let err = generator
        .generate(&mut io::sink(), table, "0", flags)
        .expect_err("ambiguity should be detected");
    let ambiguities = match err {
        Error::Ambiguous(a) => a,
        other => panic!("expected Error::Ambiguous, got {:?}", other),
    };

    let want: Vec<Vec<String>> = want
        .iter()
        .map(|group| group.iter().map(|k| k.to_string()).collect())
        .collect();
    assert_eq!(ambiguities.groups(), want);

    // Each key appears exactly once in the rendering.
    let rendered = ambiguities.to_string();
    for key in table.keys() {
        let quoted = format!("{:?}", key);
        let count = rendered.matches(&quoted).count();
        let expected = usize::from(want.iter().any(|g| g.contains(key)));
        assert_eq!(count, expected, "{:?} in {:?}", key, rendered);
    }

    let merged: BTreeMap<String, String> = table
        .keys()
        .map(|k| (k.clone(), "1".to_string()))
        .collect();
    generator
        .generate(&mut io::sink(), &merged, "0", flags)
        .expect("merging return values should resolve the ambiguity");
}

#[test]
fn insensitive() {
    let table = cases(&[
        ("Foo", "1"),
        ("foo", "2"),
        ("Bar", "3"),
        ("bar", "4"),
        ("bat", "5"),
    ]);
    let want: &[&[&str]] = &[&["Bar", "bar"], &["Foo", "foo"]];
    expect_ambiguous(&table, &[Flag::Insensitive], u64::MAX, want);
    expect_ambiguous(&table, &[Flag::Insensitive, Flag::HasPrefix], u64::MAX, want);
    expect_ambiguous(&table, &[Flag::Insensitive, Flag::HasSuffix], u64::MAX, want);
}

#[test]
fn insensitive_chained() {
    let table = cases(&[
        ("abcdefghijklmnop", "1"),
        ("ABCdefghijklmnop", "2"),
        ("ponmlkjihgfedcba", "3"),
        ("ponmlkjihgfedCBA", "4"),
        ("zyxwvutsrqponmlk", "5"),
    ]);
    expect_ambiguous(
        &table,
        &[Flag::Insensitive],
        0xff,
        &[
            &["ABCdefghijklmnop", "abcdefghijklmnop"],
            &["ponmlkjihgfedCBA", "ponmlkjihgfedcba"],
        ],
    );
}

#[test]
fn has_prefix() {
    let table = cases(&[
        ("foo", "1"),
        ("f", "2"),
        ("bar", "3"),
        ("b", "4"),
        ("qoo", "5"),
    ]);
    expect_ambiguous(
        &table,
        &[Flag::HasPrefix],
        u64::MAX,
        &[&["b", "bar"], &["f", "foo"]],
    );

    let table = cases(&[
        ("foo", "1"),
        ("fo", "2"),
        ("bar", "3"),
        ("ba", "4"),
        ("far", "5"),
        ("fa", "6"),
        ("tar", "5"),
    ]);
    expect_ambiguous(
        &table,
        &[Flag::HasPrefix],
        u64::MAX,
        &[&["ba", "bar"], &["fa", "far"], &["fo", "foo"]],
    );
}

#[test]
fn has_prefix_chained() {
    let table = cases(&[
        ("abcdefghijklmnop", "1"),
        ("abcdefghijklm", "2"),
        ("ponmlkjihgfedcba", "3"),
        ("po", "4"),
        ("zyxwvutsrqponmlk", "5"),
    ]);
    expect_ambiguous(
        &table,
        &[Flag::HasPrefix],
        0xff,
        &[
            &["abcdefghijklm", "abcdefghijklmnop"],
            &["po", "ponmlkjihgfedcba"],
        ],
    );
}

#[test]
fn has_suffix() {
    // Same final rune, shorter key ends inside the longer one.
    let table = cases(&[("oof", "1"), ("f", "2"), ("bar", "3")]);
    expect_ambiguous(&table, &[Flag::HasSuffix], u64::MAX, &[&["f", "oof"]]);

    // Same intermediate state, different lengths.
    let table = cases(&[("oof", "1"), ("of", "2")]);
    expect_ambiguous(&table, &[Flag::HasSuffix], u64::MAX, &[&["of", "oof"]]);
}

#[test]
fn stop_upon_collapse() {
    let table = cases(&[
        ("foo", "1"),
        ("foo.", "2"),
        ("bar.x", "3"),
        ("bar.y", "4"),
        ("far", "5"),
        ("quick", "6"),
    ]);
    expect_ambiguous(
        &table,
        &[Flag::stop_upon(['.'])],
        u64::MAX,
        &[&["bar.x", "bar.y"], &["foo", "foo."]],
    );
}

#[test]
fn ignore_collapse() {
    let table = cases(&[
        ("foo", "1"),
        ("foo.", "2"),
        ("barx", "3"),
        ("bar.x", "4"),
        ("far", "5"),
        ("quick", "6"),
    ]);
    expect_ambiguous(
        &table,
        &[Flag::ignore(['.'])],
        u64::MAX,
        &[&["bar.x", "barx"], &["foo", "foo."]],
    );
}

#[test]
fn ignore_except_collapse() {
    let table = cases(&[
        ("f0o0o", "1"),
        ("00", "2"),
        ("ba11r", "3"),
        ("11", "4"),
        ("101", "5"),
        ("010", "6"),
    ]);
    expect_ambiguous(
        &table,
        &[Flag::ignore_except(['0', '1'])],
        u64::MAX,
        &[&["00", "f0o0o"], &["11", "ba11r"]],
    );
}

#[test]
fn reverse_duplicate_values() {
    let table = cases(&[("foo", "1"), ("bar", "1"), ("baz", "2"), ("bat", "2")]);
    let err = generate_reverse(&mut io::sink(), &table, "\"\"", &[])
        .expect_err("duplicate values should be detected");
    match err {
        Error::Ambiguous(ambiguities) => {
            assert_eq!(
                ambiguities.groups(),
                vec![
                    vec!["bar".to_string(), "foo".to_string()],
                    vec!["bat".to_string(), "baz".to_string()],
                ]
            );
        }
        other => panic!("expected Error::Ambiguous, got {:?}", other),
    }
}

#[test]
fn reverse_distinct_values() {
    let table = cases(&[("foo", "1"), ("bar", "2")]);
    let mut out = Vec::new();
    generate_reverse(&mut out, &table, "\"\"", &[]).expect("distinct values are fine");
    assert!(!out.is_empty());
}
