//! Matcher flags and their normalization.
//!
//! Users describe how matching should behave by passing a list of [`Flag`]
//! values to the generator. Before any state machine is built, the list is
//! normalized into a [`FlagSet`]: illegal combinations are rejected, the
//! rune-equivalence relation is computed, and the stop/ignore rune vectors
//! are expanded through that relation.

use std::error;
use std::fmt;

use crate::runes::RuneClasses;

/// A modifier for the generated matcher.
///
/// Flags are plain values with structural equality. Parametric flags carry
/// their rune payload; the convenience constructors accept any iterator of
/// `char`, so ranges built with [`range`] or string literals via `.chars()`
/// both work:
///
/// ```
/// use keymatch::{range, Flag};
///
/// let digits = Flag::equivalent(range(&[('0', '9')]));
/// let scheme_end = Flag::stop_upon([':']);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
    /// Match ASCII letters without regard to case.
    Insensitive,
    /// Reserved for Unicode normalization. Accepted and currently inert.
    Normalize,
    /// Match any input that starts with one of the keys.
    ///
    /// Matching stops as soon as a match is found, so "f" and "foo" are
    /// ambiguous cases under this flag unless they map to the same return
    /// expression.
    HasPrefix,
    /// Match the end of the input string, in the same manner `HasPrefix`
    /// matches the beginning. Mutually exclusive with `HasPrefix`.
    HasSuffix,
    /// Treat the listed runes as identical when matching.
    Equivalent(Vec<char>),
    /// Runes which get treated like a string boundary: matching ceases as
    /// soon as one is seen. A match must then be immediately followed by
    /// end-of-string or a stop rune.
    ///
    /// Stop runes may not be equivalent to ignored runes. When combined
    /// with `IgnoreExcept`, stop runes keep their stopping behavior even
    /// if they also appear in the significant set.
    StopUpon(Vec<char>),
    /// Runes (including their equivalents) skipped during matching.
    /// Mutually exclusive with `IgnoreExcept`.
    Ignore(Vec<char>),
    /// The complement of `Ignore`: only the listed runes are examined,
    /// everything else is skipped.
    IgnoreExcept(Vec<char>),
}

impl Flag {
    /// Build a [`Flag::Equivalent`] flag from any iterator of runes.
    pub fn equivalent<I: IntoIterator<Item = char>>(runes: I) -> Flag {
        Flag::Equivalent(runes.into_iter().collect())
    }

    /// Build a [`Flag::StopUpon`] flag from any iterator of runes.
    pub fn stop_upon<I: IntoIterator<Item = char>>(runes: I) -> Flag {
        Flag::StopUpon(runes.into_iter().collect())
    }

    /// Build a [`Flag::Ignore`] flag from any iterator of runes.
    pub fn ignore<I: IntoIterator<Item = char>>(runes: I) -> Flag {
        Flag::Ignore(runes.into_iter().collect())
    }

    /// Build a [`Flag::IgnoreExcept`] flag from any iterator of runes.
    pub fn ignore_except<I: IntoIterator<Item = char>>(runes: I) -> Flag {
        Flag::IgnoreExcept(runes.into_iter().collect())
    }
}

/// Expand inclusive `(low, high)` rune pairs into the full list of covered
/// runes. Useful with the flags that take rune lists:
///
/// ```
/// use keymatch::{range, Flag};
///
/// let f = Flag::ignore_except(range(&[('0', '9'), ('a', 'z'), ('A', 'Z')]));
/// # let _ = f;
/// ```
pub fn range(bounds: &[(char, char)]) -> Vec<char> {
    let mut runes = Vec::new();
    for &(lo, hi) in bounds {
        let mut c = lo as u32;
        while c <= hi as u32 {
            if let Some(r) = char::from_u32(c) {
                runes.push(r);
            }
            c += 1;
        }
    }
    runes
}

/// The ASCII digits `0` through `9`.
pub fn numbers() -> Vec<char> {
    range(&[('0', '9')])
}

/// Lower-case ASCII letters.
pub fn lowercase() -> Vec<char> {
    range(&[('a', 'z')])
}

/// Upper-case ASCII letters.
pub fn uppercase() -> Vec<char> {
    range(&[('A', 'Z')])
}

/// Upper- and lower-case ASCII letters.
pub fn letters() -> Vec<char> {
    range(&[('a', 'z'), ('A', 'Z')])
}

/// ASCII digits plus upper- and lower-case letters.
pub fn alphanumeric() -> Vec<char> {
    range(&[('0', '9'), ('a', 'z'), ('A', 'Z')])
}

/// Returned when nonsensical flags are passed to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadFlags {
    /// Names of flags that may not be combined, sorted.
    pub cannot_combine: Vec<&'static str>,
    /// Stop runes that are equivalent to ignored runes, sorted.
    pub cannot_stop_ignore: Vec<char>,
}

/// Writes a list separator, with an Oxford comma before the final item of
/// lists longer than two.
fn write_list_separator(f: &mut fmt::Formatter<'_>, n: usize, last: usize) -> fmt::Result {
    if n == last {
        if n == 1 {
            f.write_str(" and ")
        } else {
            f.write_str(", and ")
        }
    } else {
        f.write_str(", ")
    }
}

impl fmt::Display for BadFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (n, name) in self.cannot_combine.iter().enumerate() {
            if n == 0 {
                f.write_str("flags are mutually exclusive: ")?;
            } else {
                write_list_separator(f, n, self.cannot_combine.len() - 1)?;
            }
            write!(f, "{:?}", name)?;
        }

        for (n, r) in self.cannot_stop_ignore.iter().enumerate() {
            if n == 0 {
                if !self.cannot_combine.is_empty() {
                    f.write_str("; ")?;
                }
                f.write_str("runes in StopUpon cannot be equivalent to runes in Ignore: ")?;
            } else {
                write_list_separator(f, n, self.cannot_stop_ignore.len() - 1)?;
            }
            write!(f, "{:?}", r)?;
        }

        Ok(())
    }
}

impl error::Error for BadFlags {}

/// The normalized form of a flag list: derived matching modes, expanded rune
/// vectors, and the computed equivalence relation.
#[derive(Debug, Clone)]
pub(crate) struct FlagSet {
    pub partial_match: bool,
    pub backwards: bool,
    pub stop: Vec<char>,
    pub ignore: Vec<char>,
    pub ignore_except: Vec<char>,
    pub classes: RuneClasses,
}

impl FlagSet {
    /// Normalize a flag list, rejecting illegal combinations.
    ///
    /// Flags are examined in order, so the first of `HasPrefix` and
    /// `HasSuffix` wins the right to set the matching direction and the
    /// other becomes the error.
    pub fn new(flags: &[Flag]) -> Result<FlagSet, BadFlags> {
        let classes = RuneClasses::from_flags(flags);

        let mut partial_match = false;
        let mut backwards = false;
        let mut stop = Vec::new();
        let mut ignore = Vec::new();
        let mut ignore_except = Vec::new();
        let mut cannot_combine: Vec<&'static str> = Vec::new();

        for flag in flags {
            match flag {
                Flag::HasPrefix => {
                    if backwards {
                        cannot_combine.extend(["HasPrefix", "HasSuffix"]);
                    } else {
                        partial_match = true;
                    }
                }
                Flag::HasSuffix => {
                    if partial_match && !backwards {
                        cannot_combine.extend(["HasPrefix", "HasSuffix"]);
                    } else {
                        partial_match = true;
                        backwards = true;
                    }
                }
                Flag::StopUpon(rs) => stop.extend(rs.iter().copied()),
                Flag::Ignore(rs) => ignore.extend(rs.iter().copied()),
                Flag::IgnoreExcept(rs) => ignore_except.extend(rs.iter().copied()),
                Flag::Insensitive | Flag::Normalize | Flag::Equivalent(_) => {}
            }
        }

        if !ignore.is_empty() && !ignore_except.is_empty() {
            cannot_combine.extend(["Ignore", "IgnoreExcept"]);
        }
        cannot_combine.sort_unstable();
        cannot_combine.dedup();

        // The raw lists are compared, so the error names the runes the user
        // actually wrote rather than their expanded equivalence classes.
        let mut cannot_stop_ignore: Vec<char> = stop
            .iter()
            .copied()
            .filter(|&s| ignore.iter().any(|&i| classes.is_equiv(s, i)))
            .collect();
        cannot_stop_ignore.sort_unstable();
        cannot_stop_ignore.dedup();

        if !cannot_combine.is_empty() || !cannot_stop_ignore.is_empty() {
            return Err(BadFlags {
                cannot_combine,
                cannot_stop_ignore,
            });
        }

        Ok(FlagSet {
            partial_match,
            backwards,
            stop: classes.expand(&stop, &[]),
            ignore: classes.expand(&ignore, &[]),
            ignore_except: classes.expand(&ignore_except, &[]),
            classes,
        })
    }

    /// Whether keys are rewritten before indexing (stop or ignore rules).
    pub fn mangles(&self) -> bool {
        !self.stop.is_empty() || !self.ignore.is_empty() || !self.ignore_except.is_empty()
    }
}
