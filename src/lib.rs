//! # keymatch — code generation for compile-time string matching
//!
//! `keymatch` generates Rust source for quickly comparing an input string
//! to a set of possible matches known at build time. The typical use is a
//! "reverse enum", such as a lexer that needs to map keywords to token
//! values without hashing or a cascade of string comparisons.
//!
//! The obvious approaches both do redundant work at runtime. A `match` on
//! string literals compares the input against each pattern in sequence,
//! restarting the scan for every arm; a `HashMap` hashes the whole input
//! and chases buckets. And neither helps once matching needs to be
//! case-insensitive, accept partial matches, or treat a class of
//! characters (say, all digits) as interchangeable.
//!
//! The code emitted by this crate partitions the search space by input
//! length, then drives a small state machine over the bytes of the input:
//! each position switches on one byte, adding a precomputed weight to an
//! accumulator, and bails out the moment no match is possible. The final
//! accumulator value identifies the match with one integer comparison.
//! Every byte is examined at most once.
//!
//! ## Pipeline
//!
//! ```text
//! cases + flags
//!       │
//!       ▼
//!  1. FlagSet      flag validation, rune-equivalence closure
//!  2. KeySet       reversal (HasSuffix), stop/ignore mangling
//!  3. Buckets      working keys partitioned by length
//!  4. Machines     additive weight assignment, overflow chaining
//!  5. Ambiguity    (final state, terminal rune) partition check
//!  6. Emission     length / byte / state dispatch as Rust source
//! ```
//!
//! ## Example
//!
//! The generator writes a function *body*; the caller supplies the
//! signature around it and the input must be in scope as `input: &str`:
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use keymatch::{generate, Flag};
//!
//! let mut cases = BTreeMap::new();
//! cases.insert("foo".to_string(), "1".to_string());
//! cases.insert("bar".to_string(), "2".to_string());
//!
//! let mut out = Vec::new();
//! out.extend_from_slice(b"fn match_keyword(input: &str) -> i32 {\n");
//! generate(&mut out, &cases, "0", &[Flag::Insensitive]).unwrap();
//!
//! let source = String::from_utf8(out).unwrap();
//! assert!(source.contains("match input.len()"));
//! ```
//!
//! Generation fails rather than emit a matcher that cannot work: flag
//! combinations that contradict each other ([`Error::BadFlags`]), more
//! distinct weights than a `u64` can hold even after chaining
//! ([`Error::Overflow`]), and keys the matcher could never tell apart
//! ([`Error::Ambiguous`]) are all reported up front. Sink failures
//! surface as [`Error::Write`]; output is unbuffered, so the caller
//! should discard partial output on error.

mod ambiguity;
mod codegen;
mod flags;
mod keyset;
mod pipeline;
mod runes;
mod state;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::error;
use std::fmt;
use std::io;
use std::io::Write as _;

use proc_macro2::TokenStream;

pub use ambiguity::Ambiguities;
pub use flags::{alphanumeric, letters, lowercase, numbers, range, uppercase, BadFlags, Flag};

/// Errors reported by the generator.
#[derive(Debug)]
pub enum Error {
    /// Nonsensical flag combination.
    BadFlags(BadFlags),
    /// The weight space was exhausted and chaining could not make
    /// progress.
    Overflow,
    /// The matcher cannot distinguish keys that demand different return
    /// expressions.
    Ambiguous(Ambiguities),
    /// The sink refused a write.
    Write(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadFlags(e) => e.fmt(f),
            Error::Overflow => f.write_str("too many values to match (u64 overflow)"),
            Error::Ambiguous(e) => e.fmt(f),
            Error::Write(e) => e.fmt(f),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::BadFlags(e) => Some(e),
            Error::Write(e) => Some(e),
            Error::Overflow | Error::Ambiguous(_) => None,
        }
    }
}

impl From<BadFlags> for Error {
    fn from(e: BadFlags) -> Error {
        Error::BadFlags(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Write(e)
    }
}

/// The matcher generator.
///
/// The default configuration is right for production use; the weight
/// ceiling exists so tests can force state-machine chaining without
/// sixty-plus-character keys:
///
/// ```
/// use std::collections::BTreeMap;
///
/// use keymatch::Generator;
///
/// let mut cases = BTreeMap::new();
/// cases.insert("abcdef".to_string(), "1".to_string());
/// cases.insert("ghijkl".to_string(), "2".to_string());
///
/// let mut out = Vec::new();
/// Generator::new()
///     .max_state(0xff)
///     .generate(&mut out, &cases, "0", &[])
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Generator {
    max_state: u64,
}

impl Default for Generator {
    fn default() -> Generator {
        Generator::new()
    }
}

impl Generator {
    pub fn new() -> Generator {
        Generator {
            max_state: u64::MAX,
        }
    }

    /// Lower the weight ceiling. Weights beyond the ceiling trigger
    /// chaining into a successor machine.
    pub fn max_state(mut self, limit: u64) -> Generator {
        self.max_state = limit;
        self
    }

    /// Write the body of a function mapping an input string to one of the
    /// return expressions in `cases`, or to `none` when nothing matches.
    ///
    /// Each entry in `cases` pairs a possible match with the expression
    /// the generated code returns for it; expressions are copied into the
    /// output verbatim. The caller is expected to have written the
    /// function signature already, with the string to examine in a
    /// variable named `input`; the closing brace is emitted here.
    pub fn generate<W: io::Write>(
        &self,
        w: &mut W,
        cases: &BTreeMap<String, String>,
        none: &str,
        flags: &[Flag],
    ) -> Result<(), Error> {
        let prepared = pipeline::prepare(cases, flags, self.max_state)?;
        codegen::write_matcher(w, &prepared, none)?;
        Ok(())
    }

    /// Write the body of a function mapping a return expression back to
    /// its key, the reverse of [`Generator::generate`]. The input value
    /// must be in scope as `input`; keys are emitted as quoted string
    /// literals in lexicographic order.
    ///
    /// Flags are accepted to match `generate`'s signature but are
    /// ignored. Several keys mapping to one return expression are
    /// reported as [`Error::Ambiguous`].
    pub fn generate_reverse<W: io::Write>(
        &self,
        w: &mut W,
        cases: &BTreeMap<String, String>,
        none: &str,
        _flags: &[Flag],
    ) -> Result<(), Error> {
        let ambiguities = reverse_ambiguities(cases);
        if !ambiguities.is_empty() {
            return Err(Error::Ambiguous(ambiguities));
        }
        codegen::write_reverse(w, cases, none)?;
        Ok(())
    }

    /// Write `assert_eq!` statements exercising each case in both
    /// directions, for embedding in a test.
    ///
    /// `forward_fmt` and `reverse_fmt` are expression templates; every
    /// `{}` is replaced with the quoted key (forward) or the verbatim
    /// return expression (reverse). An empty template skips that
    /// direction. The forward ambiguity analysis always runs first; the
    /// reverse duplicate check runs when `reverse_fmt` is used.
    pub fn generate_test<W: io::Write>(
        &self,
        w: &mut W,
        forward_fmt: &str,
        reverse_fmt: &str,
        cases: &BTreeMap<String, String>,
        flags: &[Flag],
    ) -> Result<(), Error> {
        pipeline::prepare(cases, flags, self.max_state)?;
        if !reverse_fmt.is_empty() {
            let ambiguities = reverse_ambiguities(cases);
            if !ambiguities.is_empty() {
                return Err(Error::Ambiguous(ambiguities));
            }
        }
        codegen::write_assertions(w, forward_fmt, reverse_fmt, cases)?;
        Ok(())
    }

    /// Generate a complete matcher function as a token stream, for use
    /// from build scripts and procedural macros. `name` is the function
    /// name, `ret` its return type.
    pub fn generate_tokens(
        &self,
        name: &str,
        ret: &str,
        cases: &BTreeMap<String, String>,
        none: &str,
        flags: &[Flag],
    ) -> Result<TokenStream, Error> {
        let mut buf = Vec::new();
        writeln!(buf, "pub fn {}(input: &str) -> {} {{", name, ret)?;
        self.generate(&mut buf, cases, none, flags)?;
        let source = String::from_utf8(buf).expect("generated source is UTF-8");
        Ok(source
            .parse()
            .expect("generated matcher code must be valid Rust"))
    }
}

/// Generate a matcher body with the default configuration. See
/// [`Generator::generate`].
pub fn generate<W: io::Write>(
    w: &mut W,
    cases: &BTreeMap<String, String>,
    none: &str,
    flags: &[Flag],
) -> Result<(), Error> {
    Generator::new().generate(w, cases, none, flags)
}

/// Generate a reverse-mapper body with the default configuration. See
/// [`Generator::generate_reverse`].
pub fn generate_reverse<W: io::Write>(
    w: &mut W,
    cases: &BTreeMap<String, String>,
    none: &str,
    flags: &[Flag],
) -> Result<(), Error> {
    Generator::new().generate_reverse(w, cases, none, flags)
}

/// Generate test assertions with the default configuration. See
/// [`Generator::generate_test`].
pub fn generate_test<W: io::Write>(
    w: &mut W,
    forward_fmt: &str,
    reverse_fmt: &str,
    cases: &BTreeMap<String, String>,
    flags: &[Flag],
) -> Result<(), Error> {
    Generator::new().generate_test(w, forward_fmt, reverse_fmt, cases, flags)
}

/// Generate a complete matcher function as a token stream with the
/// default configuration. See [`Generator::generate_tokens`].
pub fn generate_tokens(
    name: &str,
    ret: &str,
    cases: &BTreeMap<String, String>,
    none: &str,
    flags: &[Flag],
) -> Result<TokenStream, Error> {
    Generator::new().generate_tokens(name, ret, cases, none, flags)
}

/// Groups of keys sharing a return expression, which the reverse mapper
/// cannot distinguish.
fn reverse_ambiguities(cases: &BTreeMap<String, String>) -> Ambiguities {
    let mut by_value: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for (key, value) in cases {
        by_value.entry(value.as_str()).or_default().push(key.clone());
    }

    let mut ambiguities = Ambiguities::default();
    for keys in by_value.values() {
        if keys.len() > 1 {
            ambiguities.add(keys.iter().cloned());
        }
    }
    ambiguities
}
