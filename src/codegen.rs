//! Rust source emission.
//!
//! Walks the prepared machines and writes the matcher body to a byte
//! sink: length dispatch, one byte `match` per position, collapse
//! switches at chain boundaries, and the final state dispatch. The
//! emitted code assumes an in-scope `input: &str` and closes the caller's
//! function with the trailing brace.
//!
//! Output goes straight to the sink, checked on every write; nothing is
//! buffered, so a failing sink surfaces immediately and a failed run
//! leaves partial output for the caller to discard.
//!
//! Rust imposes two departures from the classic switch-based shape: every
//! `match` needs a `_` arm even where a C or Go switch would simply fall
//! through, and match patterns must be literals, so final states appear
//! as single hex sums rather than `0x1 + 0x2` style expressions.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::pipeline::{Bucket, Prepared};
use crate::state::Machine;

// ══════════════════════════════════════════════════════════════════════════════
// Indented sink
// ══════════════════════════════════════════════════════════════════════════════

/// Line-oriented writer with indentation tracking.
struct Sink<'w, W: Write> {
    w: &'w mut W,
    indent: usize,
}

impl<'w, W: Write> Sink<'w, W> {
    fn new(w: &'w mut W, indent: usize) -> Sink<'w, W> {
        Sink { w, indent }
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        for _ in 0..self.indent {
            self.w.write_all(b"    ")?;
        }
        writeln!(self.w, "{}", text)
    }

    fn open(&mut self, text: &str) -> io::Result<()> {
        self.line(text)?;
        self.indent += 1;
        Ok(())
    }

    fn close(&mut self, text: &str) -> io::Result<()> {
        self.indent -= 1;
        self.line(text)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Byte-literal rendering
// ══════════════════════════════════════════════════════════════════════════════

/// Render one rune as a byte-match literal: `b'x'` for printable ASCII,
/// raw hex otherwise.
fn byte_literal(r: char) -> String {
    match r {
        '\'' => String::from(r"b'\''"),
        '\\' => String::from(r"b'\\'"),
        '\n' => String::from(r"b'\n'"),
        '\r' => String::from(r"b'\r'"),
        '\t' => String::from(r"b'\t'"),
        ' '..='~' => format!("b'{}'", r),
        _ => format!("{:#x}", r as u32),
    }
}

/// Render a rune list as a `|`-joined match pattern. Runes that do not
/// fit in a byte cannot appear in the input and are dropped.
fn arm_literals(runes: &[char]) -> String {
    let lits: Vec<String> = runes
        .iter()
        .copied()
        .filter(|&r| (r as u32) <= 0xff)
        .map(byte_literal)
        .collect();
    lits.join(" | ")
}

// ══════════════════════════════════════════════════════════════════════════════
// Matcher body
// ══════════════════════════════════════════════════════════════════════════════

/// Write the complete matcher body, including the closing brace of the
/// caller's function.
pub(crate) fn write_matcher<W: Write>(w: &mut W, p: &Prepared, none: &str) -> io::Result<()> {
    let mut out = Sink::new(w, 1);

    if p.buckets.is_empty() {
        out.line(&format!("return {};", none))?;
        out.indent = 0;
        return out.line("}");
    }

    out.line("let input = input.as_bytes();")?;

    let simple = !p.flags.partial_match && !p.flags.mangles();
    if simple {
        out.open("match input.len() {")?;
        for bucket in &p.buckets {
            out.open(&format!("{} => {{", bucket.len))?;
            write_bucket(&mut out, p, bucket, false, none)?;
            out.close("}")?;
        }
        out.line(&format!("_ => return {},", none))?;
        out.close("}")?;
    } else {
        let last = p.buckets.len() - 1;
        for (n, bucket) in p.buckets.iter().enumerate() {
            out.open(&format!("if input.len() >= {} {{", bucket.len))?;
            write_bucket(&mut out, p, bucket, n == last, none)?;
            out.close("}")?;
        }
    }

    out.line(&format!("return {};", none))?;
    out.indent = 0;
    out.line("}")
}

/// Index expression for the byte examined at position `off`.
fn position_expr(off: usize, backwards: bool, counts_ignored: bool) -> String {
    match (backwards, counts_ignored) {
        (false, false) => format!("input[{}]", off),
        (false, true) => format!("input[{} + ignored]", off),
        (true, false) => format!("input[input.len() - {}]", off + 1),
        (true, true) => format!("input[input.len() - {} - ignored]", off + 1),
    }
}

/// Write the body of one length bucket.
fn write_bucket<W: Write>(
    out: &mut Sink<'_, W>,
    p: &Prepared,
    bucket: &Bucket,
    last_bucket: bool,
    none: &str,
) -> io::Result<()> {
    let flags = &p.flags;
    let cases = &p.keyset.cases;
    let root = &bucket.machine;
    let len = bucket.len;
    let counts_ignored = !flags.ignore.is_empty() || !flags.ignore_except.is_empty();

    // Under stop/ignore mangling the input's significant length is only
    // discovered while scanning, so a failed attempt in this bucket must
    // fall through to the next shorter one instead of rejecting outright.
    // A labeled block gives the emitted code its goto.
    let falls_through = !flags.partial_match && flags.mangles();
    let miss = if falls_through {
        format!("break 'b{}", len)
    } else {
        format!("return {}", none)
    };

    if falls_through {
        out.open(&format!("'b{}: {{", len))?;
    }

    // With a single weightless key the scan itself is the proof and no
    // state accumulator is needed.
    let unconditional = !flags.partial_match
        && root.continued.is_none()
        && root.finals.len() == 1
        && root.next == 1;

    if !unconditional {
        if root.next > 1 || root.continued.is_some() {
            out.line("let mut state: u64 = 0;")?;
        } else {
            out.line("let state: u64 = 0;")?;
        }
    }
    if counts_ignored {
        out.line("let mut ignored: usize = 0;")?;
    }

    let mut machine = root;
    for off in 0..len {
        if let Some(successor) = machine.continued.as_deref() {
            if successor.offset == off {
                write_collapse(out, successor, &miss)?;
                machine = successor;
            }
        }
        write_position(out, p, machine, off, len, &miss, counts_ignored)?;
    }

    if flags.partial_match {
        if !last_bucket {
            out.line(&format!("return {};", none))?;
        }
        return Ok(());
    }

    if flags.mangles() {
        write_tail_consumer(out, p, len, &miss, counts_ignored)?;
    }

    let last = root.last();
    if unconditional {
        let key = root.finals.keys().next().expect("single key");
        out.line(&format!("return {};", cases[key]))?;
    } else {
        out.open("match state {")?;
        for key in last.finals.keys() {
            out.line(&format!(
                "{:#x} => return {},",
                last.final_state(key),
                cases[key]
            ))?;
        }
        out.line("_ => {}")?;
        out.close("}")?;
    }

    if falls_through {
        out.close("}")?;
    }
    Ok(())
}

/// Rewrite the predecessor's final states into the successor's seed
/// weights at a chain boundary.
fn write_collapse<W: Write>(
    out: &mut Sink<'_, W>,
    successor: &Machine,
    miss: &str,
) -> io::Result<()> {
    out.open("state = match state {")?;
    for (&sum, &seed) in &successor.collapsed {
        out.line(&format!("{:#x} => {:#x},", sum, seed))?;
    }
    out.line(&format!("_ => {},", miss))?;
    out.close("};")
}

/// Write the byte dispatch for one position.
fn write_position<W: Write>(
    out: &mut Sink<'_, W>,
    p: &Prepared,
    machine: &Machine,
    off: usize,
    len: usize,
    miss: &str,
    counts_ignored: bool,
) -> io::Result<()> {
    let flags = &p.flags;
    let cases = &p.keyset.cases;
    let idx = off - machine.offset;

    if counts_ignored {
        out.open(&format!("'p{}: loop {{", off))?;
    }
    out.open(&format!(
        "match {} {{",
        position_expr(off, flags.backwards, counts_ignored)
    ))?;

    let ignore_pattern = arm_literals(&flags.ignore);
    if !ignore_pattern.is_empty() {
        out.open(&format!("{} => {{", ignore_pattern))?;
        write_skip_ignored(out, off, len, miss)?;
        out.close("}")?;
    }

    for &r in &machine.possible[idx] {
        let pattern = arm_literals(&flags.classes.lookup(r));
        let stops = machine.no_more[idx].get(&r).filter(|keys| !keys.is_empty());
        let change = machine.changes[idx].get(&r).copied().unwrap_or(0);
        match (stops, change) {
            (None, 0) => out.line(&format!("{} => {{}}", pattern))?,
            (None, w) => out.line(&format!("{} => state += {:#x},", pattern, w))?,
            (Some(keys), w) => {
                out.open(&format!("{} => {{", pattern))?;
                out.open("match state {")?;
                for key in keys {
                    out.line(&format!(
                        "{:#x} => return {},",
                        machine.final_state(key),
                        cases[key]
                    ))?;
                }
                out.line("_ => {}")?;
                out.close("}")?;
                if w > 0 {
                    out.line(&format!("state += {:#x};", w))?;
                }
                out.close("}")?;
            }
        }
    }

    if !flags.ignore_except.is_empty() {
        // Stop runes keep stopping even when listed as significant.
        let stop_pattern = arm_literals(&flags.stop);
        if !stop_pattern.is_empty() {
            out.line(&format!("{} => {},", stop_pattern, miss))?;
        }
        // Significant runes that match no key end the attempt; everything
        // else is skipped.
        let wrong = arm_literals(&flags.classes.expand(
            &flags.ignore_except,
            &[&machine.possible[idx], &flags.stop],
        ));
        if !wrong.is_empty() {
            out.line(&format!("{} => {},", wrong, miss))?;
        }
        out.open("_ => {")?;
        write_skip_ignored(out, off, len, miss)?;
        out.close("}")?;
    } else if flags.partial_match && off == len - 1 {
        out.line("_ => {}")?;
    } else {
        out.line(&format!("_ => {},", miss))?;
    }

    out.close("}")?;
    if counts_ignored {
        out.line("break;")?;
        out.close("}")?;
    }
    Ok(())
}

/// Consume one ignored byte and rescan the current position, bailing out
/// when too little input remains to complete the bucket.
fn write_skip_ignored<W: Write>(
    out: &mut Sink<'_, W>,
    off: usize,
    len: usize,
    miss: &str,
) -> io::Result<()> {
    out.line("ignored += 1;")?;
    out.open(&format!("if input.len() < {} + ignored {{", len))?;
    out.line(&format!("{};", miss))?;
    out.close("}")?;
    out.line(&format!("continue 'p{};", off))
}

/// Consume the bytes past the last significant position: a stop rune ends
/// the scan, ignorable runes are skipped, anything else means the mangled
/// input is longer than this bucket and cannot match.
fn write_tail_consumer<W: Write>(
    out: &mut Sink<'_, W>,
    p: &Prepared,
    len: usize,
    miss: &str,
    counts_ignored: bool,
) -> io::Result<()> {
    let flags = &p.flags;

    if flags.backwards {
        if counts_ignored {
            out.line(&format!(
                "let mut trailing = input.len() - {} - ignored;",
                len
            ))?;
        } else {
            out.line(&format!("let mut trailing = input.len() - {};", len))?;
        }
        out.open("while trailing > 0 {")?;
        out.line("trailing -= 1;")?;
    } else {
        if counts_ignored {
            out.line(&format!("let mut trailing = {} + ignored;", len))?;
        } else {
            out.line(&format!("let mut trailing = {};", len))?;
        }
        out.open("while trailing < input.len() {")?;
    }

    out.open("match input[trailing] {")?;
    let stop_pattern = arm_literals(&flags.stop);
    if !stop_pattern.is_empty() {
        out.line(&format!("{} => break,", stop_pattern))?;
    }
    let consume = if flags.backwards {
        "{}"
    } else {
        "trailing += 1"
    };
    if !flags.ignore.is_empty() {
        let ignore_pattern = arm_literals(&flags.ignore);
        if !ignore_pattern.is_empty() {
            out.line(&format!("{} => {},", ignore_pattern, consume))?;
        }
        out.line(&format!("_ => {},", miss))?;
    } else if !flags.ignore_except.is_empty() {
        let significant =
            arm_literals(&flags.classes.expand(&flags.ignore_except, &[&flags.stop]));
        if !significant.is_empty() {
            out.line(&format!("{} => {},", significant, miss))?;
        }
        out.line(&format!("_ => {},", consume))?;
    } else {
        out.line(&format!("_ => {},", miss))?;
    }
    out.close("}")?;
    out.close("}")
}

// ══════════════════════════════════════════════════════════════════════════════
// Reverse mapper and test assertions
// ══════════════════════════════════════════════════════════════════════════════

/// Write the reverse-mapper body: return expression back to quoted key,
/// in lexicographic key order.
pub(crate) fn write_reverse<W: Write>(
    w: &mut W,
    cases: &BTreeMap<String, String>,
    none: &str,
) -> io::Result<()> {
    let mut out = Sink::new(w, 1);
    out.open("match input {")?;
    for (key, value) in cases {
        out.line(&format!("{} => return {:?},", value, key))?;
    }
    out.line("_ => {}")?;
    out.close("}")?;
    out.line(&format!("return {};", none))?;
    out.indent = 0;
    out.line("}")
}

/// Write `assert_eq!` statements exercising each case. Every `{}` in a
/// template is replaced with the quoted key (forward) or the verbatim
/// return expression (reverse); an empty template skips that direction.
pub(crate) fn write_assertions<W: Write>(
    w: &mut W,
    forward_fmt: &str,
    reverse_fmt: &str,
    cases: &BTreeMap<String, String>,
) -> io::Result<()> {
    let mut out = Sink::new(w, 1);
    for (key, value) in cases {
        if !forward_fmt.is_empty() {
            let call = forward_fmt.replace("{}", &format!("{:?}", key));
            out.line(&format!("assert_eq!({}, {});", call, value))?;
        }
        if !reverse_fmt.is_empty() {
            let call = reverse_fmt.replace("{}", value);
            out.line(&format!("assert_eq!({}, {:?});", call, key))?;
        }
    }
    Ok(())
}
