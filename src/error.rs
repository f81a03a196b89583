use std::cmp::max;

use crate::types::span::Span;

/// An error that can occur while building a catalogue or compiling a textual
/// grammar.
pub struct Error {
    /// The type of error.
    kind: ErrorKind,

    /// Optional additional reason for this kind of error.
    reason: Option<String>,

    /// Optional pretty information showing the location in the grammar text
    /// of the reason for the error.
    pretty: Option<Pretty>,
}

#[derive(Debug)]
enum ErrorKind {
    /// A key was inserted into a catalogue twice.
    DuplicateKey,

    /// A fragment referred to a key that does not exist.
    ///
    /// Reported by builder finalisation; the offending fragment stays in the
    /// catalogue as an undefined placeholder that fails every match.
    UnresolvedReference,

    /// A fragment definition was rejected.
    ///
    /// This can happen for a variety of reasons: an out-of-range child
    /// handle, an empty alternative, an inverted repetition range.
    InvalidFragment,

    /// A textual grammar failed to compile.
    Grammar,
}

impl Error {
    /// Constructs a new duplicate key error.
    pub(crate) fn duplicate_key(reason: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::DuplicateKey,
            reason: Some(reason.into()),
            pretty: None,
        }
    }

    /// Constructs a new unresolved reference error.
    pub(crate) fn unresolved(reason: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::UnresolvedReference,
            reason: Some(reason.into()),
            pretty: None,
        }
    }

    /// Constructs a new invalid fragment error.
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidFragment,
            reason: Some(reason.into()),
            pretty: None,
        }
    }

    /// Constructs a new grammar error pointing into the grammar text.
    pub(crate) fn grammar(reason: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self {
            kind: ErrorKind::Grammar,
            reason: Some(reason.into()),
            pretty: Some(Pretty::build(source, span.into())),
        }
    }

    /// Returns `true` if this error reports a reference to an unknown key.
    pub fn is_unresolved_reference(&self) -> bool {
        matches!(self.kind, ErrorKind::UnresolvedReference)
    }
}

impl std::error::Error for Error {}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !f.alternate() {
            writeln!(f, "{self:#}")?;
        }

        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("reason", &self.reason)
            .field("pretty", &self.pretty)
            .finish()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match &self.kind {
            ErrorKind::DuplicateKey => "duplicate key",
            ErrorKind::UnresolvedReference => "unresolved reference",
            ErrorKind::InvalidFragment => "invalid fragment",
            ErrorKind::Grammar => "invalid grammar",
        };
        match (&self.reason, &self.pretty) {
            (Some(r), Some(p)) if f.alternate() => {
                write!(f, "{msg}")?;
                p.fmt_with_reason(f, r)
            }
            (Some(reason), _) => write!(f, "{msg}: {reason}"),
            _ => write!(f, "{msg}"),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Pretty
////////////////////////////////////////////////////////////////////////////////

/// Holds information necessary for prettily displaying the error.
#[derive(Debug)]
struct Pretty {
    /// Zero-indexed line number.
    ln: usize,
    /// Zero-indexed column number.
    col: usize,
    /// The number of characters to highlight after `col`.
    width: usize,
    /// The relevant section of grammar text (a single line).
    text: String,
}

impl Pretty {
    fn build(source: &str, span: Span) -> Self {
        let lines: Vec<_> = source.split_terminator('\n').collect();
        let (ln, col) = to_ln_col(&lines, span.start);
        let width = max(1, display_width(&source[span]));
        let text = lines
            .get(ln)
            .or_else(|| lines.last())
            .copied()
            .unwrap_or_default()
            .to_string();
        Self {
            ln,
            col,
            width,
            text,
        }
    }

    fn fmt_with_reason(&self, f: &mut std::fmt::Formatter<'_>, reason: &str) -> std::fmt::Result {
        let num = (self.ln + 1).to_string();
        let pad = display_width(&num);
        let align = self.col + self.width;

        let z = "";
        let pipe = "|";
        let underline = "^".repeat(self.width);
        let text = &self.text;

        write!(
            f,
            "\n {z:pad$} {pipe}\
             \n {num} {pipe} {text}\
             \n {z:pad$} {pipe} {underline:>align$} {reason}\n",
        )
    }
}

fn to_ln_col(lines: &[&str], offset: usize) -> (usize, usize) {
    let mut n = 0;
    for (i, line) in lines.iter().enumerate() {
        let len = line.len() + 1;
        if n + len > offset {
            return (i, offset - n);
        }
        n += len;
    }
    (
        lines.len().saturating_sub(1),
        lines.last().map(|l| l.len()).unwrap_or(0),
    )
}

#[cfg(feature = "unicode")]
fn display_width(s: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(s)
}

#[cfg(not(feature = "unicode"))]
fn display_width(s: &str) -> usize {
    s.chars().count()
}
