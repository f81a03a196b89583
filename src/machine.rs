//! The iterative match driver.
//!
//! Matching never recurses on the host call stack. Every in-flight fragment
//! is a [`Frame`] on an explicit stack and fragments communicate with the
//! driver through a small resume protocol: a resumed frame either completes
//! (success or failure) or asks the driver to evaluate a child frame first,
//! and receives that child's outcome on its next resume. This keeps deeply
//! nested grammars from overflowing the call stack and turns the depth limit
//! into a count of in-flight frames rather than a property of the host.

use std::mem;

use crate::types::fragment::{Alternative, Fragment, FragmentId, Kind, RepeatCount};
use crate::types::span::Span;
use crate::types::tree::Match;

/// In-flight state for one fragment match.
struct Frame {
    fragment: FragmentId,

    /// Where this frame started matching.
    begin: usize,

    /// Cursor, advanced past every successful child match.
    at: usize,

    /// Next child to try (sequence, alternative) or the number of
    /// iterations started (repeat).
    index: usize,

    /// Child matches accumulated so far.
    sub_matches: Vec<Match>,
}

impl Frame {
    fn start(fragment: FragmentId, at: usize) -> Self {
        Self {
            fragment,
            begin: at,
            at,
            index: 0,
            sub_matches: Vec::new(),
        }
    }
}

/// The outcome of the most recently popped frame, handed to the next resume
/// of the frame below it.
#[derive(Default)]
enum Outcome {
    /// No child has reported yet; the frame is being resumed for the first
    /// time.
    #[default]
    None,
    Success(Match),
    Failure,
}

/// What a resumed frame asks the driver to do.
enum Step {
    /// Pop the frame; it matched.
    Complete(Match),
    /// Pop the frame; it cannot match.
    Fail,
    /// Push the child frame and resume it next.
    Descend(Frame),
}

/// Matches `root` against the start of `input`.
///
/// Returns the match produced by the first complete attempt, or `None` if
/// the root fails, if `max_steps` resumes are exhausted, or if every path
/// runs into the `max_depth` frame limit.
pub(crate) fn run(
    fragments: &[Fragment],
    root: FragmentId,
    input: &[u8],
    max_depth: usize,
    max_steps: u64,
) -> Option<Match> {
    let mut stack = vec![Frame::start(root, 0)];
    let mut last = Outcome::None;
    let mut steps = 0u64;

    while let Some(top) = stack.last_mut() {
        let outcome = mem::take(&mut last);
        match resume(fragments, top, outcome, input) {
            Step::Complete(m) => {
                stack.pop();
                last = Outcome::Success(m);
            }
            Step::Fail => {
                stack.pop();
                last = Outcome::Failure;
            }
            Step::Descend(frame) => {
                // A frame that would exceed the depth limit is reported to
                // its parent as an ordinary child failure, so matching backs
                // off instead of aborting.
                if stack.len() >= max_depth {
                    last = Outcome::Failure;
                } else {
                    stack.push(frame);
                }
            }
        }

        steps += 1;
        if steps >= max_steps {
            return None;
        }
    }

    match last {
        Outcome::Success(m) => Some(m),
        Outcome::Failure | Outcome::None => None,
    }
}

fn resume(fragments: &[Fragment], frame: &mut Frame, last: Outcome, input: &[u8]) -> Step {
    match fragments[frame.fragment.index()].kind() {
        Kind::Undefined => Step::Fail,
        Kind::Literal(byte) => resume_literal(*byte, frame, input),
        Kind::Sequence(children) => resume_sequence(children, frame, last),
        Kind::Alternative(alt) => resume_alternative(alt, frame, last, input),
        Kind::Repeat { child, count } => resume_repeat(*child, *count, frame, last),
    }
}

fn resume_literal(byte: u8, frame: &Frame, input: &[u8]) -> Step {
    if frame.at == input.len() {
        return Step::Fail;
    }
    if input[frame.at] == byte {
        let span = Span::new(frame.at, frame.at + 1);
        return Step::Complete(Match::leaf(frame.fragment, span));
    }
    Step::Fail
}

fn resume_sequence(children: &[FragmentId], frame: &mut Frame, last: Outcome) -> Step {
    match last {
        Outcome::Failure => return Step::Fail,
        Outcome::Success(sub) => {
            frame.at = sub.span.end;
            frame.sub_matches.push(sub);
        }
        Outcome::None => {}
    }

    if frame.index == children.len() {
        let span = Span::new(frame.begin, frame.at);
        let sub_matches = mem::take(&mut frame.sub_matches);
        return Step::Complete(Match::new(frame.fragment, span, sub_matches));
    }

    let child = children[frame.index];
    frame.index += 1;
    Step::Descend(Frame::start(child, frame.at))
}

fn resume_alternative(alt: &Alternative, frame: &mut Frame, last: Outcome, input: &[u8]) -> Step {
    // First resume only: the table settles the leading run of literal
    // children in one lookup. A miss means every child in that run would
    // fail on this byte, so skip past the run.
    if frame.index == 0 && alt.prefix > 0 {
        if frame.at < input.len() {
            if let Some(child) = alt.table[input[frame.at] as usize] {
                let span = Span::new(frame.at, frame.at + 1);
                let sub = Match::leaf(child, span);
                return Step::Complete(Match::new(frame.fragment, span, vec![sub]));
            }
        }
        frame.index += alt.prefix;
    }

    match last {
        Outcome::Success(sub) => {
            let span = sub.span;
            return Step::Complete(Match::new(frame.fragment, span, vec![sub]));
        }
        Outcome::Failure | Outcome::None => {}
    }

    if frame.index == alt.children.len() {
        return Step::Fail;
    }

    let child = alt.children[frame.index];
    frame.index += 1;
    Step::Descend(Frame::start(child, frame.begin))
}

fn resume_repeat(child: FragmentId, count: RepeatCount, frame: &mut Frame, last: Outcome) -> Step {
    match last {
        Outcome::Failure => {
            // Greedy with a single level of backoff: settle for the
            // iterations that already matched, if that satisfies `min`.
            if frame.index > count.min {
                let span = Span::new(frame.begin, frame.at);
                let sub_matches = mem::take(&mut frame.sub_matches);
                return Step::Complete(Match::new(frame.fragment, span, sub_matches));
            }
            return Step::Fail;
        }
        Outcome::Success(sub) => {
            frame.at = sub.span.end;
            frame.sub_matches.push(sub);
        }
        Outcome::None => {}
    }

    if frame.index == count.max {
        let span = Span::new(frame.begin, frame.at);
        let sub_matches = mem::take(&mut frame.sub_matches);
        return Step::Complete(Match::new(frame.fragment, span, sub_matches));
    }

    // The index advances even when the child matched zero bytes, so bounded
    // repeats of nullable children terminate.
    frame.index += 1;
    Step::Descend(Frame::start(child, frame.at))
}
