//! The match tree produced by a successful match.

use std::fmt;

use crate::types::fragment::FragmentId;
use crate::types::span::Span;

/// A node in the match tree.
///
/// Records the fragment that matched, the input region it covered and the
/// child matches in input order. The shape mirrors the grammar: a sequence
/// node holds one child per part, an alternative node holds exactly the
/// winning branch, a repeat node holds one child per iteration and a literal
/// node holds none.
#[derive(Clone, PartialEq, Eq)]
pub struct Match {
    pub(crate) fragment: FragmentId,
    pub(crate) span: Span,
    pub(crate) sub_matches: Vec<Match>,
}

/// How [`Match::search_for`] descends into the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    /// Visit direct children only.
    TopLevelOnly,
    /// Depth-first, but do not descend into a yielded match.
    Recursive,
    /// Depth-first, yield every match regardless of nesting.
    All,
}

impl Match {
    pub(crate) fn new(fragment: FragmentId, span: Span, sub_matches: Vec<Match>) -> Self {
        Self {
            fragment,
            span,
            sub_matches,
        }
    }

    pub(crate) fn leaf(fragment: FragmentId, span: Span) -> Self {
        Self::new(fragment, span, Vec::new())
    }

    /// The fragment that produced this match.
    pub fn fragment(&self) -> FragmentId {
        self.fragment
    }

    /// The input region this match covered.
    pub fn span(&self) -> Span {
        self.span
    }

    /// The child matches in input order.
    pub fn sub_matches(&self) -> &[Match] {
        &self.sub_matches
    }

    /// Returns the first descendant produced by `fragment`, depth-first in
    /// input order. The node itself is never returned.
    pub fn find(&self, fragment: FragmentId) -> Option<&Match> {
        self.search_for(fragment, SearchMode::All).next()
    }

    /// Lazily yields the descendants produced by `fragment`.
    ///
    /// The node itself is never yielded; `mode` controls how deep the search
    /// descends and whether it continues inside a yielded match.
    pub fn search_for(&self, fragment: FragmentId, mode: SearchMode) -> Search<'_> {
        let mut stack = Vec::new();
        stack.extend(self.sub_matches.iter().rev());
        Search {
            fragment,
            mode,
            stack,
        }
    }
}

impl fmt::Debug for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Match")
            .field("fragment", &self.fragment)
            .field("span", &self.span)
            .field("sub_matches", &self.sub_matches)
            .finish()
    }
}

/// A lazy iterator over matching descendants, created by
/// [`Match::search_for`].
pub struct Search<'tree> {
    fragment: FragmentId,
    mode: SearchMode,
    stack: Vec<&'tree Match>,
}

impl<'tree> Iterator for Search<'tree> {
    type Item = &'tree Match;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            let hit = node.fragment == self.fragment;
            match self.mode {
                SearchMode::TopLevelOnly => {}
                SearchMode::Recursive if hit => {}
                SearchMode::Recursive | SearchMode::All => {
                    self.stack.extend(node.sub_matches.iter().rev());
                }
            }
            if hit {
                return Some(node);
            }
        }
        None
    }
}
