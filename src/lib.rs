//! A composable, backtracking, tree-producing pattern matcher.
//!
//! # Overview
//!
//! A grammar is assembled as a catalogue of named *fragments* that refer to
//! one another:
//!
//! - a **literal** matches exactly one input byte,
//! - a **repeat** matches its child greedily between `min` and `max` times,
//! - a **sequence** matches each child in order,
//! - an **alternative** tries its children in order and takes the first that
//!   matches.
//!
//! Matching a named fragment against a byte slice produces a [`Match`] tree
//! whose shape mirrors the grammar: every node records the fragment that
//! matched, the input region it covered and its child matches. Matching is
//! prefix-only (the input does not need to be fully consumed) and is driven
//! by an explicit frame stack rather than recursion, so nesting depth is
//! limited by a configurable frame count instead of the host call stack.
//!
//! # Getting started
//!
//! Fragments are created directly on a [`Catalogue`] under a key of your
//! choosing. The 256 single-byte literals are built in and shared by every
//! grammar.
//!
//! ```
//! use fragma::{Catalogue, Fragment, RepeatCount};
//!
//! let mut catalogue: Catalogue = Catalogue::new();
//!
//! let digits = catalogue.bytes_of("0123456789");
//! let digit = catalogue.emplace("digit", Fragment::alternative(digits))?;
//! catalogue.emplace("number", Fragment::repeat(digit, RepeatCount::REPEATED))?;
//!
//! let m = catalogue.match_prefix("number", "123abc").unwrap();
//! assert_eq!(m.span(), (0..3).into());
//! assert_eq!(m.sub_matches().len(), 3);
//! # Ok::<(), fragma::Error>(())
//! ```
//!
//! For larger grammars the [`Builder`] connects fragments by key, in any
//! order, resolving the references (including cycles) when it is finalised.
//! Grammars can also be written as text in the BNF+ language and compiled
//! with [`bnf::compile`]:
//!
//! ```
//! let grammar = "\
//! ab:
//!   a b
//! abs:
//!   ab+
//! ";
//! let catalogue = fragma::bnf::compile(grammar)?;
//!
//! let m = catalogue.match_prefix("abs", "ababab!").unwrap();
//! assert_eq!(m.span().len(), 6);
//! # Ok::<(), fragma::Error>(())
//! ```
//!
//! # Matching semantics
//!
//! Alternatives are ordered: the first declared child that matches wins,
//! even when a later child would match more input. Repeats are greedy with a
//! limited fallback: when an iteration beyond `min` fails, the repeat keeps
//! the iterations it already has rather than exploring shorter ones. Both
//! rules make match results deterministic functions of declaration order.
//!
//! Two limits bound every match: the maximum number of in-flight frames
//! (default 2048), exceeded frames failing locally so that matching backs
//! off, and the maximum number of resume steps (default 2³²), which aborts
//! the whole match. See [`Catalogue::set_max_depth`] and
//! [`Catalogue::set_max_steps`].
//!
//! # Features
//!
//! - **unicode** _(enabled by default)_ — Enables improved alignment of
//!   error excerpts and pulls in the [`unicode-width`][unicode_width]
//!   crate.

#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod bnf;

mod build;
mod error;
mod machine;
mod types;

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

pub use crate::build::{Builder, Part};
pub use crate::error::Error;
pub use crate::types::fragment::{Fragment, FragmentId, RepeatCount};
pub use crate::types::span::Span;
pub use crate::types::tree::{Match, Search, SearchMode};

use crate::types::fragment::{Kind, BUILT_INS};

/// A type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A collection of named fragments plus the 256 built-in byte literals.
///
/// The catalogue owns every fragment; fragments refer to each other with
/// [`FragmentId`] handles that stay valid for the catalogue's lifetime. Keys
/// default to [`String`] but any ordered type works, for example an enum.
///
/// A catalogue is grown with [`emplace`][Catalogue::emplace] (or
/// [`reserve`][Catalogue::reserve] and [`define`][Catalogue::define] for
/// cyclic grammars) and then used read-only: matching takes `&self`, so a
/// finished catalogue can be shared between threads freely.
pub struct Catalogue<K = String> {
    fragments: Vec<Fragment>,
    names: BTreeMap<K, FragmentId>,
    max_depth: usize,
    max_steps: u64,
}

impl<K: Ord + fmt::Debug> Default for Catalogue<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug> Catalogue<K> {
    /// Construct a new catalogue containing only the built-in literals.
    pub fn new() -> Self {
        let fragments = (0..=u8::MAX).map(Fragment::literal).collect();
        Self {
            fragments,
            names: BTreeMap::new(),
            max_depth: 2048,
            max_steps: 4_294_967_296,
        }
    }

    /// Set the maximum number of in-flight frames per match.
    ///
    /// A fragment that would exceed the limit fails locally and matching
    /// backs off, possibly producing a shorter match.
    ///
    /// Defaults to `2048`.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Set the maximum number of resume steps per match.
    ///
    /// A match that exhausts the limit returns no match, discarding any
    /// partial progress.
    ///
    /// Defaults to `2³²`.
    pub fn set_max_steps(&mut self, max_steps: u64) {
        self.max_steps = max_steps;
    }

    /// The handle of the built-in literal for `byte`.
    ///
    /// Present in every catalogue for all 256 byte values.
    pub fn literal(&self, byte: u8) -> FragmentId {
        FragmentId(byte as u32)
    }

    /// The handles of the built-in literals for each byte of `bytes`.
    pub fn bytes_of(&self, bytes: impl AsRef<[u8]>) -> Vec<FragmentId> {
        bytes.as_ref().iter().map(|&b| self.literal(b)).collect()
    }

    /// The handles of the built-in literals for every byte *not* in `bytes`.
    pub fn bytes_not_of(&self, bytes: impl AsRef<[u8]>) -> Vec<FragmentId> {
        let mut excluded = [false; 256];
        for &b in bytes.as_ref() {
            excluded[b as usize] = true;
        }
        (0..=u8::MAX)
            .filter(|&b| !excluded[b as usize])
            .map(|b| self.literal(b))
            .collect()
    }

    /// Create a fragment under `key`.
    ///
    /// Returns an error if the key is already taken or the fragment is
    /// rejected (out-of-range child handle, empty alternative, inverted
    /// repetition range).
    pub fn emplace(&mut self, key: impl Into<K>, fragment: Fragment) -> Result<FragmentId> {
        self.check(&fragment)?;
        let id = self.reserve(key)?;
        self.set(id, fragment);
        Ok(id)
    }

    /// Reserve `key` and return its handle without defining the fragment.
    ///
    /// Together with [`define`][Catalogue::define] this allows cyclic
    /// grammars to be declared by handle before every definition exists. A
    /// reserved key that is never defined fails every match it appears in.
    pub fn reserve(&mut self, key: impl Into<K>) -> Result<FragmentId> {
        let key = key.into();
        if self.names.contains_key(&key) {
            return Err(Error::duplicate_key(format!(
                "key {key:?} is already present"
            )));
        }
        let id = FragmentId(self.fragments.len() as u32);
        self.fragments.push(Fragment::undefined());
        self.names.insert(key, id);
        Ok(id)
    }

    /// Define (or redefine) the fragment behind a reserved handle.
    ///
    /// Built-in literals cannot be redefined. Redefining a fragment after a
    /// match has been run against the catalogue is not supported.
    pub fn define(&mut self, id: FragmentId, fragment: Fragment) -> Result<()> {
        if id.index() < BUILT_INS {
            return Err(Error::invalid("built-in literals cannot be redefined"));
        }
        if id.index() >= self.fragments.len() {
            return Err(Error::invalid(
                "handle does not belong to this catalogue",
            ));
        }
        self.check(&fragment)?;
        self.set(id, fragment);
        Ok(())
    }

    /// Lookup a fragment handle by key.
    pub fn lookup<Q>(&self, key: &Q) -> Option<FragmentId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.names.get(key).copied()
    }

    /// Returns the fragment behind a handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this catalogue.
    pub fn fragment(&self, id: FragmentId) -> &Fragment {
        &self.fragments[id.index()]
    }

    /// Recompute the first-byte tables of every alternative.
    ///
    /// The table covering an alternative's leading run of literal children
    /// is computed when the alternative is defined; children defined later
    /// (through [`define`][Catalogue::define]) are not covered until this is
    /// called. The table only accelerates matching, it never changes the
    /// result.
    pub fn reindex(&mut self) {
        for i in 0..self.fragments.len() {
            let children = match self.fragments[i].kind() {
                Kind::Alternative(alt) => alt.children.clone(),
                _ => continue,
            };
            let (prefix, table) = first_byte_table(&self.fragments, &children);
            if let Kind::Alternative(alt) = self.fragments[i].kind_mut() {
                alt.prefix = prefix;
                alt.table = table;
            }
        }
    }

    /// Matches the fragment under `key` against the start of `input`.
    ///
    /// Returns the match tree for the prefix the fragment matched, or `None`
    /// if the key is unknown, the fragment fails, or a limit was exhausted
    /// (see [`set_max_depth`][Catalogue::set_max_depth] and
    /// [`set_max_steps`][Catalogue::set_max_steps]).
    pub fn match_prefix<Q>(&self, key: &Q, input: impl AsRef<[u8]>) -> Option<Match>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.match_prefix_with(key, input, self.max_depth, self.max_steps)
    }

    /// Matches like [`match_prefix`][Catalogue::match_prefix] with explicit
    /// limits for this call only.
    pub fn match_prefix_with<Q>(
        &self,
        key: &Q,
        input: impl AsRef<[u8]>,
        max_depth: usize,
        max_steps: u64,
    ) -> Option<Match>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let root = self.lookup(key)?;
        machine::run(&self.fragments, root, input.as_ref(), max_depth, max_steps)
    }

    /// Validates a fragment against the current catalogue contents.
    fn check(&self, fragment: &Fragment) -> Result<()> {
        for &child in fragment.children() {
            if child.index() >= self.fragments.len() {
                return Err(Error::invalid(format!(
                    "child handle {child:?} does not belong to this catalogue"
                )));
            }
        }
        match fragment.kind() {
            Kind::Repeat { count, .. } if count.min > count.max => {
                Err(Error::invalid(format!(
                    "repetition range {count:?} has min greater than max"
                )))
            }
            Kind::Alternative(alt) if alt.children.is_empty() => {
                Err(Error::invalid("alternative must have at least one child"))
            }
            _ => Ok(()),
        }
    }

    /// Stores a checked fragment, computing the first-byte table for
    /// alternatives.
    fn set(&mut self, id: FragmentId, mut fragment: Fragment) {
        if let Kind::Alternative(alt) = fragment.kind_mut() {
            let (prefix, table) = first_byte_table(&self.fragments, &alt.children);
            alt.prefix = prefix;
            alt.table = table;
        }
        self.fragments[id.index()] = fragment;
    }
}

/// Computes the length of the leading run of literal children and the table
/// mapping each byte to the first child of that run matching it.
fn first_byte_table(
    fragments: &[Fragment],
    children: &[FragmentId],
) -> (usize, Box<[Option<FragmentId>; 256]>) {
    let mut table = Box::new([None; 256]);
    let mut prefix = 0;
    for &child in children {
        let Some(byte) = fragments[child.index()].as_literal() else {
            break;
        };
        let slot = &mut table[byte as usize];
        if slot.is_none() {
            *slot = Some(child);
        }
        prefix += 1;
    }
    (prefix, table)
}

impl<K: Ord + fmt::Debug> fmt::Debug for Catalogue<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalogue")
            .field("fragments", &self.fragments.len())
            .field("names", &self.names)
            .field("max_depth", &self.max_depth)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}
