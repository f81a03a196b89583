//! Programmatic grammar construction.
//!
//! The [`Builder`] assembles a [`Catalogue`] from named parts that refer to
//! each other (and themselves) by key, in any order. References are resolved
//! when the builder is finalised, so cyclic grammars need no special
//! treatment.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::types::fragment::{Fragment, FragmentId, RepeatCount};
use crate::{Catalogue, Error};

/// Assembles a [`Catalogue`] from parts connected by key.
///
/// Every part is reached through [`entry`][Builder::entry] and given one
/// shape: a literal, a repeat, a sequence or an alternative. A reference to
/// a key with no part of its own falls back to the built-in byte literal
/// when the key is a single byte; otherwise finalisation reports a
/// diagnostic and any fragment depending on the reference fails to match.
///
/// # Examples
///
/// ```
/// use fragma::{Builder, RepeatCount};
///
/// let mut builder = Builder::new();
/// builder.entry("word").one_of("ab");
/// builder.entry("words").repeat("word", RepeatCount::REPEATED);
///
/// let (catalogue, diagnostics) = builder.finalize();
/// assert!(diagnostics.is_empty());
///
/// let m = catalogue.match_prefix("words", "abba!").unwrap();
/// assert_eq!(m.span(), (0..4).into());
/// ```
#[derive(Default)]
pub struct Builder {
    parts: BTreeMap<String, Part>,
}

/// A single keyed slot in a [`Builder`].
///
/// A part starts shapeless and is given a shape by the first method called
/// on it; [`then`][Part::then] and [`or`][Part::or] may be chained to grow a
/// sequence or alternative.
///
/// # Panics
///
/// Mixing shapes on one part (for example [`or`][Part::or] after
/// [`then`][Part::then]) is a programming error and panics.
pub struct Part {
    key: String,
    mode: Mode,
    refs: Vec<Ref>,
    count: RepeatCount,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Unset,
    Literal,
    Sequence,
    Alternative,
    Repeat,
}

/// A reference to another part by key, or directly to a built-in literal.
enum Ref {
    Key(String),
    Byte(u8),
}

impl Builder {
    /// Construct a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the part stored under `key`, creating it if necessary.
    pub fn entry(&mut self, key: impl Into<String>) -> &mut Part {
        let key = key.into();
        self.parts.entry(key.clone()).or_insert_with(|| Part {
            key,
            mode: Mode::Unset,
            refs: Vec::new(),
            count: RepeatCount::OPTIONAL,
        })
    }

    /// Returns `true` if a part is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.parts.contains_key(key)
    }

    /// Resolve every reference and build the catalogue.
    ///
    /// Finalisation is best-effort: problems are returned as diagnostics
    /// rather than aborting, and the affected fragments are left undefined
    /// so that matches depending on them fail instead of crashing.
    pub fn finalize(self) -> (Catalogue<String>, Vec<Error>) {
        let mut catalogue = Catalogue::new();
        let mut diagnostics = Vec::new();

        // Reserve every key up front so that parts can refer to each other
        // in any order, including cyclically.
        let mut ids = BTreeMap::new();
        for key in self.parts.keys() {
            match catalogue.reserve(key.clone()) {
                Ok(id) => {
                    ids.insert(key.clone(), id);
                }
                Err(err) => diagnostics.push(err),
            }
        }

        for (key, part) in &self.parts {
            let Some(&id) = ids.get(key) else { continue };
            let fragment = match part.mode {
                Mode::Unset => {
                    diagnostics.push(Error::invalid(format!(
                        "fragment `{key}` was never given a shape"
                    )));
                    continue;
                }
                Mode::Literal | Mode::Sequence => Fragment::sequence(
                    part.refs
                        .iter()
                        .map(|r| resolve(&mut catalogue, &mut ids, &mut diagnostics, key, r))
                        .collect::<Vec<_>>(),
                ),
                Mode::Alternative => Fragment::alternative(
                    part.refs
                        .iter()
                        .map(|r| resolve(&mut catalogue, &mut ids, &mut diagnostics, key, r))
                        .collect::<Vec<_>>(),
                ),
                Mode::Repeat => {
                    let base =
                        resolve(&mut catalogue, &mut ids, &mut diagnostics, key, &part.refs[0]);
                    Fragment::repeat(base, part.count)
                }
            };
            if let Err(err) = catalogue.define(id, fragment) {
                diagnostics.push(err);
            }
        }

        // Alternatives may have been defined before their literal children;
        // rebuild the first-byte tables now that everything is in place.
        catalogue.reindex();

        debug!(
            "finalised catalogue with {} parts and {} diagnostics",
            self.parts.len(),
            diagnostics.len()
        );

        (catalogue, diagnostics)
    }
}

/// Resolves one reference against the reserved keys, falling back to the
/// built-in literal for unknown single-byte keys.
fn resolve(
    catalogue: &mut Catalogue<String>,
    ids: &mut BTreeMap<String, FragmentId>,
    diagnostics: &mut Vec<Error>,
    owner: &str,
    re: &Ref,
) -> FragmentId {
    let key = match re {
        Ref::Byte(byte) => return catalogue.literal(*byte),
        Ref::Key(key) => key,
    };
    if let Some(&id) = ids.get(key) {
        return id;
    }
    if let &[byte] = key.as_bytes() {
        return catalogue.literal(byte);
    }

    // Unknown multi-byte key: reserve an undefined placeholder so that the
    // dependant resolves to something, and report it.
    warn!("unresolved reference `{key}` in fragment `{owner}`");
    diagnostics.push(Error::unresolved(format!(
        "`{key}` referenced by `{owner}` is not a known fragment"
    )));
    let id = catalogue
        .reserve(key.clone())
        .expect("unresolved keys are new to the catalogue");
    ids.insert(key.clone(), id);
    id
}

impl Part {
    /// Shape this part as the literal text `text`: a sequence of one
    /// built-in literal per byte. Empty text matches the empty prefix.
    pub fn literal(&mut self, text: impl AsRef<[u8]>) {
        self.shape(Mode::Literal);
        self.refs
            .extend(text.as_ref().iter().map(|&b| Ref::Byte(b)));
    }

    /// Shape this part as a repeat of the part under `base`.
    pub fn repeat(&mut self, base: impl Into<String>, count: RepeatCount) {
        self.shape(Mode::Repeat);
        self.refs.push(Ref::Key(base.into()));
        self.count = count;
    }

    /// Shape this part as a sequence and append the part under `key`.
    pub fn then(&mut self, key: impl Into<String>) -> &mut Self {
        self.shape(Mode::Sequence);
        self.refs.push(Ref::Key(key.into()));
        self
    }

    /// Shape this part as a sequence and append each key in order.
    pub fn then_all<I>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        for key in keys {
            self.then(key);
        }
        self
    }

    /// Shape this part as an alternative and append the part under `key`.
    pub fn or(&mut self, key: impl Into<String>) -> &mut Self {
        self.shape(Mode::Alternative);
        self.refs.push(Ref::Key(key.into()));
        self
    }

    /// Shape this part as an alternative and append each key in order.
    pub fn or_all<I>(&mut self, keys: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        for key in keys {
            self.or(key);
        }
        self
    }

    /// Shape this part as an alternative over the built-in literals for the
    /// bytes of `bytes`, in order.
    pub fn one_of(&mut self, bytes: impl AsRef<[u8]>) {
        self.shape(Mode::Alternative);
        self.refs
            .extend(bytes.as_ref().iter().map(|&b| Ref::Byte(b)));
    }

    /// Shape this part as an alternative over the built-in literals for
    /// every byte *not* in `bytes`.
    pub fn not_of(&mut self, bytes: impl AsRef<[u8]>) {
        self.shape(Mode::Alternative);
        let mut excluded = [false; 256];
        for &b in bytes.as_ref() {
            excluded[b as usize] = true;
        }
        self.refs
            .extend((0..=u8::MAX).filter(|&b| !excluded[b as usize]).map(Ref::Byte));
    }

    fn shape(&mut self, mode: Mode) {
        let compatible = match mode {
            Mode::Literal | Mode::Repeat => self.mode == Mode::Unset,
            Mode::Sequence | Mode::Alternative => {
                self.mode == Mode::Unset || self.mode == mode
            }
            Mode::Unset => unreachable!(),
        };
        assert!(
            compatible,
            "fragment `{}` already has an incompatible shape",
            self.key
        );
        self.mode = mode;
    }
}
