//! The BNF+ grammar language.
//!
//! A grammar can be written as text and compiled into a [`Catalogue`] with
//! [`compile`]. A document is a list of declarations; each declaration binds
//! an identifier to one or more values, one value per indented line, and
//! each value is a whitespace-separated list of identifiers with an optional
//! repetition suffix:
//!
//! ```text
//! # one-or-more decimal digits
//! digit:
//!   0
//!   1
//!   2
//! number:
//!   digit+
//! ```
//!
//! - A declaration with one value becomes a sequence; one with several
//!   values becomes an alternative over them, tried in order.
//! - The suffixes `?`, `*` and `+` mean zero-or-one, zero-or-more and
//!   one-or-more repetitions of the identifier they follow.
//! - An identifier that is never declared matches its own text literally,
//!   so single characters like `0` above need no declaration.
//! - `#` starts a comment running to the end of the line. Blank lines are
//!   ignored. Whitespace is spaces and tabs; value lines must be indented.
//!
//! The language is self-hosted: the parser for it is itself a catalogue of
//! fragments, assembled once with the core API.

use std::sync::OnceLock;

use crate::types::fragment::{Fragment, FragmentId, RepeatCount};
use crate::types::tree::{Match, SearchMode};
use crate::{Builder, Catalogue, Error, Result};

/// The fragments of the meta-grammar.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
enum Rule {
    Doc,
    Line,
    Decl,
    Comment,
    CommentBody,
    NonNl,
    EmptyLine,
    Values,
    ValueLine,
    Value,
    Item,
    Ident,
    IdentChar,
    Suffix,
    SuffixOpt,
    Ws,
    WsOpt,
    WsChar,
    NlOpt,
}

const IDENT_CHARS: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-";

/// The shared parser for the grammar language itself.
fn parser() -> &'static Catalogue<Rule> {
    static PARSER: OnceLock<Catalogue<Rule>> = OnceLock::new();
    PARSER.get_or_init(|| build_parser().expect("the meta-grammar is well formed"))
}

fn build_parser() -> Result<Catalogue<Rule>> {
    let mut cat = Catalogue::new();

    let nl = cat.literal(b'\n');
    let colon = cat.literal(b':');
    let hash = cat.literal(b'#');

    let ws_chars = cat.bytes_of(" \t");
    let ws_char = cat.emplace(Rule::WsChar, Fragment::alternative(ws_chars))?;
    let ws = cat.emplace(Rule::Ws, Fragment::repeat(ws_char, RepeatCount::REPEATED))?;
    let ws_opt = cat.emplace(Rule::WsOpt, Fragment::repeat(ws_char, RepeatCount::ANY))?;
    let nl_opt = cat.emplace(Rule::NlOpt, Fragment::repeat(nl, RepeatCount::OPTIONAL))?;

    let ident_chars = cat.bytes_of(IDENT_CHARS);
    let ident_char = cat.emplace(Rule::IdentChar, Fragment::alternative(ident_chars))?;
    let ident = cat.emplace(
        Rule::Ident,
        Fragment::repeat(ident_char, RepeatCount::REPEATED),
    )?;

    let suffixes = cat.bytes_of("?*+");
    let suffix = cat.emplace(Rule::Suffix, Fragment::alternative(suffixes))?;
    let suffix_opt = cat.emplace(
        Rule::SuffixOpt,
        Fragment::repeat(suffix, RepeatCount::OPTIONAL),
    )?;

    // A value is one or more identifiers, each preceded by whitespace. The
    // leading whitespace is required: it is what stops a value list at the
    // next declaration, which starts its identifier at column zero.
    let item = cat.emplace(Rule::Item, Fragment::sequence([ws, ident, suffix_opt]))?;
    let value = cat.emplace(Rule::Value, Fragment::repeat(item, RepeatCount::REPEATED))?;
    let value_line = cat.emplace(Rule::ValueLine, Fragment::sequence([nl, value]))?;
    let values = cat.emplace(
        Rule::Values,
        Fragment::repeat(value_line, RepeatCount::REPEATED),
    )?;

    let decl = cat.emplace(
        Rule::Decl,
        Fragment::sequence([ws_opt, ident, ws_opt, colon, values, nl_opt]),
    )?;

    let non_nl_chars = cat.bytes_not_of("\n");
    let non_nl = cat.emplace(Rule::NonNl, Fragment::alternative(non_nl_chars))?;
    let comment_body = cat.emplace(
        Rule::CommentBody,
        Fragment::repeat(non_nl, RepeatCount::ANY),
    )?;
    let comment = cat.emplace(
        Rule::Comment,
        Fragment::sequence([ws_opt, hash, comment_body, nl_opt]),
    )?;

    let empty_line = cat.emplace(Rule::EmptyLine, Fragment::sequence([ws_opt, nl]))?;

    let line = cat.emplace(
        Rule::Line,
        Fragment::alternative([decl, comment, empty_line]),
    )?;
    cat.emplace(Rule::Doc, Fragment::repeat(line, RepeatCount::ANY))?;

    Ok(cat)
}

/// Compile a textual grammar into a catalogue.
///
/// Every declared identifier becomes a fragment under its own name;
/// identifiers that are never declared match their own text literally.
/// Returns an error if the text is not a well-formed document or declares
/// the same identifier twice.
///
/// # Examples
///
/// ```
/// let catalogue = fragma::bnf::compile("foo:\n  bar")?;
///
/// let m = catalogue.match_prefix("foo", "bar").unwrap();
/// assert_eq!(m.span(), (0..3).into());
/// # Ok::<(), fragma::Error>(())
/// ```
pub fn compile(text: &str) -> Result<Catalogue<String>> {
    let parser = parser();
    let doc = parser
        .match_prefix(&Rule::Doc, text)
        .ok_or_else(|| Error::grammar("unreadable document", text, 0..0))?;
    if doc.span().end != text.len() {
        let at = doc.span().end;
        return Err(Error::grammar("expected a declaration", text, at..at));
    }
    Translator::new(parser, text).translate(&doc)
}

/// Translates a matched document into a grammar via a [`Builder`].
struct Translator<'source> {
    source: &'source str,
    builder: Builder,
    decl: FragmentId,
    values: FragmentId,
    value: FragmentId,
    ident: FragmentId,
    suffix: FragmentId,
}

impl<'source> Translator<'source> {
    fn new(parser: &Catalogue<Rule>, source: &'source str) -> Self {
        let rule = |r: Rule| parser.lookup(&r).expect("meta-grammar rule exists");
        Self {
            source,
            builder: Builder::new(),
            decl: rule(Rule::Decl),
            values: rule(Rule::Values),
            value: rule(Rule::Value),
            ident: rule(Rule::Ident),
            suffix: rule(Rule::Suffix),
        }
    }

    fn translate(mut self, doc: &Match) -> Result<Catalogue<String>> {
        // Collect the declared names first: an identifier only matches its
        // own text literally when no declaration anywhere names it.
        let mut declared = Vec::new();
        for decl in doc.search_for(self.decl, SearchMode::Recursive) {
            let name = self.name_of(decl);
            if declared.contains(&name) {
                let span = self.name_ident(decl).span();
                return Err(Error::grammar(
                    format!("duplicate declaration of `{name}`"),
                    self.source,
                    span,
                ));
            }
            declared.push(name);
        }

        for decl in doc.search_for(self.decl, SearchMode::Recursive) {
            self.translate_decl(decl, &declared)?;
        }

        let (catalogue, _diagnostics) = self.builder.finalize();
        Ok(catalogue)
    }

    fn translate_decl(&mut self, decl: &Match, declared: &[String]) -> Result<()> {
        let name = self.name_of(decl);
        if self.builder.contains(&name) {
            let span = self.name_ident(decl).span();
            return Err(Error::grammar(
                format!("`{name}` collides with a synthesised fragment"),
                self.source,
                span,
            ));
        }

        let values = decl
            .search_for(self.values, SearchMode::TopLevelOnly)
            .next()
            .expect("a declaration contains values");

        // One key list per value line.
        let mut value_keys = Vec::new();
        for line in values.sub_matches() {
            let value = line
                .search_for(self.value, SearchMode::TopLevelOnly)
                .next()
                .expect("a value line contains a value");
            let mut keys = Vec::new();
            for item in value.sub_matches() {
                keys.push(self.translate_item(item, declared));
            }
            value_keys.push(keys);
        }

        if let [keys] = &value_keys[..] {
            self.builder.entry(name.as_str()).then_all(keys.clone());
        } else {
            // Several values: an alternative over synthesised sub-keys, one
            // sequence each, tried in declaration order.
            for (i, keys) in value_keys.iter().enumerate() {
                let sub = format!("{name}-{i}");
                self.builder.entry(sub.as_str()).then_all(keys.clone());
                self.builder.entry(name.as_str()).or(sub);
            }
        }
        Ok(())
    }

    /// Resolves one value item to a key, synthesising the repeat fragment
    /// for a suffix and the literal fragment for an undeclared identifier.
    fn translate_item(&mut self, item: &Match, declared: &[String]) -> String {
        let ident = item
            .search_for(self.ident, SearchMode::TopLevelOnly)
            .next()
            .expect("an item contains an identifier");
        let base = self.source[ident.span()].to_string();

        if !declared.contains(&base) && !self.builder.contains(&base) {
            self.builder.entry(base.as_str()).literal(base.as_str());
        }

        let Some(suffix) = item.find(self.suffix) else {
            return base;
        };
        let (tag, count) = match self.source.as_bytes()[suffix.span().start] {
            b'?' => ("optional", RepeatCount::OPTIONAL),
            b'*' => ("any", RepeatCount::ANY),
            b'+' => ("repeated", RepeatCount::REPEATED),
            _ => unreachable!("suffix matches only `?`, `*` and `+`"),
        };
        let key = format!("{base}-{tag}");
        if !self.builder.contains(&key) {
            self.builder.entry(key.as_str()).repeat(base, count);
        }
        key
    }

    /// The identifier match naming a declaration.
    fn name_ident<'tree>(&self, decl: &'tree Match) -> &'tree Match {
        decl.search_for(self.ident, SearchMode::TopLevelOnly)
            .next()
            .expect("a declaration contains its name")
    }

    fn name_of(&self, decl: &Match) -> String {
        self.source[self.name_ident(decl).span()].to_string()
    }
}
