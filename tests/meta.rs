use fragma::bnf;

#[test]
fn single_declaration() {
    let cat = bnf::compile("foo:\n  bar").unwrap();

    let m = cat.match_prefix("foo", "bar").unwrap();
    assert_eq!(m.span(), (0..3).into());
    assert!(cat.match_prefix("foo", "baz").is_none());
}

#[test]
fn undeclared_identifiers_match_their_text() {
    let cat = bnf::compile("greeting:\n  hello world\n").unwrap();

    let m = cat.match_prefix("greeting", "helloworld").unwrap();
    assert_eq!(m.span(), (0..10).into());
    assert!(cat.match_prefix("greeting", "hello").is_none());
}

#[test]
fn declared_identifiers_resolve_to_their_declaration() {
    let grammar = "\
ab:
  a b
abab:
  ab ab
";
    let cat = bnf::compile(grammar).unwrap();

    let ab = cat.lookup("ab").unwrap();
    let m = cat.match_prefix("abab", "abab").unwrap();
    assert_eq!(m.span(), (0..4).into());
    assert_eq!(m.sub_matches().len(), 2);
    assert_eq!(m.sub_matches()[0].fragment(), ab);
}

#[test]
fn multiple_values_become_ordered_alternatives() {
    let cat = bnf::compile("digit:\n  0\n  1\n  2\n").unwrap();

    for (i, input) in ["0", "1", "2"].iter().enumerate() {
        let m = cat.match_prefix("digit", input).unwrap();
        assert_eq!(m.span(), (0..1).into());

        let sub = cat.lookup(format!("digit-{i}").as_str()).unwrap();
        assert_eq!(m.sub_matches()[0].fragment(), sub);
    }
    assert!(cat.match_prefix("digit", "3").is_none());
}

#[test]
fn repetition_suffixes() {
    let grammar = "\
ab:
  a b
maybe:
  ab?
many:
  ab*
some:
  ab+
";
    let cat = bnf::compile(grammar).unwrap();

    assert_eq!(cat.match_prefix("maybe", "ab").unwrap().span(), (0..2).into());
    assert_eq!(cat.match_prefix("maybe", "x").unwrap().span(), (0..0).into());

    assert_eq!(cat.match_prefix("many", "ababx").unwrap().span(), (0..4).into());
    assert_eq!(cat.match_prefix("many", "").unwrap().span(), (0..0).into());

    assert_eq!(cat.match_prefix("some", "ababab").unwrap().span(), (0..6).into());
    assert!(cat.match_prefix("some", "x").is_none());

    assert!(cat.lookup("ab-optional").is_some());
    assert!(cat.lookup("ab-any").is_some());
    assert!(cat.lookup("ab-repeated").is_some());
}

#[test]
fn synthesised_repeats_are_deduplicated() {
    let cat = bnf::compile("x:\n  a+\ny:\n  a+\n").unwrap();

    assert!(cat.lookup("a-repeated").is_some());
    assert_eq!(cat.match_prefix("x", "aa").unwrap().span(), (0..2).into());
    assert_eq!(cat.match_prefix("y", "aaa").unwrap().span(), (0..3).into());
}

#[test]
fn comments_and_blank_lines_are_ignored() {
    let grammar = "\
# a tiny grammar

foo:
  bar
  \n# trailing comment
";
    let cat = bnf::compile(grammar).unwrap();

    assert_eq!(cat.match_prefix("foo", "bar").unwrap().span(), (0..3).into());
}

#[test]
fn whitespace_around_declarations_is_flexible() {
    let cat = bnf::compile("foo :\n\tbar baz\n").unwrap();

    assert_eq!(cat.match_prefix("foo", "barbaz").unwrap().span(), (0..6).into());
}

#[test]
fn empty_document_compiles() {
    let cat = bnf::compile("").unwrap();
    assert!(cat.match_prefix("anything", "x").is_none());
}

#[test]
fn duplicate_declarations_are_rejected() {
    let err = bnf::compile("foo:\n  a\nfoo:\n  b\n").unwrap_err();
    assert!(format!("{err}").contains("duplicate declaration"));
}

#[test]
fn declaration_colliding_with_a_synthesised_key_is_rejected() {
    let err = bnf::compile("x:\n  a+\na-repeated:\n  b\n").unwrap_err();
    assert!(format!("{err}").contains("collides"));
}

#[test]
fn unparsable_document_points_at_the_error() {
    let err = bnf::compile("foo\n").unwrap_err();
    assert_eq!(
        format!("{:#}", err),
        "invalid grammar\n   |\n 1 | foo\n   | ^ expected a declaration\n"
    );
}

#[test]
fn error_location_after_valid_declarations() {
    let err = bnf::compile("a:\n  b\nc=d\n").unwrap_err();
    assert_eq!(
        format!("{:#}", err),
        "invalid grammar\n   |\n 3 | c=d\n   | ^ expected a declaration\n"
    );
}
