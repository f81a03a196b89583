use fragma::{Catalogue, Fragment, RepeatCount, SearchMode};

/// A two-level grammar: `aaaa` is two `aa`, each of which is two `a`.
fn layered() -> (Catalogue, fragma::FragmentId, fragma::FragmentId) {
    let mut cat: Catalogue = Catalogue::new();
    let a = cat.emplace("a", Fragment::literal(b'a')).unwrap();
    let aa = cat.emplace("aa", Fragment::sequence([a, a])).unwrap();
    cat.emplace("aaaa", Fragment::sequence([aa, aa])).unwrap();
    (cat, a, aa)
}

/// A recursive grammar of nested brackets.
fn brackets() -> (Catalogue, fragma::FragmentId) {
    let mut cat: Catalogue = Catalogue::new();
    let nest = cat.reserve("nest").unwrap();
    let inner = cat
        .emplace("inner", Fragment::repeat(nest, RepeatCount::OPTIONAL))
        .unwrap();
    let open = cat.literal(b'[');
    let close = cat.literal(b']');
    cat.define(nest, Fragment::sequence([open, inner, close]))
        .unwrap();
    (cat, nest)
}

#[test]
fn find_returns_the_first_descendant_depth_first() {
    let (cat, a, aa) = layered();
    let m = cat.match_prefix("aaaa", "aaaa").unwrap();

    assert_eq!(m.find(aa).unwrap().span(), (0..2).into());
    assert_eq!(m.find(a).unwrap().span(), (0..1).into());
}

#[test]
fn find_never_returns_the_node_itself() {
    let (cat, _, _) = layered();
    let m = cat.match_prefix("aaaa", "aaaa").unwrap();

    assert!(m.find(m.fragment()).is_none());
}

#[test]
fn find_is_absent_for_fragments_not_in_the_tree() {
    let (cat, _, _) = layered();
    let m = cat.match_prefix("aaaa", "aaaa").unwrap();

    assert!(m.find(cat.literal(b'z')).is_none());
}

#[test]
fn top_level_search_visits_direct_children_only() {
    let (cat, a, aa) = layered();
    let m = cat.match_prefix("aaaa", "aaaa").unwrap();

    assert_eq!(m.search_for(aa, SearchMode::TopLevelOnly).count(), 2);
    assert_eq!(m.search_for(a, SearchMode::TopLevelOnly).count(), 0);
}

#[test]
fn exhaustive_search_yields_in_input_order() {
    let (cat, a, _) = layered();
    let m = cat.match_prefix("aaaa", "aaaa").unwrap();

    let spans: Vec<_> = m.search_for(a, SearchMode::All).map(|s| s.span()).collect();
    let expected: Vec<fragma::Span> = vec![
        (0..1).into(),
        (1..2).into(),
        (2..3).into(),
        (3..4).into(),
    ];
    assert_eq!(spans, expected);
}

#[test]
fn recursive_search_does_not_descend_into_hits() {
    let (cat, nest) = brackets();
    let m = cat.match_prefix("nest", "[[[]]]").unwrap();

    let hits: Vec<_> = m.search_for(nest, SearchMode::Recursive).collect();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].span(), (1..5).into());

    let all: Vec<_> = m.search_for(nest, SearchMode::All).collect();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].span(), (2..4).into());
}

#[test]
fn search_is_lazy() {
    let (cat, a, _) = layered();
    let m = cat.match_prefix("aaaa", "aaaa").unwrap();

    let first = m.search_for(a, SearchMode::All).next().unwrap();
    assert_eq!(first.span(), (0..1).into());
}
