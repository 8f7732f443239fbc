use rand::Rng;

use ekn_query::builder::{DEFAULT_CUTOFF, MATCH_SYNOPSIS_CUTOFF};
use ekn_query::terms::{split_terms, MAX_TERM_LENGTH};
use ekn_query::{FieldPrefixes, MatchMode, MatchScope, Query, QueryBuilder, SortKey, SortOrder};

const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

fn build(query: &Query) -> ekn_query::SearchRequest {
    QueryBuilder::default().build(query)
}

#[test]
fn incremental_query_adds_wildcard_variants() {
    let request = build(&Query::search("dragonba"));
    let query_string = request.query_string.expect("query string");
    assert!(query_string.contains(r#"XEXACTS"dragonba" OR XEXACTS"dragonba"*"#), "{query_string}");
    assert!(query_string.contains(r#"S"dragonba" OR S"dragonba"*"#), "{query_string}");
    assert_eq!(
        query_string,
        r#"(XEXACTS"dragonba" OR XEXACTS"dragonba"*) OR (S"dragonba" OR S"dragonba"*)"#
    );
    assert_eq!(request.cutoff, DEFAULT_CUTOFF);
    assert_eq!(request.sort_value, None);
    assert_eq!(request.filter, None);
}

#[test]
fn delimited_query_has_no_wildcards() {
    let query = Query::search("dragon ball").with_mode(MatchMode::Delimited);
    let query_string = build(&query).query_string.expect("query string");
    assert_eq!(query_string, r#"(XEXACTS"dragon_ball") OR (S"dragon" S"ball")"#);
    assert!(!query_string.contains('*'));
}

#[test]
fn only_the_last_title_position_is_partial() {
    let query_string = build(&Query::search("dragon ba")).query_string.expect("query string");
    assert_eq!(
        query_string,
        r#"(XEXACTS"dragon_ba" OR XEXACTS"dragon_ba"*) OR (S"dragon" (S"ba" OR S"ba"*))"#
    );
}

#[test]
fn corrections_are_ored_per_position() {
    let query = Query::search("dragn ball")
        .with_corrected_terms("dragon ball")
        .with_mode(MatchMode::Delimited)
        .with_match(MatchScope::TitleSynopsis);
    let request = build(&query);
    assert_eq!(
        request.query_string.as_deref(),
        Some(r#"(XEXACTS"dragn_ball") OR ((S"dragn" OR S"dragon") S"ball") OR (dragn ball) OR (dragon ball)"#)
    );
    assert_eq!(request.cutoff, MATCH_SYNOPSIS_CUTOFF);
}

#[test]
fn stopword_free_terms_leave_raw_terms_in_place() {
    let query = Query::search("the lord of the rings")
        .with_stopword_free_terms("lord rings")
        .with_mode(MatchMode::Delimited);
    assert_eq!(
        build(&query).query_string,
        build(&Query::search("the lord of the rings").with_mode(MatchMode::Delimited)).query_string
    );

    let query = Query::search("the beatles")
        .with_stopword_free_terms("beatles")
        .with_mode(MatchMode::Delimited)
        .with_match(MatchScope::TitleSynopsis);
    assert_eq!(
        build(&query).query_string.as_deref(),
        Some(r#"(XEXACTS"the_beatles") OR (S"the" S"beatles") OR (the beatles)"#)
    );
}

#[test]
fn single_character_is_an_exact_title_term_only() {
    for c in ["a", "é", "字"] {
        let query_string = build(&Query::search(c).with_match(MatchScope::TitleSynopsis))
            .query_string
            .expect("query string");
        assert_eq!(query_string, format!("XEXACTS\"{c}\""));
        assert!(!query_string.contains(" OR ") && !query_string.contains('*'));
    }
}

#[test]
fn literal_query_is_returned_verbatim() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let literal: String = (0..rng.gen_range(0..40))
            .map(|_| char::from(rng.gen_range(b' '..=b'~')))
            .collect();
        let query = Query::search("ignored text").with_literal_query(literal.clone());
        assert_eq!(build(&query).query_string, Some(literal));
    }
}

#[test]
fn syntax_is_stripped_and_operators_lowered() {
    assert_eq!(split_terms("(dragon) +ball 'z' \"AND\" OR;NEAR"), ["dragon", "ball", "z", "and", "or", "near"]);
    assert_eq!(split_terms("  \t-;  "), Vec::<String>::new());
    assert_eq!(split_terms("spider-man"), ["spiderman"]);
}

#[test]
fn long_terms_are_capped_on_char_boundaries() {
    let mut rng = rand::thread_rng();
    let alphabet = ['a', 'é', '字', '🐉'];
    for _ in 0..100 {
        let term: String = (0..rng.gen_range(1..200)).map(|_| alphabet[rng.gen_range(0..alphabet.len())]).collect();
        for chomped in split_terms(&term) {
            assert!(chomped.len() <= MAX_TERM_LENGTH);
            assert!(term.starts_with(&chomped));
            if term.len() > MAX_TERM_LENGTH {
                let next = term[chomped.len()..].chars().next().expect("truncated tail");
                assert!(chomped.len() + next.len_utf8() > MAX_TERM_LENGTH);
            }
        }
    }
}

#[test]
fn empty_text_has_no_query_string() {
    assert_eq!(build(&Query::new()).query_string, None);
    assert_eq!(build(&Query::search("  ( ) ")).query_string, None);
    assert!(Query::new().is_match_all());
    assert!(!Query::search("").is_match_all());
    assert!(!Query::search(" ").has_search_text());
}

#[test]
fn filters_group_tags_ids_and_content_type() {
    let query = Query::new()
        .with_tags_match_any(["a", "b"])
        .with_tags_match_all(["c", "d"])
        .with_ids([format!("ekn:///{HASH}")])
        .with_content_type("image");
    assert_eq!(
        build(&query).filter.as_deref(),
        Some(format!(r#"(K"a" OR K"b") AND (K"c" AND K"d") AND (Q"{HASH}") AND (T"image"*)"#).as_str())
    );
}

#[test]
fn exclusions_render_into_filter_out() {
    let query = Query::new()
        .with_excluded_tags(["spam"])
        .with_excluded_ids([format!("ekn://acme/{HASH}"), "not-an-id".to_string()]);
    let request = build(&query);
    assert_eq!(request.filter, None);
    assert_eq!(
        request.filter_out.as_deref(),
        Some(format!(r#"(K"spam") AND (Q"{HASH}" OR Q"")"#).as_str())
    );
}

#[test]
fn quotes_inside_values_are_doubled() {
    let query = Query::new().with_tags_match_any([r#"say "hi""#]);
    assert_eq!(build(&query).filter.as_deref(), Some(r#"(K"say ""hi""")"#));
}

#[test]
fn sort_keys_map_to_value_slots() {
    assert_eq!(build(&Query::new().with_sort(SortKey::SequenceNumber)).sort_value, Some(0));
    let request = build(&Query::new().with_sort(SortKey::Date).with_order(SortOrder::Descending));
    assert_eq!(request.sort_value, Some(1));
    assert_eq!(request.order, SortOrder::Descending);
}

#[test]
fn custom_prefix_table_is_honoured() {
    let prefixes = FieldPrefixes::from_json(
        r#"{"prefixes":[{"field":"title","prefix":"XT"},{"field":"exact_title","prefix":"XE"}],
            "booleanPrefixes":[{"field":"tag","prefix":"XK"}]}"#,
    )
    .expect("prefix json");
    let builder = QueryBuilder::new(prefixes);
    let request = builder.build(&Query::search("moon").with_mode(MatchMode::Delimited).with_tags_match_any(["x"]));
    assert_eq!(request.query_string.as_deref(), Some(r#"(XE"moon") OR (XT"moon")"#));
    assert_eq!(request.filter.as_deref(), Some(r#"(XK"x")"#));
}

#[test]
fn derived_queries_leave_the_original_untouched() {
    let base = Query::search("moon").with_limit(5).with_app_id("com.example.Space");
    let derived = base.clone().with_corrected_terms("mood").with_offset(5);
    assert_eq!(base.corrected_terms(), None);
    assert_eq!(base.offset(), 0);
    assert_eq!(derived.search_terms(), Some("moon"));
    assert_eq!(derived.limit(), Some(5));
    assert_eq!(derived.app_id(), Some("com.example.Space"));
}

#[test]
fn display_lists_only_non_default_fields() {
    assert_eq!(Query::new().to_string(), "Query({})");
    assert_eq!(
        Query::search("moon").with_limit(5).with_tags_match_any(["x"]).to_string(),
        r#"Query({search_terms: "moon", limit: 5, tags_match_any: ["x"]})"#
    );
}
