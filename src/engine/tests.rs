use super::*;
use crate::{CaptureSource, Category, KnowledgeBase, MatchError};

fn knowledge(categories: &[(&str, &str)]) -> KnowledgeBase {
    let mut kb = KnowledgeBase::new();
    for (pattern, template) in categories {
        kb.add_category(Category::new(*pattern, *template)).unwrap();
    }
    kb
}

fn find(kb: &KnowledgeBase, input: &str) -> Result<MatchResult, MatchError> {
    PatternMatcher::new(kb).find(&MatchQuery::new(input))
}

#[test]
fn star_captures_rest_of_input() {
    let kb = knowledge(&[("HELLO *", "hi")]);
    let result = find(&kb, "HELLO WORLD").unwrap();
    assert_eq!(result.wildcards.star(1), Some("WORLD"));
    assert_eq!(result.category.pattern, "HELLO *");
}

#[test]
fn underscore_requires_exactly_one_word() {
    let kb = knowledge(&[("HELLO _", "hi")]);
    assert!(matches!(find(&kb, "HELLO"), Err(MatchError::NoMatch { .. })));
    assert_eq!(find(&kb, "HELLO FOO").unwrap().wildcards.star(1), Some("FOO"));
    assert!(find(&kb, "HELLO FOO BAR").is_err());
}

#[test]
fn dollar_pattern_wins_regardless_of_order() {
    for order in [[("$HELLO", "exact"), ("HELLO *", "star")], [("HELLO *", "star"), ("$HELLO", "exact")]] {
        let kb = knowledge(&order);
        let result = find(&kb, "hello").unwrap();
        assert_eq!(result.category.template, "exact");
        assert_eq!(result.metrics.strategy, MatchStrategy::Exact);
        assert!(result.wildcards.is_empty());
    }
}

#[test]
fn band_order_decides_between_wildcard_kinds() {
    let kb = knowledge(&[("HELLO *", "star"), ("HELLO ^", "caret"), ("HELLO _", "underscore"), ("HELLO #", "hash")]);
    assert_eq!(find(&kb, "HELLO THERE").unwrap().category.template, "hash");

    let kb = knowledge(&[("HELLO *", "star"), ("HELLO ^", "caret"), ("HELLO _", "underscore")]);
    assert_eq!(find(&kb, "HELLO THERE").unwrap().category.template, "underscore");

    let kb = knowledge(&[("HELLO *", "star"), ("HELLO ^", "caret")]);
    assert_eq!(find(&kb, "HELLO THERE").unwrap().category.template, "caret");
}

#[test]
fn exact_literal_is_found_through_the_index() {
    let kb = knowledge(&[("* THERE", "star"), ("HELLO THERE", "exact")]);
    let result = find(&kb, "Hello, there!").unwrap();
    assert_eq!(result.category.template, "exact");
    assert_eq!(result.metrics.strategy, MatchStrategy::Indexed);
}

#[test]
fn equal_scores_prefer_declaration_order() {
    let kb = knowledge(&[("* B", "first"), ("A *", "second")]);
    let result = find(&kb, "A B").unwrap();
    assert_eq!(result.category.template, "second", "trailing wildcard scores higher");

    let kb = knowledge(&[("A * C", "first"), ("A B *", "second"), ("A * *", "third")]);
    let result = find(&kb, "A B C").unwrap();
    assert_eq!(result.category.template, "second");

    let kb = knowledge(&[("X * Y", "first"), ("X * Y", "dupe")]);
    assert_eq!(kb.len(), 1, "same key replaces");

    let mut kb = KnowledgeBase::new();
    kb.add_category(Category::new("_ LIKE *", "first")).unwrap();
    kb.add_category(Category::new("_ LOVE *", "other")).unwrap();
    kb.add_category(Category::new("I _ *", "second")).unwrap();
    let result = find(&kb, "I LIKE CATS").unwrap();
    // Both have one `_` and one trailing `*`.
    assert_eq!(result.category.template, "first");
    assert_eq!(result.metrics.ranked.len(), 2);
    assert_eq!(result.metrics.ranked[0].score, result.metrics.ranked[1].score);
}

#[test]
fn capture_count_equals_wildcard_count() {
    let kb = knowledge(&[("* SAID _ TO * ABOUT ^", "x")]);
    let result = find(&kb, "alice said hi to bob about nothing at all").unwrap();
    assert_eq!(result.wildcards.count(CaptureSource::Input), 4);
    assert_eq!(result.wildcards.star(1), Some("alice"));
    assert_eq!(result.wildcards.star(2), Some("hi"));
    assert_eq!(result.wildcards.star(3), Some("bob"));
    assert_eq!(result.wildcards.star(4), Some("nothing at all"));
}

#[test]
fn zero_width_wildcard_captures_empty_text() {
    let kb = knowledge(&[("HELLO ^", "x")]);
    let result = find(&kb, "hello").unwrap();
    assert_eq!(result.wildcards.count(CaptureSource::Input), 1);
    assert_eq!(result.wildcards.star(1), Some(""));
}

#[test]
fn captures_keep_original_casing() {
    let kb = knowledge(&[("MY NAME IS *", "x")]);
    let result = find(&kb, "my name is Alice McDonald!").unwrap();
    assert_eq!(result.wildcards.star(1), Some("Alice McDonald"));
}

#[test]
fn that_clause_with_index_one_checks_only_previous_utterance() {
    let mut kb = KnowledgeBase::new();
    kb.add_category(Category::new("YES", "generic")).unwrap();
    kb.add_category(Category::new("YES", "cats").with_that("DO YOU LIKE CATS").with_that_index(1)).unwrap();

    let recent = vec!["Hello".to_string(), "Do you like cats?".to_string()];
    let result = PatternMatcher::new(&kb).find(&MatchQuery::new("yes").with_that_history(&recent)).unwrap();
    assert_eq!(result.category.template, "cats");
    assert_eq!(result.that_used.as_deref(), Some("Do you like cats?"));

    let two_back = vec!["Do you like cats?".to_string(), "Nice weather".to_string()];
    let result = PatternMatcher::new(&kb).find(&MatchQuery::new("yes").with_that_history(&two_back)).unwrap();
    assert_eq!(result.category.template, "generic");
}

#[test]
fn explicit_that_index_targets_exact_distance() {
    let mut kb = KnowledgeBase::new();
    kb.add_category(Category::new("*", "fallback")).unwrap();
    kb.add_category(Category::new("YES", "two back").with_that("DO YOU LIKE CATS").with_that_index(2)).unwrap();

    let history = vec!["Do you like cats?".to_string(), "Nice weather".to_string()];
    let result = PatternMatcher::new(&kb).find(&MatchQuery::new("yes").with_that_history(&history)).unwrap();
    assert_eq!(result.category.template, "two back");

    let history = vec!["Do you like cats?".to_string()];
    let result = PatternMatcher::new(&kb).find(&MatchQuery::new("yes").with_that_history(&history)).unwrap();
    assert_eq!(result.category.template, "fallback");
}

#[test]
fn query_that_index_redirects_default_clauses() {
    let mut kb = KnowledgeBase::new();
    kb.add_category(Category::new("*", "fallback")).unwrap();
    kb.add_category(Category::new("YES", "cats").with_that("DO YOU LIKE CATS")).unwrap();

    let history = vec!["Do you like cats?".to_string(), "Nice weather".to_string()];
    let matcher = PatternMatcher::new(&kb);
    assert_eq!(matcher.find(&MatchQuery::new("yes").with_that_history(&history)).unwrap().category.template, "fallback");
    let pinned = MatchQuery::new("yes").with_that_history(&history).with_that_index(2);
    assert_eq!(matcher.find(&pinned).unwrap().category.template, "cats");
}

#[test]
fn that_wildcards_take_precedence_in_merge() {
    let mut kb = KnowledgeBase::new();
    kb.add_category(Category::new("*", "x").with_that("WHAT IS YOUR *").with_topic("_")).unwrap();

    let history = vec!["What is your Name?".to_string()];
    let query = MatchQuery::new("Bob").with_that_history(&history).with_topic("Intro");
    let result = PatternMatcher::new(&kb).find(&query).unwrap();
    assert_eq!(result.wildcards.star(1), Some("Bob"));
    assert_eq!(result.wildcards.capture(CaptureSource::That, 1), Some("Name"));
    assert_eq!(result.wildcards.capture(CaptureSource::Topic, 1), Some("Intro"));
}

#[test]
fn topic_placeholder_in_clauses_captures_one_word() {
    let mut kb = KnowledgeBase::new();
    kb.add_category(Category::new("ME TOO", "likes").with_that("I LIKE <topic/>").with_topic("<topic/> TALK")).unwrap();
    let matcher = PatternMatcher::new(&kb);

    let history = vec!["I like cats.".to_string()];
    let query = MatchQuery::new("me too").with_that_history(&history).with_topic("small talk");
    let result = matcher.find(&query).unwrap();
    assert_eq!(result.category.template, "likes");
    assert_eq!(result.wildcards.capture(CaptureSource::That, 1), Some("cats"));
    assert_eq!(result.wildcards.capture(CaptureSource::Topic, 1), Some("small"));

    let wordy = vec!["I like big cats".to_string()];
    let query = MatchQuery::new("me too").with_that_history(&wordy).with_topic("small talk");
    assert!(matcher.find(&query).is_err());
}

#[test]
fn unrelated_history_does_not_change_the_winner() {
    let kb = knowledge(&[("HELLO", "exact"), ("HELLO #", "hash"), ("WEATHER", "w")]);
    let matcher = PatternMatcher::new(&kb);

    let fresh = matcher.find(&MatchQuery::new("hello")).unwrap();
    let history = vec!["It looks like rain today".to_string()];
    let later = matcher.find(&MatchQuery::new("hello").with_that_history(&history)).unwrap();

    assert_eq!(fresh.category.template, "hash");
    assert_eq!(later.category.template, fresh.category.template);
    assert_eq!(later.metrics.strategy, MatchStrategy::Scan);
}

#[test]
fn topic_clause_must_match_current_topic() {
    let mut kb = KnowledgeBase::new();
    kb.add_category(Category::new("TELL ME MORE", "generic")).unwrap();
    kb.add_category(Category::new("TELL ME MORE", "pets").with_topic("PETS")).unwrap();
    kb.add_category(Category::new("TELL ME *", "wild topic").with_topic("* FOOD")).unwrap();
    let matcher = PatternMatcher::new(&kb);

    assert_eq!(matcher.find(&MatchQuery::new("tell me more")).unwrap().category.template, "generic");
    assert_eq!(matcher.find(&MatchQuery::new("tell me more").with_topic("pets")).unwrap().category.template, "pets");
    let result = matcher.find(&MatchQuery::new("tell me more").with_topic("Italian food")).unwrap();
    assert_eq!(result.category.template, "wild topic");
    assert_eq!(result.wildcards.capture(CaptureSource::Topic, 1), Some("Italian"));
}

#[test]
fn set_alternation_matches_members_case_insensitively() {
    let mut kb = KnowledgeBase::new();
    kb.add_set("color", ["red", "dark blue"]);
    kb.add_category(Category::new("I LIKE <set>color</set>", "color")).unwrap();
    kb.add_category(Category::new("I LIKE *", "other")).unwrap();

    let result = find(&kb, "I like Dark Blue").unwrap();
    assert_eq!(result.category.template, "color");
    assert_eq!(result.wildcards.star(1), Some("Dark Blue"));
    assert_eq!(find(&kb, "i like green").unwrap().category.template, "other");

    // Sets are read at match time.
    kb.set_insert("color", "green");
    assert_eq!(find(&kb, "i like green").unwrap().category.template, "color");
}

#[test]
fn empty_set_matches_nothing() {
    let mut kb = KnowledgeBase::new();
    kb.add_category(Category::new("I LIKE <set>nothing</set>", "x")).unwrap();
    assert!(find(&kb, "I LIKE ANYTHING").is_err());
}

#[test]
fn topic_placeholder_in_pattern_is_single_word() {
    let kb = knowledge(&[("LETS TALK ABOUT <topic/>", "ok")]);
    assert_eq!(find(&kb, "lets talk about cars").unwrap().wildcards.star(1), Some("cars"));
    assert!(find(&kb, "lets talk about fast cars").is_err());
}

#[test]
fn default_category_catches_everything_else() {
    let kb = knowledge(&[("HELLO", "hi"), ("DEFAULT", "fallback")]);
    let result = find(&kb, "something Else").unwrap();
    assert_eq!(result.category.template, "fallback");
    assert_eq!(result.metrics.strategy, MatchStrategy::Default);
    assert_eq!(result.wildcards.star(1), Some("something Else"));
}

#[test]
fn no_match_is_a_typed_failure() {
    let kb = knowledge(&[("HELLO", "hi")]);
    assert_eq!(find(&kb, "goodbye").unwrap_err(), MatchError::NoMatch { input: "goodbye".into() });
    assert!(find(&KnowledgeBase::new(), "").is_err());
}

#[test]
fn trigger_gate_skips_categories_missing_literals() {
    let kb = knowledge(&[("APPLES *", "a"), ("BANANAS *", "b"), ("* CHERRIES", "c")]);
    let result = find(&kb, "bananas are yellow").unwrap();
    assert_eq!(result.category.template, "b");
    assert_eq!(result.metrics.gated, 2);
    assert_eq!(result.metrics.considered, 1);
}

#[test]
fn matching_still_works_after_many_appends() {
    let mut kb = KnowledgeBase::new();
    let first = kb.add_category(Category::new("FIRST *", "first")).unwrap();
    for i in 0..300 {
        kb.add_category(Category::new(format!("FILLER {i} *"), "filler")).unwrap();
    }
    let result = find(&kb, "first thing").unwrap();
    assert_eq!(result.id, first);
    assert!(kb.index_is_consistent());
}
