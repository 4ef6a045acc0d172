//! Pattern compilation.
//!
//! This is the *static* side of matching: every category added to the
//! knowledge base is compiled once into a [`CompiledCategory`] holding the
//! token list, the wildcard mask, the literal words used for trigger gating
//! and, where possible, a prebuilt regex.
//!
//! ## Pattern grammar
//!
//! ```text
//! HELLO *                   `*` `^` `#`  zero or more words
//! HELLO _                   `_`          exactly one word
//! $HELLO THERE              `$` prefix   whole pattern is an exact, top-priority literal
//! I LIKE <set>color</set>   set member   (alternation over the set, matched case-insensitively)
//! TALK ABOUT <topic/>       topic slot   (single-word wildcard)
//! I AM <bot name="name"/>   property     (expanded to literal words at compile time)
//! ```
//!
//! ## Regex form
//!
//! The subject is the normalized text with one leading space per word, so
//! each token compiles to a self-contained piece:
//!
//! ```text
//! word      -> " WORD"            (escaped)
//! _, topic  -> " (\S+)"
//! * ^ #     -> "((?: \S+)*?)"     (lazy: earlier wildcards take as little as possible)
//! set       -> " (A|B C)"          (members escaped, longest first)
//! ```
//!
//! `|` is the only metacharacter left unescaped, and only inside a set
//! alternation.
//!
//! ## Invariants
//!
//! - `CompiledCategory`s live in the knowledge base aligned with the category
//!   arena: index `i` of both vectors belongs to `CategoryId(i)`.
//! - A pattern holds at most `MAX_CAPTURES` capturing tokens.
//! - Patterns that reference a set compile their regex at match time because
//!   sets can change while the bot runs.

use super::priority::{WildcardMask, category_score};
use crate::error::PatternError;
use crate::knowledge::KnowledgeBase;
use crate::normalize::normalize;
use crate::{Category, MAX_CAPTURES, MAX_THAT_INDEX};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WildcardKind {
    Star,
    Caret,
    Hash,
    Underscore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PatternToken {
    /// Upper-cased literal word.
    Word(String),
    Wildcard(WildcardKind),
    /// Lower-cased set name.
    Set(String),
    TopicSlot,
}

impl PatternToken {
    fn captures(&self) -> bool {
        !matches!(self, PatternToken::Word(_))
    }
}

/// A pattern (or that/topic clause) ready for matching.
#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    source: String,
    tokens: Vec<PatternToken>,
    /// Body of a `$` pattern, normalized.
    exact: Option<String>,
    mask: WildcardMask,
    required_words: Vec<String>,
    regex: Option<Regex>,
}

impl CompiledPattern {
    /// Compile `pattern`, an input pattern or a that/topic clause. A `<topic>`
    /// placeholder is a single-word wildcard in either.
    pub(crate) fn compile(pattern: &str, properties: &HashMap<String, String>) -> Result<Self, PatternError> {
        let trimmed = pattern.trim();
        let (dollar, body) = match trimmed.strip_prefix('$') {
            Some(body) => (true, body),
            None => (false, trimmed),
        };

        let tokens = tokenize(body, properties);
        if tokens.is_empty() {
            return Err(PatternError::EmptyPattern);
        }

        let count = tokens.iter().filter(|t| t.captures()).count();
        if count > MAX_CAPTURES {
            return Err(PatternError::TooManyWildcards { pattern: trimmed.to_string(), count, max: MAX_CAPTURES });
        }

        let mut required_words: Vec<String> = Vec::new();
        for token in &tokens {
            if let PatternToken::Word(w) = token {
                if !required_words.contains(w) {
                    required_words.push(w.clone());
                }
            }
        }

        if dollar && count == 0 {
            let exact = required_words_in_order(&tokens);
            return Ok(CompiledPattern {
                source: trimmed.to_string(),
                tokens,
                exact: Some(exact),
                mask: WildcardMask::DOLLAR,
                required_words,
                regex: None,
            });
        }
        if dollar {
            tracing::debug!(pattern = trimmed, "ignoring `$` prefix on a pattern with wildcards");
        }

        let mut mask = WildcardMask::empty();
        for token in &tokens {
            mask |= match token {
                PatternToken::Word(_) => WildcardMask::empty(),
                PatternToken::Wildcard(WildcardKind::Star) => WildcardMask::STAR,
                PatternToken::Wildcard(WildcardKind::Caret) => WildcardMask::CARET,
                PatternToken::Wildcard(WildcardKind::Hash) => WildcardMask::HASH,
                PatternToken::Wildcard(WildcardKind::Underscore) | PatternToken::TopicSlot => {
                    WildcardMask::UNDERSCORE
                }
                PatternToken::Set(_) => WildcardMask::SET,
            };
        }

        let regex = if mask.contains(WildcardMask::SET) {
            None
        } else {
            Some(build_regex(trimmed, &tokens, |_| None)?)
        };

        Ok(CompiledPattern { source: trimmed.to_string(), tokens, exact: None, mask, required_words, regex })
    }

    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn mask(&self) -> WildcardMask {
        self.mask
    }

    pub(crate) fn exact(&self) -> Option<&str> {
        self.exact.as_deref()
    }

    pub(crate) fn required_words(&self) -> &[String] {
        &self.required_words
    }

    /// Number of capturing tokens (wildcards, sets, topic slots).
    pub(crate) fn capture_count(&self) -> usize {
        self.tokens.iter().filter(|t| t.captures()).count()
    }

    pub(crate) fn ends_with_wildcard(&self) -> bool {
        self.tokens.last().is_some_and(PatternToken::captures)
    }

    /// Match `text` (already normalized, any casing) and return the captured
    /// values in token order, or `None` when the pattern does not match.
    pub(crate) fn captures(&self, kb: &KnowledgeBase, text: &str) -> Option<Vec<String>> {
        if let Some(exact) = &self.exact {
            return (normalize(text) == *exact).then(Vec::new);
        }

        let regex: Cow<'_, Regex> = match &self.regex {
            Some(re) => Cow::Borrowed(re),
            None => match build_regex(&self.source, &self.tokens, |name| kb.set(name)) {
                Ok(re) => Cow::Owned(re),
                Err(err) => {
                    tracing::warn!(pattern = %self.source, error = %err, "skipping pattern that failed to compile");
                    return None;
                }
            },
        };

        let subject = if text.is_empty() { String::new() } else { format!(" {text}") };
        let caps = regex.captures(&subject)?;
        Some((1..caps.len()).map(|i| caps.get(i).map(|m| m.as_str().trim().to_string()).unwrap_or_default()).collect())
    }
}

fn required_words_in_order(tokens: &[PatternToken]) -> String {
    tokens
        .iter()
        .filter_map(|t| match t {
            PatternToken::Word(w) => Some(w.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a pattern into tokens, expanding embedded tags.
fn tokenize(pattern: &str, properties: &HashMap<String, String>) -> Vec<PatternToken> {
    let mut tokens = Vec::new();
    let mut rest = pattern;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        if rest.starts_with('<') {
            if let Some(caps) = regex!(r"(?i)^<set>\s*([^<]*?)\s*</set>").captures(rest) {
                tokens.push(PatternToken::Set(caps[1].to_lowercase()));
                rest = &rest[caps[0].len()..];
                continue;
            }
            if let Some(caps) = regex!(r#"(?i)^<set\s+name\s*=\s*["']([^"']*)["']\s*/>"#).captures(rest) {
                tokens.push(PatternToken::Set(caps[1].trim().to_lowercase()));
                rest = &rest[caps[0].len()..];
                continue;
            }
            if let Some(m) = regex!(r"(?is)^(?:<topic\s*/>|<topic>.*?</topic>)").find(rest) {
                tokens.push(PatternToken::TopicSlot);
                rest = &rest[m.end()..];
                continue;
            }
            if let Some(caps) = regex!(r#"(?i)^<bot\s+name\s*=\s*["']([^"']*)["']\s*/>"#).captures(rest) {
                let name = caps[1].trim().to_lowercase();
                match properties.get(&name) {
                    Some(value) => {
                        tokens.extend(normalize(value).split(' ').filter(|w| !w.is_empty()).map(|w| {
                            PatternToken::Word(w.to_string())
                        }));
                    }
                    None => tracing::debug!(property = %name, "pattern references an unset bot property"),
                }
                rest = &rest[caps[0].len()..];
                continue;
            }
        }

        let end = rest
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c.is_whitespace() || c == '<')
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let chunk = &rest[..end];
        rest = &rest[end..];

        match chunk {
            "*" => tokens.push(PatternToken::Wildcard(WildcardKind::Star)),
            "^" => tokens.push(PatternToken::Wildcard(WildcardKind::Caret)),
            "#" => tokens.push(PatternToken::Wildcard(WildcardKind::Hash)),
            "_" => tokens.push(PatternToken::Wildcard(WildcardKind::Underscore)),
            _ => {
                let words = normalize(chunk);
                tokens.extend(words.split(' ').filter(|w| !w.is_empty()).map(|w| PatternToken::Word(w.to_string())));
            }
        }
    }

    tokens
}

/// Build the anchored, case-insensitive regex for `tokens`. `set` resolves a
/// set name to its members.
fn build_regex<'s>(
    source: &str,
    tokens: &[PatternToken],
    set: impl Fn(&str) -> Option<&'s [String]>,
) -> Result<Regex, PatternError> {
    let mut re = String::from("(?i)^");

    for token in tokens {
        match token {
            PatternToken::Word(w) => {
                re.push(' ');
                re.push_str(&regex::escape(w));
            }
            PatternToken::Wildcard(WildcardKind::Underscore) | PatternToken::TopicSlot => re.push_str(r" (\S+)"),
            PatternToken::Wildcard(_) => re.push_str(r"((?: \S+)*?)"),
            PatternToken::Set(name) => {
                let mut members: Vec<String> = set(name)
                    .unwrap_or_default()
                    .iter()
                    .map(|m| normalize(m))
                    .filter(|m| !m.is_empty())
                    .map(|m| regex::escape(&m))
                    .collect();
                members.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
                members.dedup();
                if members.is_empty() {
                    // An unknown or empty set matches nothing.
                    re.push_str(r" ([^\s\S])");
                } else {
                    re.push_str(" (");
                    re.push_str(&members.join("|"));
                    re.push(')');
                }
            }
        }
    }
    re.push('$');

    Regex::new(&re).map_err(|err| PatternError::Compile { pattern: source.to_string(), message: err.to_string() })
}

// --- Categories ----------------------------------------------------------------

/// A category's pattern plus its optional that/topic clauses and static score.
#[derive(Debug, Clone)]
pub(crate) struct CompiledCategory {
    pub pattern: CompiledPattern,
    pub that: Option<CompiledPattern>,
    pub topic: Option<CompiledPattern>,
    pub that_index: usize,
    pub score: u64,
}

impl CompiledCategory {
    pub(crate) fn compile(category: &Category, properties: &HashMap<String, String>) -> Result<Self, PatternError> {
        if category.that_index > MAX_THAT_INDEX {
            return Err(PatternError::InvalidThatIndex { index: category.that_index, max: MAX_THAT_INDEX });
        }

        let pattern = CompiledPattern::compile(&category.pattern, properties)?;
        let that = compile_clause(category.that.as_deref(), properties)?;
        let topic = compile_clause(category.topic.as_deref(), properties)?;
        let score = category_score(&pattern, that.as_ref(), category.that_index, topic.as_ref());

        Ok(CompiledCategory { pattern, that, topic, that_index: category.that_index, score })
    }
}

/// A missing, empty or bare `*` clause places no constraint.
fn compile_clause(
    clause: Option<&str>,
    properties: &HashMap<String, String>,
) -> Result<Option<CompiledPattern>, PatternError> {
    match clause.map(str::trim) {
        None | Some("") | Some("*") => Ok(None),
        Some(text) => match CompiledPattern::compile(text, properties) {
            Ok(compiled) => Ok(Some(compiled)),
            Err(PatternError::EmptyPattern) => Ok(None),
            Err(err) => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(pattern: &str) -> CompiledPattern {
        CompiledPattern::compile(pattern, &HashMap::new()).unwrap()
    }

    #[test]
    fn tokens_and_mask() {
        let p = compile("Hello, * how _ ARE ^ you #");
        assert_eq!(p.capture_count(), 4);
        assert_eq!(
            p.mask(),
            WildcardMask::STAR | WildcardMask::UNDERSCORE | WildcardMask::CARET | WildcardMask::HASH
        );
        assert_eq!(p.required_words(), ["HELLO", "HOW", "ARE", "YOU"]);
        assert!(p.ends_with_wildcard());
    }

    #[test]
    fn dollar_pattern_is_exact() {
        let p = compile("$Hello there");
        assert_eq!(p.exact(), Some("HELLO THERE"));
        assert_eq!(p.mask(), WildcardMask::DOLLAR);
        assert_eq!(p.capture_count(), 0);
    }

    #[test]
    fn too_many_wildcards_is_rejected() {
        let err = CompiledPattern::compile("* * * * * * * * * *", &HashMap::new()).unwrap_err();
        assert!(matches!(err, PatternError::TooManyWildcards { count: 10, .. }));
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert_eq!(CompiledPattern::compile(" ?! ", &HashMap::new()).unwrap_err(), PatternError::EmptyPattern);
    }

    #[test]
    fn regex_metacharacters_in_literals_are_escaped() {
        let kb = KnowledgeBase::new();
        // Normalization drops most punctuation, but apostrophes survive.
        let p = compile("WHAT'S *");
        assert_eq!(p.captures(&kb, "WHAT'S UP").unwrap(), vec!["UP"]);
        assert!(p.captures(&kb, "WHATXS UP").is_none());
    }

    #[test]
    fn bot_property_expands_to_words() {
        let props = HashMap::from([("name".to_string(), "Ada Bot".to_string())]);
        let p = CompiledPattern::compile(r#"ARE YOU <bot name="name"/>"#, &props).unwrap();
        assert_eq!(p.required_words(), ["ARE", "YOU", "ADA", "BOT"]);
        assert_eq!(p.capture_count(), 0);
    }

    #[test]
    fn topic_placeholder_is_single_word_wildcard() {
        let kb = KnowledgeBase::new();
        let p = compile("TALK ABOUT <topic>x</topic>");
        assert_eq!(p.capture_count(), 1);
        assert_eq!(p.captures(&kb, "TALK ABOUT CATS").unwrap(), vec!["CATS"]);
        assert!(p.captures(&kb, "TALK ABOUT BIG CATS").is_none());

        let clause = compile("I LIKE <topic/>");
        assert_eq!(clause.capture_count(), 1);
        assert_eq!(clause.mask(), WildcardMask::UNDERSCORE);
        assert_eq!(clause.captures(&kb, "I LIKE CATS").unwrap(), vec!["CATS"]);
    }

    #[test]
    fn wildcards_capture_lazily() {
        let kb = KnowledgeBase::new();
        let p = compile("* AND *");
        assert_eq!(p.captures(&kb, "A AND B AND C").unwrap(), vec!["A", "B AND C"]);
        let p = compile("*");
        assert_eq!(p.captures(&kb, "").unwrap(), vec![""]);
    }

    #[test]
    fn clause_star_is_unconstrained() {
        let cat = Category::new("HI", "x").with_topic("*").with_that("");
        let compiled = CompiledCategory::compile(&cat, &HashMap::new()).unwrap();
        assert!(compiled.topic.is_none());
        assert!(compiled.that.is_none());
    }

    #[test]
    fn that_index_out_of_range() {
        let cat = Category::new("HI", "x").with_that("HELLO").with_that_index(11);
        assert!(matches!(
            CompiledCategory::compile(&cat, &HashMap::new()),
            Err(PatternError::InvalidThatIndex { index: 11, .. })
        ));
    }
}
