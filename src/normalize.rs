//! Input normalization and word substitution.
//!
//! Matching runs against two forms of the same text:
//!
//! - [`light_normalize`]: punctuation stripped, whitespace collapsed, case kept.
//! - [`normalize`]: the light form upper-cased. Matching is decided here.
//!
//! Both produce the same word boundaries, so a compiled pattern that matches
//! the full form can be re-run on the light form to recover captures with
//! their original casing.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Full normalization: strip punctuation, collapse whitespace, upper-case.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`. Each light-form
/// word is upper-cased and then cleaned again, since upper-casing can yield
/// combining marks (`ǰ` becomes `J` plus a caron); the word count always
/// equals the light form's.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in words(text) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&upper_word(word));
    }
    out
}

/// Case-preserving normalization: strip punctuation and collapse whitespace.
pub fn light_normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in words(text) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Key form of a pattern or that/topic clause: trimmed, whitespace collapsed,
/// upper-cased. Wildcards and embedded tags are kept.
pub fn pattern_key(pattern: &str) -> String {
    pattern.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

/// Last sentence of a bot utterance in light form. This is what "that"
/// clauses are matched against.
pub fn last_sentence(text: &str) -> String {
    text.split(['.', '!', '?'])
        .map(light_normalize)
        .filter(|s| !s.is_empty())
        .last()
        .unwrap_or_default()
}

/// Collapse runs of whitespace into single spaces and trim.
pub(crate) fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\''
}

fn upper_word(word: &str) -> String {
    let upper: String = word.to_uppercase().chars().filter(|&c| is_word_char(c)).collect();
    match upper.trim_matches('\'') {
        "" => word.to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_word_char(c)).map(|w| w.trim_matches('\'')).filter(|w| !w.is_empty())
}

// --- Substitutions -------------------------------------------------------------

/// A phrase-level substitution table (`person`, `gender`, `normal`, ...).
///
/// Keys may span several words; the longest key starting at each position
/// wins and replaced text is never re-scanned, so swaps like I↔you do not
/// undo each other.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    entries: HashMap<String, String>,
    longest: usize,
}

impl Substitutions {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut subs = Substitutions::default();
        for (from, to) in pairs {
            let key = from.as_ref().split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
            if key.is_empty() {
                continue;
            }
            subs.longest = subs.longest.max(key.split(' ').count());
            subs.entries.insert(key, to.into());
        }
        subs
    }

    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self::from_pairs(map.iter().map(|(k, v)| (k.as_str(), v.clone())))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply the table to `text`, keeping trailing punctuation and the casing
    /// style (ALL CAPS / Capitalized) of each replaced phrase.
    pub fn apply(&self, text: &str) -> String {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let mut out: Vec<String> = Vec::with_capacity(tokens.len());
        let mut i = 0;

        while i < tokens.len() {
            let max_len = self.longest.min(tokens.len() - i);
            let mut replaced = false;

            for len in (1..=max_len).rev() {
                let phrase = &tokens[i..i + len];
                let last = phrase[len - 1];
                let core_end = last.trim_end_matches(|c: char| !is_word_char(c)).len();
                let (last_core, suffix) = last.split_at(core_end);

                let mut key_words: Vec<&str> = phrase[..len - 1].to_vec();
                key_words.push(last_core);
                let key = key_words.join(" ").to_lowercase();

                if let Some(to) = self.entries.get(&key) {
                    out.push(format!("{}{}", match_case(phrase[0], to), suffix));
                    i += len;
                    replaced = true;
                    break;
                }
            }

            if !replaced {
                out.push(tokens[i].to_string());
                i += 1;
            }
        }

        out.join(" ")
    }
}

fn match_case(original: &str, replacement: &str) -> String {
    // "I" is capitalized regardless of position, so it says nothing about style.
    let core = original.trim_end_matches(|c: char| !is_word_char(c));
    if core == "I" || core.starts_with("I'") {
        return replacement.to_string();
    }
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return replacement.to_uppercase();
    }
    if letters.first().is_some_and(|c| c.is_uppercase()) {
        let mut chars = replacement.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    replacement.to_string()
}

/// First/second person swap used by `<person>`.
pub(crate) static PERSON: Lazy<Substitutions> = word_map! {
    "i" => "you",
    "me" => "you",
    "my" => "your",
    "mine" => "yours",
    "myself" => "yourself",
    "i am" => "you are",
    "i'm" => "you're",
    "i was" => "you were",
    "you" => "me",
    "your" => "my",
    "yours" => "mine",
    "yourself" => "myself",
    "you are" => "I am",
    "you're" => "I'm",
    "you were" => "I was",
};

/// First/third person swap used by `<person2>`.
pub(crate) static PERSON2: Lazy<Substitutions> = word_map! {
    "i" => "he or she",
    "me" => "him or her",
    "my" => "his or her",
    "mine" => "his or hers",
    "myself" => "himself or herself",
    "he" => "I",
    "she" => "I",
    "him" => "me",
    "her" => "me",
    "his" => "my",
    "hers" => "mine",
    "himself" => "myself",
    "herself" => "myself",
};

/// Gender swap used by `<gender>`.
pub(crate) static GENDER: Lazy<Substitutions> = word_map! {
    "he" => "she",
    "she" => "he",
    "him" => "her",
    "his" => "her",
    "her" => "his",
    "himself" => "herself",
    "herself" => "himself",
};

/// Contraction expansion used by `<normalize>`.
pub(crate) static NORMAL: Lazy<Substitutions> = word_map! {
    "what's" => "what is",
    "it's" => "it is",
    "that's" => "that is",
    "there's" => "there is",
    "i'm" => "i am",
    "you're" => "you are",
    "we're" => "we are",
    "they're" => "they are",
    "don't" => "do not",
    "doesn't" => "does not",
    "isn't" => "is not",
    "aren't" => "are not",
    "can't" => "can not",
    "won't" => "will not",
    "let's" => "let us",
    "i've" => "i have",
    "i'll" => "i will",
};

/// Contraction folding used by `<denormalize>`.
pub(crate) static DENORMAL: Lazy<Substitutions> = word_map! {
    "what is" => "what's",
    "it is" => "it's",
    "that is" => "that's",
    "there is" => "there's",
    "i am" => "I'm",
    "you are" => "you're",
    "we are" => "we're",
    "they are" => "they're",
    "do not" => "don't",
    "does not" => "doesn't",
    "is not" => "isn't",
    "are not" => "aren't",
    "can not" => "can't",
    "will not" => "won't",
    "let us" => "let's",
};
