//! Trigger scanning (input pre-classification).
//!
//! Before any regex runs, the normalized input is split into a set of words.
//! A category whose pattern requires a literal word the input does not
//! contain cannot match, so the matcher skips it without touching its regex.
//!
//! ## Design notes
//!
//! - This is a *necessary-condition* check only. Passing the gate says nothing
//!   about word order or wildcard arity; the compiled pattern still decides.
//! - Words come from the fully normalized form, so comparison is exact
//!   (already upper-cased, punctuation stripped).
//! - Set members and `<bot>` expansions are not gated on: a set contributes no
//!   required words, and property words are ordinary literals after compile.

use std::collections::HashSet;

/// Words present in one normalized input.
#[derive(Debug, Clone, Default)]
pub struct InputTrigger {
    pub words: HashSet<String>,
}

impl InputTrigger {
    /// Scan a normalized input.
    pub fn scan(normalized: &str) -> Self {
        InputTrigger { words: normalized.split(' ').filter(|w| !w.is_empty()).map(str::to_string).collect() }
    }

    /// Whether every word in `required` occurs in the input.
    pub fn admits(&self, required: &[String]) -> bool {
        required.iter().all(|w| self.words.contains(w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_requires_every_literal() {
        let trigger = InputTrigger::scan("HELLO THERE FRIEND");
        assert!(trigger.admits(&["HELLO".into(), "FRIEND".into()]));
        assert!(!trigger.admits(&["HELLO".into(), "ENEMY".into()]));
        assert!(trigger.admits(&[]));
    }

    #[test]
    fn empty_input_admits_only_wildcard_patterns() {
        let trigger = InputTrigger::scan("");
        assert!(trigger.words.is_empty());
        assert!(trigger.admits(&[]));
        assert!(!trigger.admits(&["HI".into()]));
    }
}
