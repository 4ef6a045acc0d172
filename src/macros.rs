/// Lazily compiled, process-wide `Regex` for a literal pattern.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Lazily built [`Substitutions`](crate::Substitutions) table from literal pairs.
#[macro_export]
macro_rules! word_map {
    ($($from:literal => $to:literal),* $(,)?) => {
        once_cell::sync::Lazy::new(|| $crate::Substitutions::from_pairs([ $(($from, $to)),* ]))
    };
}
