//! The knowledge base: categories plus the bot's auxiliary data.
//!
//! Categories live in an append-only arena addressed by [`CategoryId`]. The
//! composite-key index maps to ids, never to references, so growing the arena
//! cannot invalidate it. Compiled patterns are stored in a second vector
//! aligned with the arena.
//!
//! ```text
//! categories: [ c0, c1, c2, ... ]        CategoryId(i) -> categories[i]
//! compiled:   [ k0, k1, k2, ... ]        CategoryId(i) -> compiled[i]
//! index:      { "HELLO *" -> 0, "YES|THAT:DO YOU LIKE CATS" -> 2, ... }
//! ```
//!
//! Every mutation (new category, set/map/list/array change, variable or
//! property write) bumps [`KnowledgeBase::generation`], which the template
//! cache folds into its keys.
//!
//! Container and variable names are case-insensitive (stored lower-cased).

use crate::engine::CompiledCategory;
use crate::error::PatternError;
use crate::normalize::normalize;
use crate::{Category, CategoryId};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    categories: Vec<Category>,
    compiled: Vec<CompiledCategory>,
    index: HashMap<String, CategoryId>,
    sets: HashMap<String, Vec<String>>,
    maps: HashMap<String, HashMap<String, String>>,
    lists: HashMap<String, Vec<String>>,
    arrays: HashMap<String, Vec<String>>,
    variables: HashMap<String, String>,
    properties: HashMap<String, String>,
    generation: u64,
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Categories ------------------------------------------------------------

    /// Compile and insert `category`. A category whose composite key already
    /// exists replaces the old one in place and keeps its id.
    pub fn add_category(&mut self, category: Category) -> Result<CategoryId, PatternError> {
        let compiled = CompiledCategory::compile(&category, &self.properties)?;
        let key = category.key();
        self.generation += 1;

        if let Some(&id) = self.index.get(&key) {
            tracing::debug!(%id, key = %key, "replacing category");
            self.categories[id.0] = category;
            self.compiled[id.0] = compiled;
            return Ok(id);
        }

        let id = CategoryId(self.categories.len());
        self.categories.push(category);
        self.compiled.push(compiled);
        self.index.insert(key, id);
        Ok(id)
    }

    /// Insert several categories, stopping at the first that fails to compile.
    pub fn add_categories<I>(&mut self, categories: I) -> Result<Vec<CategoryId>, PatternError>
    where
        I: IntoIterator<Item = Category>,
    {
        categories.into_iter().map(|c| self.add_category(c)).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(id.0)
    }

    pub fn categories(&self) -> impl Iterator<Item = (CategoryId, &Category)> {
        self.categories.iter().enumerate().map(|(i, c)| (CategoryId(i), c))
    }

    /// Look up a composite key (see [`Category::key`]).
    pub fn lookup(&self, key: &str) -> Option<CategoryId> {
        self.index.get(key).copied()
    }

    pub(crate) fn compiled(&self, id: CategoryId) -> Option<&CompiledCategory> {
        self.compiled.get(id.0)
    }

    pub(crate) fn compiled_iter(&self) -> impl Iterator<Item = (CategoryId, &CompiledCategory)> {
        self.compiled.iter().enumerate().map(|(i, c)| (CategoryId(i), c))
    }

    /// Whether every index entry re-derives from its category and every
    /// category is indexed under its own key.
    pub fn index_is_consistent(&self) -> bool {
        self.categories.len() == self.compiled.len()
            && self.index.len() == self.categories.len()
            && self.index.iter().all(|(key, id)| self.categories.get(id.0).is_some_and(|c| c.key() == *key))
    }

    /// Distinct literal words across all input patterns.
    pub fn vocabulary(&self) -> BTreeSet<String> {
        self.compiled.iter().flat_map(|c| c.pattern.required_words().iter().cloned()).collect()
    }

    /// Mutation counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // --- Sets ------------------------------------------------------------------

    /// Define (or redefine) a set. Members are unique case-insensitively; the
    /// first spelling wins.
    pub fn add_set<I, S>(&mut self, name: &str, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Vec::new();
        for member in members {
            let member = member.into();
            if !set.iter().any(|m: &String| same_member(m, &member)) {
                set.push(member);
            }
        }
        self.sets.insert(name_key(name), set);
        self.generation += 1;
    }

    pub fn set(&self, name: &str) -> Option<&[String]> {
        self.sets.get(&name_key(name)).map(Vec::as_slice)
    }

    pub fn set_contains(&self, name: &str, item: &str) -> bool {
        self.set(name).is_some_and(|s| s.iter().any(|m| same_member(m, item)))
    }

    /// Add `item` unless already present. Returns whether it was added.
    pub fn set_insert(&mut self, name: &str, item: &str) -> bool {
        let set = self.sets.entry(name_key(name)).or_default();
        if set.iter().any(|m| same_member(m, item)) {
            return false;
        }
        set.push(item.to_string());
        self.generation += 1;
        true
    }

    /// Remove `item`. Returns whether it was present.
    pub fn set_remove(&mut self, name: &str, item: &str) -> bool {
        let Some(set) = self.sets.get_mut(&name_key(name)) else {
            return false;
        };
        let before = set.len();
        set.retain(|m| !same_member(m, item));
        let removed = set.len() != before;
        if removed {
            self.generation += 1;
        }
        removed
    }

    pub fn set_clear(&mut self, name: &str) {
        if let Some(set) = self.sets.get_mut(&name_key(name)) {
            set.clear();
            self.generation += 1;
        }
    }

    // --- Maps ------------------------------------------------------------------

    /// Define (or redefine) a map. Keys are matched after normalization.
    pub fn add_map<I, K, V>(&mut self, name: &str, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let map = entries.into_iter().map(|(k, v)| (normalize(k.as_ref()), v.into())).collect();
        self.maps.insert(name_key(name), map);
        self.generation += 1;
    }

    pub fn map(&self, name: &str) -> Option<&HashMap<String, String>> {
        self.maps.get(&name_key(name))
    }

    pub fn map_get(&self, name: &str, key: &str) -> Option<&str> {
        self.map(name)?.get(&normalize(key)).map(String::as_str)
    }

    pub(crate) fn map_insert(&mut self, name: &str, key: &str, value: &str) {
        self.maps.entry(name_key(name)).or_default().insert(normalize(key), value.to_string());
        self.generation += 1;
    }

    pub(crate) fn map_remove(&mut self, name: &str, key: &str) -> Option<String> {
        let removed = self.maps.get_mut(&name_key(name))?.remove(&normalize(key));
        if removed.is_some() {
            self.generation += 1;
        }
        removed
    }

    // --- Lists and arrays --------------------------------------------------------

    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.lists.get(&name_key(name)).map(Vec::as_slice)
    }

    pub fn set_list<I, S>(&mut self, name: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lists.insert(name_key(name), items.into_iter().map(Into::into).collect());
        self.generation += 1;
    }

    /// Mutable access for collection tags; counts as a mutation.
    pub(crate) fn list_mut(&mut self, name: &str) -> &mut Vec<String> {
        self.generation += 1;
        self.lists.entry(name_key(name)).or_default()
    }

    pub fn array(&self, name: &str) -> Option<&[String]> {
        self.arrays.get(&name_key(name)).map(Vec::as_slice)
    }

    pub fn set_array<I, S>(&mut self, name: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arrays.insert(name_key(name), items.into_iter().map(Into::into).collect());
        self.generation += 1;
    }

    pub(crate) fn array_mut(&mut self, name: &str) -> &mut Vec<String> {
        self.generation += 1;
        self.arrays.entry(name_key(name)).or_default()
    }

    // --- Variables and properties ------------------------------------------------

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(&name_key(name)).map(String::as_str)
    }

    pub fn set_variable(&mut self, name: &str, value: impl Into<String>) {
        self.variables.insert(name_key(name), value.into());
        self.generation += 1;
    }

    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(&name_key(name)).map(String::as_str)
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    /// Set a bot property. Patterns that embed `<bot name="..."/>` are
    /// recompiled so they see the new value.
    pub fn set_property(&mut self, name: &str, value: impl Into<String>) {
        self.properties.insert(name_key(name), value.into());
        self.generation += 1;
        self.recompile_property_patterns();
    }

    fn recompile_property_patterns(&mut self) {
        for (i, category) in self.categories.iter().enumerate() {
            let embeds = [Some(category.pattern.as_str()), category.that.as_deref(), category.topic.as_deref()]
                .into_iter()
                .flatten()
                .any(|p| p.to_ascii_lowercase().contains("<bot"));
            if !embeds {
                continue;
            }
            match CompiledCategory::compile(category, &self.properties) {
                Ok(compiled) => self.compiled[i] = compiled,
                Err(err) => tracing::warn!(id = %CategoryId(i), error = %err, "failed to recompile category"),
            }
        }
    }
}

fn same_member(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relearning_replaces_in_place() {
        let mut kb = KnowledgeBase::new();
        let a = kb.add_category(Category::new("hello", "one")).unwrap();
        let b = kb.add_category(Category::new("bye", "two")).unwrap();
        let again = kb.add_category(Category::new("HELLO", "three")).unwrap();

        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(kb.len(), 2);
        assert_eq!(kb.category(a).unwrap().template, "three");
        assert!(kb.index_is_consistent());
    }

    #[test]
    fn index_survives_many_appends() {
        let mut kb = KnowledgeBase::new();
        let first = kb.add_category(Category::new("FIRST *", "x")).unwrap();
        for i in 0..500 {
            kb.add_category(Category::new(format!("WORD{i} *"), "y")).unwrap();
        }
        assert_eq!(kb.lookup("FIRST *"), Some(first));
        assert_eq!(kb.category(first).unwrap().pattern, "FIRST *");
        assert!(kb.index_is_consistent());
    }

    #[test]
    fn invalid_category_is_rejected_without_side_effects() {
        let mut kb = KnowledgeBase::new();
        let err = kb.add_category(Category::new("_ _ _ _ _ _ _ _ _ _", "x")).unwrap_err();
        assert!(matches!(err, PatternError::TooManyWildcards { .. }));
        assert!(kb.is_empty());
        assert_eq!(kb.generation(), 0);
    }

    #[test]
    fn sets_are_unique_case_insensitively() {
        let mut kb = KnowledgeBase::new();
        kb.add_set("Colors", ["red", "Green", "RED"]);
        assert_eq!(kb.set("colors").unwrap(), ["red", "Green"]);
        assert!(kb.set_contains("COLORS", "green"));
        assert!(!kb.set_insert("colors", "Red"));
        assert!(kb.set_insert("colors", "blue"));
        assert!(kb.set_remove("colors", "GREEN"));
        assert_eq!(kb.set("colors").unwrap(), ["red", "blue"]);
    }

    #[test]
    fn map_keys_are_normalized() {
        let mut kb = KnowledgeBase::new();
        kb.add_map("capital", [("France", "Paris"), ("new york", "Albany")]);
        assert_eq!(kb.map_get("CAPITAL", "france"), Some("Paris"));
        assert_eq!(kb.map_get("capital", "New York!"), Some("Albany"));
        assert_eq!(kb.map_get("capital", "Spain"), None);
    }

    #[test]
    fn mutations_bump_generation() {
        let mut kb = KnowledgeBase::new();
        let g0 = kb.generation();
        kb.set_variable("x", "1");
        let g1 = kb.generation();
        assert!(g1 > g0);
        let _ = kb.variable("x");
        assert!(kb.set("missing").is_none());
        assert_eq!(kb.generation(), g1);
        kb.list_mut("todo").push("a".into());
        assert!(kb.generation() > g1);
    }

    #[test]
    fn property_change_recompiles_bot_patterns() {
        let mut kb = KnowledgeBase::new();
        kb.set_property("name", "Ada");
        let id = kb.add_category(Category::new(r#"ARE YOU <bot name="name"/>"#, "yes")).unwrap();
        assert_eq!(kb.compiled(id).unwrap().pattern.required_words(), ["ARE", "YOU", "ADA"]);

        kb.set_property("name", "Grace");
        assert_eq!(kb.compiled(id).unwrap().pattern.required_words(), ["ARE", "YOU", "GRACE"]);
        assert!(kb.vocabulary().contains("GRACE"));
    }
}
