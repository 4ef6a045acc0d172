//! Built-in tag handlers, one module per pipeline stage.

#[path = "handlers/collections.rs"]
mod collections;
#[path = "handlers/condition.rs"]
mod condition;
#[path = "handlers/history.rs"]
mod history;
#[path = "handlers/learn.rs"]
mod learn;
#[path = "handlers/normalization.rs"]
mod normalization;
#[path = "handlers/srai.rs"]
mod srai;
#[path = "handlers/star.rs"]
mod star;
#[path = "handlers/substitution.rs"]
mod substitution;
#[path = "handlers/system.rs"]
mod system;
#[path = "handlers/temporal.rs"]
mod temporal;
#[path = "handlers/text.rs"]
mod text;
#[path = "handlers/variables.rs"]
mod variables;

pub(crate) use collections::CollectionHandler;
pub(crate) use condition::ConditionHandler;
pub(crate) use history::HistoryHandler;
pub(crate) use learn::LearnHandler;
pub(crate) use normalization::NormalizationHandler;
pub(crate) use srai::SelfMatchHandler;
pub(crate) use star::StarHandler;
pub(crate) use substitution::SubstitutionHandler;
pub(crate) use system::SystemHandler;
pub(crate) use temporal::TemporalHandler;
pub(crate) use text::TextHandler;
pub(crate) use variables::VariableHandler;

/// 1-based `index` attribute, defaulting to 1.
fn index_attr(el: &super::node::Element) -> usize {
    el.attr("index").and_then(|s| s.trim().parse().ok()).filter(|&n| n > 0).unwrap_or(1)
}
