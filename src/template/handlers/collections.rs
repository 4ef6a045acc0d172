//! Named containers owned by the knowledge base: `<map>`, `<list>`,
//! `<array>` and `<set operation="...">`.
//!
//! | operation        | set             | list / array          | map                 |
//! |------------------|-----------------|-----------------------|---------------------|
//! | `add`, `append`  | insert unique   | push                  | insert `key`        |
//! | `insert`         | insert unique   | insert at `index`     | insert `key`        |
//! | `remove`         | by value        | by `index` or value   | by `key`            |
//! | `set`            | insert unique   | replace at `index`    | insert `key`        |
//! | `clear`, `size`, `contains`, `get` (default)                                   |
//!
//! Indices are 0-based. Set membership ignores case; lists and arrays store
//! and compare verbatim. Whole-container reads join items with a space.

use crate::knowledge::KnowledgeBase;
use crate::template::node::{Element, Node};
use crate::template::registry::{Runtime, TagHandler, empty, text};

const ATTRIBUTE_CHILDREN: &[&str] = &["name", "key", "index"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Insert,
    Remove,
    Set,
    Clear,
    Size,
    Contains,
    Get,
}

impl Operation {
    fn parse(s: Option<&str>) -> Operation {
        match s.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("add" | "append" | "push") => Operation::Add,
            Some("insert") => Operation::Insert,
            Some("remove" | "delete") => Operation::Remove,
            Some("set" | "put" | "replace") => Operation::Set,
            Some("clear") => Operation::Clear,
            Some("size" | "count" | "length") => Operation::Size,
            Some("contains" | "has") => Operation::Contains,
            _ => Operation::Get,
        }
    }

    fn mutates(self) -> bool {
        matches!(self, Operation::Add | Operation::Insert | Operation::Remove | Operation::Set | Operation::Clear)
    }
}

pub(crate) struct CollectionHandler;

impl TagHandler for CollectionHandler {
    fn name(&self) -> &'static str {
        "collections"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["map", "list", "array", "set"]
    }

    fn should_process(&self, el: &Element) -> bool {
        match el.name.as_str() {
            "set" => el.has_attr("operation"),
            other => self.tags().contains(&other),
        }
    }

    fn process(&self, el: Element, rt: &mut Runtime<'_, '_>) -> Vec<Node> {
        let Some(name) = rt.attr(&el, "name") else {
            tracing::debug!(tag = el.name.as_str(), "collection tag without a name");
            return empty();
        };
        let op = Operation::parse(el.attr("operation"));
        let index = rt.attr(&el, "index").and_then(|i| i.trim().parse::<usize>().ok());
        let value = rt.content_without(&el, ATTRIBUTE_CHILDREN);
        if op.mutates() {
            rt.ctx.volatile = true;
        }

        let key = if el.name == "map" { rt.attr(&el, "key") } else { None };

        let kb = &mut *rt.ctx.kb;
        let out = match el.name.as_str() {
            "set" => set_op(kb, &name, op, &value),
            "map" => map_op(kb, &name, op, key.as_deref(), &value, el.attr("default")),
            "list" if op.mutates() => sequence_op(kb.list_mut(&name), op, index, &value),
            "list" => sequence_op(&mut kb.list(&name).map(<[String]>::to_vec).unwrap_or_default(), op, index, &value),
            _ if op.mutates() => sequence_op(kb.array_mut(&name), op, index, &value),
            _ => sequence_op(&mut kb.array(&name).map(<[String]>::to_vec).unwrap_or_default(), op, index, &value),
        };
        text(out)
    }
}

fn flag(b: bool) -> String {
    b.to_string()
}

fn set_op(kb: &mut KnowledgeBase, name: &str, op: Operation, value: &str) -> String {
    match op {
        Operation::Add | Operation::Insert | Operation::Set => {
            if !value.is_empty() {
                kb.set_insert(name, value);
            }
            String::new()
        }
        Operation::Remove => {
            kb.set_remove(name, value);
            String::new()
        }
        Operation::Clear => {
            kb.set_clear(name);
            String::new()
        }
        Operation::Size => kb.set(name).map_or(0, <[String]>::len).to_string(),
        Operation::Contains => flag(kb.set_contains(name, value)),
        Operation::Get => kb.set(name).map(|items| items.join(" ")).unwrap_or_default(),
    }
}

fn map_op(
    kb: &mut KnowledgeBase,
    name: &str,
    op: Operation,
    key: Option<&str>,
    value: &str,
    default: Option<&str>,
) -> String {
    match op {
        Operation::Add | Operation::Insert | Operation::Set => {
            match key {
                Some(key) => kb.map_insert(name, key, value),
                None => tracing::debug!(map = name, "map write without a key"),
            }
            String::new()
        }
        Operation::Remove => {
            kb.map_remove(name, key.unwrap_or(value));
            String::new()
        }
        Operation::Clear => {
            let keys: Vec<String> = kb.map(name).map(|m| m.keys().cloned().collect()).unwrap_or_default();
            for key in keys {
                kb.map_remove(name, &key);
            }
            String::new()
        }
        Operation::Size => kb.map(name).map_or(0, |m| m.len()).to_string(),
        Operation::Contains => flag(kb.map_get(name, key.unwrap_or(value)).is_some()),
        Operation::Get => kb
            .map_get(name, key.unwrap_or(value))
            .or(default)
            .unwrap_or("unknown")
            .to_string(),
    }
}

/// Shared list/array semantics.
fn sequence_op(items: &mut Vec<String>, op: Operation, index: Option<usize>, value: &str) -> String {
    match op {
        Operation::Add => {
            items.push(value.to_string());
            String::new()
        }
        Operation::Insert => {
            let at = index.unwrap_or(items.len()).min(items.len());
            items.insert(at, value.to_string());
            String::new()
        }
        Operation::Set => {
            match index {
                Some(i) if i < items.len() => items[i] = value.to_string(),
                Some(i) if i == items.len() => items.push(value.to_string()),
                _ => tracing::debug!(?index, len = items.len(), "collection write out of range"),
            }
            String::new()
        }
        Operation::Remove => {
            match index {
                Some(i) if i < items.len() => {
                    items.remove(i);
                }
                Some(_) => {}
                None => {
                    if let Some(pos) = items.iter().position(|item| item == value) {
                        items.remove(pos);
                    }
                }
            }
            String::new()
        }
        Operation::Clear => {
            items.clear();
            String::new()
        }
        Operation::Size => items.len().to_string(),
        Operation::Contains => flag(items.iter().any(|item| item == value)),
        Operation::Get => match index {
            Some(i) => items.get(i).cloned().unwrap_or_default(),
            None => items.join(" "),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sequence_operations_use_zero_based_indices() {
        let mut list = items(&["a", "b"]);
        sequence_op(&mut list, Operation::Insert, Some(0), "z");
        assert_eq!(list, items(&["z", "a", "b"]));
        assert_eq!(sequence_op(&mut list, Operation::Get, Some(1), ""), "a");
        sequence_op(&mut list, Operation::Remove, Some(0), "");
        sequence_op(&mut list, Operation::Remove, None, "b");
        assert_eq!(list, items(&["a"]));
        sequence_op(&mut list, Operation::Set, Some(0), "A");
        assert_eq!(sequence_op(&mut list, Operation::Contains, None, "a"), "false");
        assert_eq!(sequence_op(&mut list, Operation::Size, None, ""), "1");
    }

    #[test]
    fn unknown_operation_reads() {
        assert_eq!(Operation::parse(Some("frobnicate")), Operation::Get);
        assert_eq!(Operation::parse(None), Operation::Get);
        assert_eq!(Operation::parse(Some(" Append ")), Operation::Add);
    }

    #[test]
    fn map_get_falls_back_to_default_then_unknown() {
        let mut kb = KnowledgeBase::new();
        kb.add_map("capital", [("france", "Paris")]);
        assert_eq!(map_op(&mut kb, "capital", Operation::Get, None, "France", None), "Paris");
        assert_eq!(map_op(&mut kb, "capital", Operation::Get, None, "Peru", Some("?")), "?");
        assert_eq!(map_op(&mut kb, "capital", Operation::Get, None, "Peru", None), "unknown");
    }
}
