//! Projection of manifest trees into plain JSON values.
//!
//! A projection never touches the source tree. In [`LocaleMode::Raw`] every locale table is
//! emitted exactly as it was declared (`{"strDB": [...]}`); in [`LocaleMode::Flatten`] each table
//! collapses to a single string. Everything that is not a locale table passes through as-is, at
//! any depth, so callers never need to know which fields carry localized text.

use log::trace;
use serde_json::{Map, Value};

use crate::err::ResolveError;
use crate::node::{LocaleTable, Node, STR, STR_DB, TEXT_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocaleMode {
    /// Collapse every locale table to one string.
    #[default]
    Flatten,
    /// Keep every locale table with all of its entries.
    Raw,
}

impl LocaleMode {
    pub fn from_flatten(flatten: bool) -> Self {
        if flatten {
            LocaleMode::Flatten
        } else {
            LocaleMode::Raw
        }
    }
}

impl LocaleTable {
    /// Picks the text a flattened view shows for this table.
    ///
    /// The entry flagged as default wins. Without one, the first entry in declaration order is
    /// used. Entries with empty text are skipped as long as a non-empty one exists.
    pub fn flatten(&self) -> Result<&str, ResolveError> {
        let entries = self.entries();
        let first = entries.first().ok_or(ResolveError::EmptyLocaleTable)?;

        let chosen = entries
            .iter()
            .find(|e| e.default && !e.text.is_empty())
            .or_else(|| entries.iter().find(|e| !e.text.is_empty()))
            .unwrap_or(first);

        Ok(&chosen.text)
    }

    /// The table as `{"strDB": [...]}`.
    ///
    /// Entries read from a manifest are returned as declared, with every key and JSON type kept.
    /// XML element text is reported under `str`. Tables built by hand serialize their entries.
    pub fn to_raw_value(&self) -> Result<Value, ResolveError> {
        if self.declared().is_empty() {
            // Serializing plain strings and bools into a `Value` cannot fail.
            return Ok(serde_json::to_value(self).unwrap_or(Value::Null));
        }

        let entries = self
            .declared()
            .iter()
            .map(declared_entry)
            .collect::<Result<Vec<_>, _>>()?;

        let mut table = Map::with_capacity(1);
        table.insert(STR_DB.to_owned(), Value::Array(entries));
        Ok(Value::Object(table))
    }

    pub fn project(&self, mode: LocaleMode) -> Result<Value, ResolveError> {
        match mode {
            LocaleMode::Flatten => self.flatten().map(|s| Value::String(s.to_owned())),
            LocaleMode::Raw => self.to_raw_value(),
        }
    }
}

fn declared_entry(node: &Node) -> Result<Value, ResolveError> {
    match node {
        Node::Map(children) => Ok(Value::Object(
            project_entries(children, LocaleMode::Raw)?
                .into_iter()
                .map(|(key, value)| {
                    if key == TEXT_KEY {
                        (STR.to_owned(), value)
                    } else {
                        (key, value)
                    }
                })
                .collect(),
        )),
        other => other.project(LocaleMode::Raw),
    }
}

impl Node {
    /// Projects this node (and everything below it) into a JSON value.
    pub fn project(&self, mode: LocaleMode) -> Result<Value, ResolveError> {
        match self {
            Node::Value(v) => Ok(v.clone()),
            Node::Locale(table) => {
                trace!("projecting locale table with {} entries", table.len());
                table.project(mode)
            }
            Node::List(items) => items
                .iter()
                .map(|item| item.project(mode))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Node::Map(children) => project_entries(children, mode).map(Value::Object),
        }
    }
}

/// Projects named children into an object, keeping their order.
///
/// Repeated names are folded into an array at the position of their first occurrence. A name
/// that occurs once stays a single value, so a repeated XML element (`<item>`) is an array only
/// when the manifest holds more than one of it.
pub fn project_entries(
    entries: &[(String, Node)],
    mode: LocaleMode,
) -> Result<Map<String, Value>, ResolveError> {
    let mut map = Map::with_capacity(entries.len());

    for (key, node) in entries {
        let value = node.project(mode)?;

        if entries.iter().filter(|(k, _)| k == key).count() == 1 {
            map.insert(key.clone(), value);
            continue;
        }

        if let Value::Array(items) = map
            .entry(key.clone())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            items.push(value);
        }
    }

    Ok(map)
}
