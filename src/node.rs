//! The parsed manifest tree.
//!
//! Both manifest encodings (XML and JSON) are read into the same [`Node`] tree. Locale tables
//! are recognized structurally while the tree is built, so every later consumer can match on
//! [`Node::Locale`] instead of re-checking the `strDB` convention.

use serde::Serialize;
use serde_json::Value;

use crate::err::ManifestError;

/// Key of the single child that marks a node as a locale table.
pub const STR_DB: &str = "strDB";
/// Key (or XML attribute) carrying an entry's locale tag.
pub const LOCALE_STRING: &str = "localeString";
/// Key carrying an entry's text.
pub const STR: &str = "str";
/// Key (or XML attribute) flagging the designated default entry.
pub const DEFAULT: &str = "default";
/// Key used for the text content of XML elements that also carry attributes or children.
pub const TEXT_KEY: &str = "#text";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A scalar leaf. XML leaves are always strings; JSON leaves keep their JSON type.
    Value(Value),
    /// A locale-bearing value in table form.
    Locale(LocaleTable),
    /// Named children in document order. Names may repeat (repeated XML elements).
    Map(Vec<(String, Node)>),
    List(Vec<Node>),
}

impl Node {
    pub fn string(s: impl Into<String>) -> Self {
        Node::Value(Value::String(s.into()))
    }

    /// Builds a map node, turning it into [`Node::Locale`] when it has the locale table shape.
    ///
    /// `path` is only used for error reporting.
    pub fn from_children(path: &str, children: Vec<(String, Node)>) -> Result<Node, ManifestError> {
        match children.as_slice() {
            [(key, table)] if key == STR_DB => {
                LocaleTable::from_str_db(&format!("{path}/{STR_DB}"), table).map(Node::Locale)
            }
            _ => Ok(Node::Map(children)),
        }
    }

    /// First child named `key`.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(children) => children.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Scalar rendered as text. Strings are returned as-is, other scalars use their JSON form.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Node::Value(Value::String(s)) => Some(s.clone()),
            Node::Value(Value::Null) => None,
            Node::Value(v) => Some(v.to_string()),
            _ => None,
        }
    }

    pub fn is_locale(&self) -> bool {
        matches!(self, Node::Locale(_))
    }
}

/// One locale-tagged variant of a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleEntry {
    #[serde(rename = "localeString")]
    pub locale: String,
    #[serde(rename = "str")]
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
}

impl LocaleEntry {
    pub fn new(locale: impl Into<String>, text: impl Into<String>) -> Self {
        LocaleEntry {
            locale: locale.into(),
            text: text.into(),
            default: false,
        }
    }

    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }
}

/// A table of locale variants, kept in declaration order.
///
/// Tables read from a manifest also keep every entry node as it was declared, so a raw view can
/// return keys and value types the typed [`LocaleEntry`] does not model.
#[derive(Debug, Clone, Serialize)]
pub struct LocaleTable {
    #[serde(rename = "strDB")]
    entries: Vec<LocaleEntry>,
    #[serde(skip)]
    declared: Vec<Node>,
}

/// Tables compare by their resolved entries.
impl PartialEq for LocaleTable {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl LocaleTable {
    pub fn new(entries: Vec<LocaleEntry>) -> Self {
        LocaleTable {
            entries,
            declared: vec![],
        }
    }

    pub fn entries(&self) -> &[LocaleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.locale.as_str())
    }

    /// Text for an exact locale tag.
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.locale == locale)
            .map(|e| e.text.as_str())
    }

    pub fn default_entry(&self) -> Option<&LocaleEntry> {
        self.entries.iter().find(|e| e.default)
    }

    /// Entry nodes as declared in the manifest. Empty for tables built with [`LocaleTable::new`].
    pub fn declared(&self) -> &[Node] {
        &self.declared
    }

    /// Reads the value of a `strDB` node.
    ///
    /// JSON manifests store entries as an array of objects. XML manifests store them as repeated
    /// child elements (`<str localeString="en_US">Title</str>`), whose text lands in `#text`.
    fn from_str_db(path: &str, node: &Node) -> Result<LocaleTable, ManifestError> {
        let items: Vec<&Node> = match node {
            Node::List(items) => items.iter().collect(),
            Node::Map(children) => children.iter().map(|(_, v)| v).collect(),
            // `<strDB/>`
            Node::Value(Value::String(s)) if s.is_empty() => vec![],
            Node::Value(Value::Null) => vec![],
            _ => {
                return Err(ManifestError::UnexpectedShape {
                    path: path.to_owned(),
                    expected: "a list of locale entries",
                });
            }
        };

        if items.is_empty() {
            return Err(ManifestError::EmptyLocaleTable {
                path: path.to_owned(),
            });
        }

        let entries = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                read_entry(item).ok_or_else(|| ManifestError::MalformedLocaleEntry {
                    path: path.to_owned(),
                    index,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LocaleTable {
            entries,
            declared: items.into_iter().cloned().collect(),
        })
    }
}

fn read_entry(node: &Node) -> Option<LocaleEntry> {
    let locale = node.get(LOCALE_STRING)?.scalar_text()?;
    let text = match node.get(STR).or_else(|| node.get(TEXT_KEY)) {
        Some(text) => text.scalar_text()?,
        // `<str localeString="en_US"/>` or `<str localeString="en_US"></str>`
        None if is_xml_entry(node) => String::new(),
        None => return None,
    };
    let default = match node.get(DEFAULT) {
        Some(Node::Value(Value::Bool(b))) => *b,
        Some(flag) => flag.as_str() == Some("true"),
        None => false,
    };

    Some(LocaleEntry {
        locale,
        text,
        default,
    })
}

/// XML entries keep their attributes as string leaves and never nest further.
fn is_xml_entry(node: &Node) -> bool {
    match node {
        Node::Map(children) => children
            .iter()
            .all(|(k, v)| (k == LOCALE_STRING || k == DEFAULT) && v.as_str().is_some()),
        _ => false,
    }
}
