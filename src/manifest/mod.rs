//! Parsing of the template manifest (`definition.xml` / `definition.json`).
//!
//! This module is split into:
//! - `xml` / `json`: turn manifest bytes into a [`Node`](crate::node::Node) tree
//! - `parse`: pick the known nodes out of the tree (author app, capsule name, field list)
//! - `types`: the typed view handed to the facade

mod json;
mod parse;
mod types;
mod xml;

pub use types::*;

/// Member name of an XML manifest.
pub const XML_MANIFEST: &str = "definition.xml";
/// Member name of a JSON manifest, as written by current Adobe tools.
pub const JSON_MANIFEST: &str = "definition.json";

/// Top level node naming the authoring application.
pub const AUTHOR_APP: &str = "authorApp";
/// Top level node holding the template's display name.
pub const CAPSULE_NAME: &str = "capsuleNameLocalized";
/// Top level node holding the Essential Graphics fields.
pub const CLIENT_CONTROLS: &str = "clientControls";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Xml,
    Json,
}

impl ManifestFormat {
    /// Preference order when a container carries more than one manifest.
    pub const ALL: [ManifestFormat; 2] = [ManifestFormat::Xml, ManifestFormat::Json];

    pub fn member_name(self) -> &'static str {
        match self {
            ManifestFormat::Xml => XML_MANIFEST,
            ManifestFormat::Json => JSON_MANIFEST,
        }
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}
