use log::debug;
use serde_json::{Map, Value};

use crate::err::ResolveError;
use crate::locale::{LocaleMode, project_entries};
use crate::node::Node;

/// The authoring application identifier written by After Effects.
pub const AFTER_EFFECTS: &str = "aefx";
/// The authoring application identifier written by Premiere Pro.
pub const PREMIERE_PRO: &str = "ppro";

/// A parsed manifest. Never modified after parsing; views are produced by projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    pub(super) author_app: String,
    /// Top level nodes in document order, minus the field list.
    pub(super) entries: Vec<(String, Node)>,
    pub(super) capsule_name_index: usize,
    pub(super) fields: Vec<Field>,
}

impl ManifestDocument {
    pub fn author_app(&self) -> &str {
        &self.author_app
    }

    pub fn is_after_effects(&self) -> bool {
        self.author_app == AFTER_EFFECTS
    }

    pub fn is_premiere(&self) -> bool {
        self.author_app == PREMIERE_PRO
    }

    /// The template name, usually a locale table.
    pub fn capsule_name(&self) -> &Node {
        &self.entries[self.capsule_name_index].1
    }

    pub fn entries(&self) -> &[(String, Node)] {
        &self.entries
    }

    /// Essential Graphics fields, in authoring order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Every top level node (except the field list) as one JSON object.
    pub fn project(&self, mode: LocaleMode) -> Result<Value, ResolveError> {
        project_entries(&self.entries, mode).map(Value::Object)
    }

    pub fn project_fields(&self, mode: LocaleMode) -> Result<Vec<Value>, ResolveError> {
        self.fields.iter().map(|f| f.project(mode)).collect()
    }
}

/// One Essential Graphics control.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub(super) id: String,
    /// The type tag exactly as written in the manifest.
    pub(super) type_tag: Value,
    pub(super) kind: FieldKind,
    pub(super) can_animate: bool,
    pub(super) ui_name: Node,
    /// Every other child of the control, in order. Contents depend on the control type.
    pub(super) properties: Vec<(String, Node)>,
}

impl Field {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn can_animate(&self) -> bool {
        self.can_animate
    }

    pub fn ui_name(&self) -> &Node {
        &self.ui_name
    }

    pub fn properties(&self) -> &[(String, Node)] {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Node> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// A JSON snapshot of the control: `id`, `type`, `canAnimate`, `uiName`, then the
    /// type-specific properties.
    pub fn project(&self, mode: LocaleMode) -> Result<Value, ResolveError> {
        let mut object = Map::with_capacity(4 + self.properties.len());
        object.insert("id".to_owned(), Value::String(self.id.clone()));
        object.insert("type".to_owned(), self.type_tag.clone());
        object.insert("canAnimate".to_owned(), Value::Bool(self.can_animate));
        object.insert("uiName".to_owned(), self.ui_name.project(mode)?);
        for (key, value) in project_entries(&self.properties, mode)? {
            if object.contains_key(&key) {
                debug!("field `{}`: dropping property `{}` from the view", self.id, key);
                continue;
            }
            object.insert(key, value);
        }

        Ok(Value::Object(object))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Color,
    Checkbox,
    Slider,
    Angle,
    Point,
    Dropdown,
    Group,
    /// Any type tag not listed above, kept verbatim.
    Other(String),
}

impl FieldKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "text" | "textbox" | "sourcetext" => FieldKind::Text,
            "color" => FieldKind::Color,
            "checkbox" => FieldKind::Checkbox,
            "slider" => FieldKind::Slider,
            "angle" => FieldKind::Angle,
            "point" | "point2d" => FieldKind::Point,
            "dropdown" | "menu" => FieldKind::Dropdown,
            "group" => FieldKind::Group,
            _ => FieldKind::Other(tag.to_owned()),
        }
    }
}
