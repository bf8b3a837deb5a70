use log::{debug, trace};
use serde_json::Value;

use super::types::*;
use super::{AUTHOR_APP, CAPSULE_NAME, CLIENT_CONTROLS, ManifestFormat, json, strip_bom, xml};
use crate::err::ManifestError;
use crate::node::Node;

type Result<T> = std::result::Result<T, ManifestError>;

const ID: &str = "id";
const TYPE: &str = "type";
const CAN_ANIMATE: &str = "canAnimate";
const UI_NAME: &str = "uiName";

impl ManifestDocument {
    /// Parses raw manifest bytes.
    pub fn parse(bytes: &[u8], format: ManifestFormat) -> Result<Self> {
        let bytes = strip_bom(bytes);
        let root = match format {
            ManifestFormat::Xml => xml::read_xml(bytes)?,
            ManifestFormat::Json => json::read_json(bytes)?,
        };

        Self::from_root(root)
    }

    /// Picks the known nodes out of an already built tree.
    pub fn from_root(root: Node) -> Result<Self> {
        let Node::Map(children) = root else {
            return Err(ManifestError::UnexpectedShape {
                path: "/".to_owned(),
                expected: "an element or object with children",
            });
        };

        let mut entries = Vec::with_capacity(children.len());
        let mut controls = None;
        for (key, node) in children {
            if key == CLIENT_CONTROLS && controls.is_none() {
                controls = Some(node);
            } else {
                entries.push((key, node));
            }
        }

        let author_app = entries
            .iter()
            .find(|(k, _)| k == AUTHOR_APP)
            .ok_or_else(|| missing(AUTHOR_APP))?
            .1
            .as_str()
            .ok_or_else(|| ManifestError::UnexpectedShape {
                path: AUTHOR_APP.to_owned(),
                expected: "a string",
            })?
            .to_owned();

        let capsule_name_index = entries
            .iter()
            .position(|(k, _)| k == CAPSULE_NAME)
            .ok_or_else(|| missing(CAPSULE_NAME))?;
        expect_locale_bearing(CAPSULE_NAME, &entries[capsule_name_index].1)?;

        let controls = controls.ok_or_else(|| missing(CLIENT_CONTROLS))?;
        let fields = control_nodes(controls)?
            .into_iter()
            .enumerate()
            .map(|(i, node)| parse_field(&format!("{CLIENT_CONTROLS}[{i}]"), node))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "parsed manifest: authorApp=`{}`, {} essential graphics fields",
            author_app,
            fields.len()
        );

        Ok(ManifestDocument {
            author_app,
            entries,
            capsule_name_index,
            fields,
        })
    }
}

fn missing(path: &str) -> ManifestError {
    ManifestError::MissingNode {
        path: path.to_owned(),
    }
}

/// A locale-bearing value is either a locale table or a plain scalar.
fn expect_locale_bearing(path: &str, node: &Node) -> Result<()> {
    match node {
        Node::Locale(_) | Node::Value(_) => Ok(()),
        _ => Err(ManifestError::UnexpectedShape {
            path: path.to_owned(),
            expected: "a string or a locale table",
        }),
    }
}

/// The field list is an array in JSON and a run of child elements in XML.
fn control_nodes(controls: Node) -> Result<Vec<Node>> {
    match controls {
        Node::List(items) => Ok(items),
        Node::Map(children) => {
            // Attributes of `<clientControls>` are scalar leaves in front of the control elements.
            let control_name = children
                .iter()
                .find(|(_, node)| !matches!(node, Node::Value(_)))
                .map(|(key, _)| key.clone());

            Ok(children
                .into_iter()
                .filter_map(|(key, node)| {
                    if !matches!(node, Node::Value(_)) || control_name.as_ref() == Some(&key) {
                        Some(node)
                    } else {
                        debug!("skipping `{}/{}`, not a control", CLIENT_CONTROLS, key);
                        None
                    }
                })
                .collect())
        }
        // `<clientControls/>`
        Node::Value(Value::String(s)) if s.is_empty() => Ok(vec![]),
        Node::Value(Value::Null) => Ok(vec![]),
        _ => Err(ManifestError::UnexpectedShape {
            path: CLIENT_CONTROLS.to_owned(),
            expected: "a list of controls",
        }),
    }
}

fn parse_field(path: &str, node: Node) -> Result<Field> {
    let Node::Map(children) = node else {
        return Err(ManifestError::UnexpectedShape {
            path: path.to_owned(),
            expected: "a control with children",
        });
    };

    let mut id = None;
    let mut type_tag = None;
    let mut can_animate = None;
    let mut ui_name = None;
    let mut properties = Vec::with_capacity(children.len());

    for (key, value) in children {
        match key.as_str() {
            ID if id.is_none() => id = Some(value),
            TYPE if type_tag.is_none() => type_tag = Some(value),
            CAN_ANIMATE if can_animate.is_none() => can_animate = Some(value),
            UI_NAME if ui_name.is_none() => ui_name = Some(value),
            ID | TYPE | CAN_ANIMATE | UI_NAME => {
                debug!("{path}: repeated `{key}` kept as a property, the first one wins");
                properties.push((key, value));
            }
            _ => properties.push((key, value)),
        }
    }

    let id = id
        .ok_or_else(|| missing(&format!("{path}/{ID}")))?
        .scalar_text()
        .ok_or_else(|| ManifestError::UnexpectedShape {
            path: format!("{path}/{ID}"),
            expected: "a scalar identifier",
        })?;

    let type_tag = match type_tag.ok_or_else(|| missing(&format!("{path}/{TYPE}")))? {
        Node::Value(v) if !v.is_null() => v,
        _ => {
            return Err(ManifestError::UnexpectedShape {
                path: format!("{path}/{TYPE}"),
                expected: "a scalar type tag",
            });
        }
    };
    let kind = match &type_tag {
        Value::String(s) => FieldKind::from_tag(s),
        other => FieldKind::from_tag(&other.to_string()),
    };

    let can_animate = match can_animate {
        None => false,
        Some(node) => parse_bool(&format!("{path}/{CAN_ANIMATE}"), &node)?,
    };

    let ui_name = ui_name.ok_or_else(|| missing(&format!("{path}/{UI_NAME}")))?;
    expect_locale_bearing(&format!("{path}/{UI_NAME}"), &ui_name)?;

    trace!("parsed field `{}` of kind {:?}", id, kind);

    Ok(Field {
        id,
        type_tag,
        kind,
        can_animate,
        ui_name,
        properties,
    })
}

fn parse_bool(path: &str, node: &Node) -> Result<bool> {
    match node {
        Node::Value(Value::Bool(b)) => Ok(*b),
        Node::Value(Value::String(s)) if s == "true" => Ok(true),
        Node::Value(Value::String(s)) if s == "false" => Ok(false),
        other => Err(ManifestError::InvalidBool {
            path: path.to_owned(),
            value: other
                .scalar_text()
                .unwrap_or_else(|| format!("{:?}", other)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::LocaleMode;
    use crate::node::{LocaleEntry, LocaleTable};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const XML: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<definition>
    <authorApp>aefx</authorApp>
    <capsuleNameLocalized>
        <strDB>
            <str localeString="en_US">Lower Third</str>
            <str localeString="fr_FR">Tiers inferieur</str>
        </strDB>
    </capsuleNameLocalized>
    <clientControls>
        <clientControl id="name" type="text" canAnimate="false">
            <uiName><strDB><str localeString="en_US">Name</str></strDB></uiName>
            <value>Jane Doe</value>
        </clientControl>
        <clientControl id="opacity" type="slider" canAnimate="true">
            <uiName>Opacity</uiName>
            <min>0</min>
            <max>100</max>
        </clientControl>
        <clientControl id="style" type="dropdown">
            <uiName><strDB><str localeString="en_US">Style</str></strDB></uiName>
            <menuItems>
                <item><strDB><str localeString="en_US">Bold</str><str localeString="fr_FR">Gras</str></strDB></item>
                <item><strDB><str localeString="en_US">Light</str></strDB></item>
            </menuItems>
        </clientControl>
    </clientControls>
</definition>"#;

    #[test]
    fn test_parses_xml_manifest() {
        let doc = ManifestDocument::parse(XML, ManifestFormat::Xml).unwrap();

        assert_eq!(doc.author_app(), "aefx");
        assert!(doc.is_after_effects());
        assert!(!doc.is_premiere());
        assert_eq!(
            doc.capsule_name(),
            &Node::Locale(LocaleTable::new(vec![
                LocaleEntry::new("en_US", "Lower Third"),
                LocaleEntry::new("fr_FR", "Tiers inferieur"),
            ]))
        );

        let ids: Vec<_> = doc.fields().iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["name", "opacity", "style"]);

        let kinds: Vec<_> = doc.fields().iter().map(|f| f.kind().clone()).collect();
        assert_eq!(
            kinds,
            vec![FieldKind::Text, FieldKind::Slider, FieldKind::Dropdown]
        );
        assert!(doc.fields()[1].can_animate());
        assert!(!doc.fields()[2].can_animate());
        assert_eq!(doc.fields()[1].property("max"), Some(&Node::string("100")));
    }

    #[test]
    fn test_field_projection() {
        let doc = ManifestDocument::parse(XML, ManifestFormat::Xml).unwrap();

        let flat = doc.project_fields(LocaleMode::Flatten).unwrap();
        assert_eq!(
            flat[2],
            json!({
                "id": "style",
                "type": "dropdown",
                "canAnimate": false,
                "uiName": "Style",
                "menuItems": {"item": ["Bold", "Light"]},
            })
        );

        let raw = doc.project_fields(LocaleMode::Raw).unwrap();
        assert_eq!(
            raw[2]["menuItems"]["item"][0],
            json!({"strDB": [
                {"localeString": "en_US", "str": "Bold"},
                {"localeString": "fr_FR", "str": "Gras"},
            ]})
        );
        assert_eq!(raw[1]["uiName"], json!("Opacity"));
    }

    #[test]
    fn test_manifest_projection_excludes_field_list() {
        let doc = ManifestDocument::parse(XML, ManifestFormat::Xml).unwrap();
        assert_eq!(
            doc.project(LocaleMode::Flatten).unwrap(),
            json!({"authorApp": "aefx", "capsuleNameLocalized": "Lower Third"})
        );
    }

    #[test]
    fn test_parses_json_manifest() {
        let bytes = br#"{
            "authorApp": "ppro",
            "capsuleNameLocalized": {"strDB": [{"localeString": "en_US", "str": "Title"}]},
            "clientControls": [
                {"id": "1", "type": 6, "canAnimate": true, "uiName": {"strDB": [{"localeString": "en_US", "str": "Text"}]}}
            ]
        }"#;

        let doc = ManifestDocument::parse(bytes, ManifestFormat::Json).unwrap();
        assert!(doc.is_premiere());
        assert_eq!(doc.fields()[0].kind(), &FieldKind::Other("6".to_owned()));

        let fields = doc.project_fields(LocaleMode::Flatten).unwrap();
        assert_eq!(fields[0]["type"], json!(6));
        assert_eq!(fields[0]["canAnimate"], json!(true));
    }

    #[test]
    fn test_raw_capsule_name_is_returned_as_declared() {
        let bytes = br#"{
            "authorApp": "ppro",
            "capsuleNameLocalized": {"strDB": [
                {"localeString": "en_US", "str": "T", "default": false, "note": "x"},
                {"localeString": "de_DE", "str": 7, "default": "true"}
            ]},
            "clientControls": []
        }"#;
        let doc = ManifestDocument::parse(bytes, ManifestFormat::Json).unwrap();

        assert_eq!(
            doc.project(LocaleMode::Raw).unwrap()["capsuleNameLocalized"],
            json!({"strDB": [
                {"localeString": "en_US", "str": "T", "default": false, "note": "x"},
                {"localeString": "de_DE", "str": 7, "default": "true"},
            ]})
        );
        assert_eq!(
            doc.project(LocaleMode::Flatten).unwrap()["capsuleNameLocalized"],
            json!("7")
        );
    }

    #[test]
    fn test_field_list_attributes_are_not_controls() {
        let doc = ManifestDocument::parse(
            br#"<definition>
                <authorApp>aefx</authorApp>
                <capsuleNameLocalized>x</capsuleNameLocalized>
                <clientControls version="1">
                    <clientControl id="a" type="text"><uiName>A</uiName></clientControl>
                    <clientControl id="b" type="color"><uiName>B</uiName></clientControl>
                </clientControls>
            </definition>"#,
            ManifestFormat::Xml,
        )
        .unwrap();
        let ids: Vec<_> = doc.fields().iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let doc = ManifestDocument::parse(
            br#"<definition>
                <authorApp>aefx</authorApp>
                <capsuleNameLocalized>x</capsuleNameLocalized>
                <clientControls version="1"/>
            </definition>"#,
            ManifestFormat::Xml,
        )
        .unwrap();
        assert!(doc.fields().is_empty());
    }

    #[test]
    fn test_empty_control_element_still_fails() {
        let err = ManifestDocument::parse(
            br#"<definition>
                <authorApp>aefx</authorApp>
                <capsuleNameLocalized>x</capsuleNameLocalized>
                <clientControls>
                    <clientControl id="a" type="text"><uiName>A</uiName></clientControl>
                    <clientControl/>
                </clientControls>
            </definition>"#,
            ManifestFormat::Xml,
        )
        .unwrap_err();
        assert!(
            matches!(err, ManifestError::UnexpectedShape { ref path, .. } if path == "clientControls[1]"),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_single_menu_item_is_not_an_array() {
        let menu = |items: &str| {
            format!(
                r#"<definition>
                    <authorApp>aefx</authorApp>
                    <capsuleNameLocalized>x</capsuleNameLocalized>
                    <clientControls>
                        <clientControl id="m" type="dropdown"><uiName>M</uiName><menuItems>{items}</menuItems></clientControl>
                    </clientControls>
                </definition>"#
            )
        };

        let one = ManifestDocument::parse(menu("<item>One</item>").as_bytes(), ManifestFormat::Xml)
            .unwrap();
        assert_eq!(
            one.project_fields(LocaleMode::Flatten).unwrap()[0]["menuItems"],
            json!({"item": "One"})
        );

        let two = ManifestDocument::parse(
            menu("<item>One</item><item>Two</item>").as_bytes(),
            ManifestFormat::Xml,
        )
        .unwrap();
        assert_eq!(
            two.project_fields(LocaleMode::Flatten).unwrap()[0]["menuItems"],
            json!({"item": ["One", "Two"]})
        );
    }

    #[test]
    fn test_repeated_identity_children_do_not_replace_attributes() {
        let doc = ManifestDocument::parse(
            br#"<definition>
                <authorApp>aefx</authorApp>
                <capsuleNameLocalized>x</capsuleNameLocalized>
                <clientControls>
                    <clientControl id="a" type="text"><id>b</id><uiName>A</uiName></clientControl>
                </clientControls>
            </definition>"#,
            ManifestFormat::Xml,
        )
        .unwrap();

        let field = &doc.fields()[0];
        assert_eq!(field.id(), "a");
        assert_eq!(field.property("id"), Some(&Node::string("b")));

        let projected = field.project(LocaleMode::Flatten).unwrap();
        assert_eq!(projected["id"], json!("a"));
        assert_eq!(projected.as_object().map(|o| o.len()), Some(4));
    }

    #[test]
    fn test_json_with_bom() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(
            br#"{"authorApp": "x", "capsuleNameLocalized": "Plain", "clientControls": []}"#,
        );
        let doc = ManifestDocument::parse(&bytes, ManifestFormat::Json).unwrap();
        assert!(!doc.is_after_effects());
        assert!(!doc.is_premiere());
        assert!(doc.fields().is_empty());
    }

    #[test]
    fn test_missing_nodes_fail() {
        let err = ManifestDocument::parse(
            b"<definition><authorApp>aefx</authorApp><clientControls/></definition>",
            ManifestFormat::Xml,
        )
        .unwrap_err();
        assert!(
            matches!(err, ManifestError::MissingNode { ref path } if path == CAPSULE_NAME),
            "{:?}",
            err
        );

        let err = ManifestDocument::parse(
            b"<definition><authorApp>aefx</authorApp><capsuleNameLocalized>x</capsuleNameLocalized></definition>",
            ManifestFormat::Xml,
        )
        .unwrap_err();
        assert!(
            matches!(err, ManifestError::MissingNode { ref path } if path == CLIENT_CONTROLS),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_field_without_ui_name_fails() {
        let err = ManifestDocument::parse(
            br#"<definition>
                <authorApp>aefx</authorApp>
                <capsuleNameLocalized>x</capsuleNameLocalized>
                <clientControls><clientControl id="a" type="text"/></clientControls>
            </definition>"#,
            ManifestFormat::Xml,
        )
        .unwrap_err();
        assert!(
            matches!(err, ManifestError::MissingNode { ref path } if path == "clientControls[0]/uiName"),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_invalid_can_animate_fails() {
        let err = ManifestDocument::parse(
            br#"{"authorApp": "aefx", "capsuleNameLocalized": "x",
                 "clientControls": [{"id": "a", "type": "text", "uiName": "A", "canAnimate": "maybe"}]}"#,
            ManifestFormat::Json,
        )
        .unwrap_err();
        assert!(
            matches!(err, ManifestError::InvalidBool { ref value, .. } if value == "maybe"),
            "{:?}",
            err
        );
    }
}
