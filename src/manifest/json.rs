use serde_json::Value;

use crate::err::ManifestError;
use crate::node::Node;

/// Reads a JSON manifest into a tree.
pub(super) fn read_json(bytes: &[u8]) -> Result<Node, ManifestError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ManifestError::EmptyDocument);
    }

    let value: Value = serde_json::from_slice(bytes)?;
    from_value("", value)
}

fn from_value(path: &str, value: Value) -> Result<Node, ManifestError> {
    match value {
        Value::Object(map) => {
            let children = map
                .into_iter()
                .map(|(key, value)| {
                    let child = from_value(&join(path, &key), value)?;
                    Ok((key, child))
                })
                .collect::<Result<Vec<_>, ManifestError>>()?;
            Node::from_children(path, children)
        }
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| from_value(&format!("{path}[{i}]"), item))
            .collect::<Result<Vec<_>, _>>()
            .map(Node::List),
        scalar => Ok(Node::Value(scalar)),
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_owned()
    } else {
        format!("{path}/{key}")
    }
}
