//! Decoded response tree
//!
//! A response body has no fixed schema at this layer, so it is decoded into a
//! tagged tree. Accessors fail with [`NodeError`] instead of handing back a
//! silent default.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use thiserror::Error;

/// One node of a decoded XML response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Text content of an element without child elements
    Leaf(String),
    /// Repeated sibling elements sharing one tag name, in document order
    List(Vec<Node>),
    /// Child elements in document order, keyed by tag name
    Object(Vec<(String, Node)>),
}

/// Errors raised by the typed accessors on [`Node`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("field not found: {path}")]
    FieldNotFound { path: String },

    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl Node {
    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Leaf(_) => "leaf",
            Node::List(_) => "list",
            Node::Object(_) => "object",
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Look up a direct child without failing
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Object(fields) => fields.iter().find(|(name, _)| name == key).map(|(_, n)| n),
            _ => None,
        }
    }

    /// Look up a direct child of an object node
    pub fn field(&self, key: &str) -> Result<&Node, NodeError> {
        self.step(key, key)
    }

    /// Follow a dotted path such as `ResponseParameters.Applicant.0.f4indexno`
    ///
    /// Numeric segments index into lists. A numeric segment of `0` applied to
    /// a non-list node selects the node itself, since a tag that appears once
    /// decodes to a single node rather than a one-element list.
    pub fn path(&self, path: &str) -> Result<&Node, NodeError> {
        let mut current = self;
        let mut walked = String::new();
        for segment in path.split('.') {
            if !walked.is_empty() {
                walked.push('.');
            }
            walked.push_str(segment);
            current = current.step(segment, &walked)?;
        }
        Ok(current)
    }

    fn step(&self, segment: &str, walked: &str) -> Result<&Node, NodeError> {
        if let Ok(index) = segment.parse::<usize>() {
            return match self {
                Node::List(items) => items.get(index).ok_or_else(|| NodeError::FieldNotFound {
                    path: walked.to_string(),
                }),
                other if index == 0 => Ok(other),
                _ => Err(NodeError::FieldNotFound {
                    path: walked.to_string(),
                }),
            };
        }

        match self {
            Node::Object(_) => self.get(segment).ok_or_else(|| NodeError::FieldNotFound {
                path: walked.to_string(),
            }),
            other => Err(NodeError::TypeMismatch {
                path: walked.to_string(),
                expected: "object",
                found: other.kind(),
            }),
        }
    }

    /// Text of a leaf node
    pub fn as_str(&self) -> Result<&str, NodeError> {
        match self {
            Node::Leaf(text) => Ok(text),
            other => Err(NodeError::TypeMismatch {
                path: String::new(),
                expected: "leaf",
                found: other.kind(),
            }),
        }
    }

    /// Text of the leaf at `path`
    pub fn text(&self, path: &str) -> Result<&str, NodeError> {
        match self.path(path)? {
            Node::Leaf(text) => Ok(text),
            other => Err(NodeError::TypeMismatch {
                path: path.to_string(),
                expected: "leaf",
                found: other.kind(),
            }),
        }
    }

    /// Text of the leaf at `path`, or `None` when the field is absent
    pub fn opt_text(&self, path: &str) -> Result<Option<&str>, NodeError> {
        match self.text(path) {
            Ok(text) => Ok(Some(text)),
            Err(NodeError::FieldNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn as_list(&self) -> Result<&[Node], NodeError> {
        match self {
            Node::List(items) => Ok(items),
            other => Err(NodeError::TypeMismatch {
                path: String::new(),
                expected: "list",
                found: other.kind(),
            }),
        }
    }

    pub fn as_object(&self) -> Result<&[(String, Node)], NodeError> {
        match self {
            Node::Object(fields) => Ok(fields),
            other => Err(NodeError::TypeMismatch {
                path: String::new(),
                expected: "object",
                found: other.kind(),
            }),
        }
    }

    /// The node viewed as a sequence: list items, or the node itself
    ///
    /// Useful for tags that may appear once or many times.
    pub fn items(&self) -> &[Node] {
        match self {
            Node::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Leaf(text) => serializer.serialize_str(text),
            Node::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str) -> Node {
        Node::Leaf(text.to_string())
    }

    fn sample() -> Node {
        Node::Object(vec![(
            "ResponseParameters".to_string(),
            Node::Object(vec![
                ("Status".to_string(), leaf("OK")),
                (
                    "Applicant".to_string(),
                    Node::List(vec![leaf("first"), leaf("second")]),
                ),
            ]),
        )])
    }

    #[test]
    fn test_path_lookup() {
        let tree = sample();
        assert_eq!(tree.text("ResponseParameters.Status").unwrap(), "OK");
        assert_eq!(tree.text("ResponseParameters.Applicant.1").unwrap(), "second");
        assert_eq!(tree.text("ResponseParameters.Status.0").unwrap(), "OK");
    }

    #[test]
    fn test_missing_field_is_reported_with_path() {
        let tree = sample();
        let err = tree.path("ResponseParameters.Missing").unwrap_err();
        assert_eq!(
            err,
            NodeError::FieldNotFound {
                path: "ResponseParameters.Missing".to_string()
            }
        );
        assert_eq!(tree.opt_text("ResponseParameters.Missing").unwrap(), None);
    }

    #[test]
    fn test_type_mismatch() {
        let tree = sample();
        let err = tree.text("ResponseParameters.Applicant").unwrap_err();
        assert!(matches!(
            err,
            NodeError::TypeMismatch { expected: "leaf", found: "list", .. }
        ));
        let err = tree.path("ResponseParameters.Status.Inner").unwrap_err();
        assert!(matches!(
            err,
            NodeError::TypeMismatch { expected: "object", found: "leaf", .. }
        ));
    }

    #[test]
    fn test_items_normalizes_single_and_repeated() {
        let tree = sample();
        assert_eq!(tree.path("ResponseParameters.Applicant").unwrap().items().len(), 2);
        assert_eq!(tree.path("ResponseParameters.Status").unwrap().items().len(), 1);
    }

    #[test]
    fn test_serializes_as_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["ResponseParameters"]["Status"], "OK");
        assert_eq!(json["ResponseParameters"]["Applicant"][0], "first");
    }
}
