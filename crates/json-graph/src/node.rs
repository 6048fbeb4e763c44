//! Tagged Node wire shape.
//!
//! ```json
//! { "c": "Point", "i": 1, "v": { "x": 1, "y": 2 } }   // first occurrence
//! { "c": "Point", "i": 1 }                            // back-reference
//! { "c": "Date", "i": 0, "v": 1700000000000 }         // date, never shared
//! ```
//!
//! Arrays are never wrapped in a node.

use serde_json::{Map, Value as JsonValue};

use crate::error::DecodeError;

pub const TAG_OBJECT: &str = "Object";
pub const TAG_MAP: &str = "Map";
pub const TAG_SET: &str = "Set";
pub const TAG_DATE: &str = "Date";

pub const TAG_KEY: &str = "c";
pub const ID_KEY: &str = "i";
pub const PAYLOAD_KEY: &str = "v";

/// Tags handled by the codec itself; never valid as class tags.
pub fn is_builtin_tag(tag: &str) -> bool {
    matches!(tag, TAG_OBJECT | TAG_MAP | TAG_SET | TAG_DATE)
}

pub(crate) fn first_occurrence(tag: &str, id: u64, payload: JsonValue) -> JsonValue {
    let mut node = Map::with_capacity(3);
    node.insert(TAG_KEY.into(), JsonValue::String(tag.to_string()));
    node.insert(ID_KEY.into(), JsonValue::from(id));
    node.insert(PAYLOAD_KEY.into(), payload);
    JsonValue::Object(node)
}

pub(crate) fn back_reference(tag: &str, id: u64) -> JsonValue {
    let mut node = Map::with_capacity(2);
    node.insert(TAG_KEY.into(), JsonValue::String(tag.to_string()));
    node.insert(ID_KEY.into(), JsonValue::from(id));
    JsonValue::Object(node)
}

/// Borrowed view of a parsed node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaggedNode<'a> {
    pub tag: &'a str,
    /// `0` when the `i` field is absent.
    pub id: u64,
    pub payload: Option<&'a JsonValue>,
}

impl<'a> TaggedNode<'a> {
    /// Checks the envelope fields. Payload shape is left to the decoder,
    /// which knows what each tag expects.
    pub fn parse(map: &'a Map<String, JsonValue>) -> Result<Self, DecodeError> {
        let tag = match map.get(TAG_KEY) {
            Some(JsonValue::String(tag)) => tag.as_str(),
            Some(_) => return Err(malformed(None, None, "tag must be a string")),
            None => return Err(malformed(None, None, "missing tag")),
        };
        let id = match map.get(ID_KEY) {
            Some(raw) => raw
                .as_u64()
                .ok_or_else(|| malformed(Some(tag), None, "id must be a non-negative integer"))?,
            None => 0,
        };
        let payload = map.get(PAYLOAD_KEY);
        if payload.is_none() && id == 0 {
            return Err(malformed(
                Some(tag),
                None,
                "node has neither a payload nor an id",
            ));
        }
        Ok(Self { tag, id, payload })
    }

    pub fn is_back_reference(&self) -> bool {
        self.payload.is_none()
    }

    pub(crate) fn malformed(&self, reason: &'static str) -> DecodeError {
        malformed(Some(self.tag), Some(self.id), reason)
    }
}

fn malformed(tag: Option<&str>, id: Option<u64>, reason: &'static str) -> DecodeError {
    DecodeError::MalformedNode {
        tag: tag.map(str::to_string),
        id,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: &JsonValue) -> Result<TaggedNode<'_>, DecodeError> {
        TaggedNode::parse(value.as_object().unwrap())
    }

    #[test]
    fn builds_nodes_in_wire_order() {
        let first = first_occurrence("Point", 1, json!({"x": 1}));
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            r#"{"c":"Point","i":1,"v":{"x":1}}"#
        );
        let back = back_reference("Point", 1);
        assert_eq!(serde_json::to_string(&back).unwrap(), r#"{"c":"Point","i":1}"#);
    }

    #[test]
    fn parses_first_occurrence_and_back_reference() {
        let first = json!({"c": "Object", "i": 4, "v": {}});
        let node = parse(&first).unwrap();
        assert_eq!(node.tag, "Object");
        assert_eq!(node.id, 4);
        assert!(!node.is_back_reference());

        let back = json!({"c": "Object", "i": 4});
        assert!(parse(&back).unwrap().is_back_reference());
    }

    #[test]
    fn date_node_may_omit_id() {
        let date = json!({"c": "Date", "v": 0});
        let node = parse(&date).unwrap();
        assert_eq!(node.id, 0);
        assert_eq!(node.payload, Some(&json!(0)));
    }

    #[test]
    fn rejects_bad_envelopes() {
        let cases = [
            (json!({"i": 1, "v": {}}), "missing tag"),
            (json!({"c": 7, "i": 1, "v": {}}), "tag must be a string"),
            (json!({"c": "Object", "i": -1, "v": {}}), "id must be a non-negative integer"),
            (json!({"c": "Object", "i": "1"}), "id must be a non-negative integer"),
            (json!({"c": "Object"}), "node has neither a payload nor an id"),
            (json!({"c": "Object", "i": 0}), "node has neither a payload nor an id"),
        ];
        for (value, expected) in cases {
            match parse(&value) {
                Err(DecodeError::MalformedNode { reason, .. }) => {
                    assert_eq!(reason, expected, "case {value}")
                }
                other => panic!("expected malformed node for {value}, got {other:?}"),
            }
        }
    }

    #[test]
    fn builtin_tags() {
        assert!(is_builtin_tag("Object"));
        assert!(is_builtin_tag("Date"));
        assert!(!is_builtin_tag("Point"));
        assert!(!is_builtin_tag("object"));
    }
}
