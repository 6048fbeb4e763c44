//! Document → graph decoder.
//!
//! Mirror image of the encoder. A first-occurrence node allocates its shell
//! in the arena and records `id → handle` before any of its payload is
//! decoded, then fills the shell in place; a back-reference anywhere below
//! (including inside the shell's own payload) resolves to that handle.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, trace};

use crate::error::DecodeError;
use crate::graph::{Date, Fields, Graph, Instance, MapEntries, ObjRef, Object, SetEntries, Value};
use crate::node::{TaggedNode, TAG_DATE, TAG_MAP, TAG_OBJECT, TAG_SET};
use crate::registry::{Registry, Resolver};

/// A decoded document: the arena holding its objects plus the root value.
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    pub graph: Graph,
    pub root: Value,
}

/// Parses and decodes a document into a fresh graph.
pub fn decode(text: &str, overrides: Option<&Registry>) -> Result<Decoded, DecodeError> {
    let mut graph = Graph::new();
    let root = decode_into(&mut graph, text, overrides)?;
    Ok(Decoded { graph, root })
}

/// Parses and decodes a document into an existing graph.
///
/// On failure the graph is left exactly as it was.
pub fn decode_into(
    graph: &mut Graph,
    text: &str,
    overrides: Option<&Registry>,
) -> Result<Value, DecodeError> {
    let tree = parse(text)?;
    decode_value(graph, &tree, overrides)
}

/// Every object level takes two JSON levels (node and payload), so long
/// chains outgrow serde_json's default nesting limit. Depth is bounded by
/// the calling thread's stack instead.
fn parse(text: &str) -> Result<JsonValue, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let tree = JsonValue::deserialize(&mut de)?;
    de.end()?;
    Ok(tree)
}

/// Decodes an already parsed JSON value tree.
pub fn decode_value(
    graph: &mut Graph,
    tree: &JsonValue,
    overrides: Option<&Registry>,
) -> Result<Value, DecodeError> {
    let mark = graph.len();
    let mut decoder = Decoder {
        graph,
        resolver: Resolver::new(overrides),
        resolved: HashMap::new(),
    };
    match decoder.decode(tree) {
        Ok(root) => {
            debug!(objects = decoder.resolved.len(), "decoded object graph");
            Ok(root)
        }
        Err(err) => {
            decoder.graph.truncate(mark);
            Err(err)
        }
    }
}

struct Decoder<'a, 'r> {
    graph: &'a mut Graph,
    resolver: Resolver<'r>,
    resolved: HashMap<u64, ObjRef>,
}

impl Decoder<'_, '_> {
    fn decode(&mut self, value: &JsonValue) -> Result<Value, DecodeError> {
        Ok(match value {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.clone()),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.decode(item))
                    .collect::<Result<_, _>>()?,
            ),
            JsonValue::Object(map) => self.decode_node(map)?,
        })
    }

    fn decode_node(&mut self, map: &Map<String, JsonValue>) -> Result<Value, DecodeError> {
        let node = TaggedNode::parse(map)?;
        if node.tag == TAG_DATE {
            return decode_date(&node);
        }
        let Some(payload) = node.payload else {
            return self
                .resolved
                .get(&node.id)
                .map(|r| Value::Ref(*r))
                .ok_or_else(|| DecodeError::DanglingReference {
                    tag: node.tag.to_string(),
                    id: node.id,
                });
        };
        if node.id == 0 {
            return Err(node.malformed("first occurrence requires a positive id"));
        }
        if self.resolved.contains_key(&node.id) {
            return Err(node.malformed("id already has a first occurrence"));
        }
        trace!(tag = node.tag, id = node.id, "first occurrence");

        match node.tag {
            TAG_OBJECT => {
                let props = payload
                    .as_object()
                    .ok_or_else(|| node.malformed("object payload must be a JSON object"))?;
                let shell = self.shell(&node, Object::Plain(Fields::new()));
                self.assign_all(shell, props)?;
                Ok(Value::Ref(shell))
            }
            TAG_MAP => {
                let pairs = payload
                    .as_array()
                    .ok_or_else(|| node.malformed("map payload must be an array"))?;
                let shell =
                    self.shell(&node, Object::Map(MapEntries::with_capacity(pairs.len())));
                for pair in pairs {
                    let (key, value) = match pair.as_array().map(Vec::as_slice) {
                        Some([key, value]) => (key, value),
                        _ => return Err(node.malformed("map entry must be a [key, value] pair")),
                    };
                    let key = self.decode(key)?;
                    let value = self.decode(value)?;
                    if let Some(Object::Map(entries)) = self.graph.get_mut(shell) {
                        entries.insert(key, value);
                    }
                }
                Ok(Value::Ref(shell))
            }
            TAG_SET => {
                let members = payload
                    .as_array()
                    .ok_or_else(|| node.malformed("set payload must be an array"))?;
                let shell =
                    self.shell(&node, Object::Set(SetEntries::with_capacity(members.len())));
                for member in members {
                    let member = self.decode(member)?;
                    if let Some(Object::Set(entries)) = self.graph.get_mut(shell) {
                        entries.insert(member);
                    }
                }
                Ok(Value::Ref(shell))
            }
            tag => self.decode_instance(&node, tag, payload),
        }
    }

    fn decode_instance(
        &mut self,
        node: &TaggedNode<'_>,
        tag: &str,
        payload: &JsonValue,
    ) -> Result<Value, DecodeError> {
        let binding = self
            .resolver
            .binding(tag)
            .cloned()
            .ok_or_else(|| DecodeError::UnknownClassTag {
                tag: tag.to_string(),
                id: node.id,
            })?;
        let shell = self.shell(
            node,
            Object::Instance(Instance::new(binding.class(), Fields::new())),
        );
        let props: Cow<'_, Map<String, JsonValue>> = match binding.hooks() {
            Some(hooks) => {
                let props = (hooks.from_payload)(payload).map_err(|source| DecodeError::Hook {
                    tag: tag.to_string(),
                    id: node.id,
                    source,
                })?;
                Cow::Owned(props)
            }
            None => {
                let props = payload
                    .as_object()
                    .ok_or_else(|| node.malformed("instance payload must be a JSON object"))?;
                if let Some(fields) = self.graph.get_mut(shell).and_then(Object::fields_mut) {
                    *fields = binding.construct();
                }
                Cow::Borrowed(props)
            }
        };
        self.assign_all(shell, &props)?;
        Ok(Value::Ref(shell))
    }

    /// Allocates an unpopulated object and makes it resolvable by id.
    fn shell(&mut self, node: &TaggedNode<'_>, object: Object) -> ObjRef {
        let r = self.graph.alloc(object);
        self.resolved.insert(node.id, r);
        r
    }

    fn assign_all(
        &mut self,
        shell: ObjRef,
        props: &Map<String, JsonValue>,
    ) -> Result<(), DecodeError> {
        for (key, raw) in props {
            let value = self.decode(raw)?;
            self.graph.set_field(shell, key.clone(), value);
        }
        Ok(())
    }
}

fn decode_date(node: &TaggedNode<'_>) -> Result<Value, DecodeError> {
    let payload = node
        .payload
        .ok_or_else(|| node.malformed("date node requires a payload"))?;
    let millis = match payload.as_i64() {
        Some(ms) => ms,
        None => payload
            .as_f64()
            .ok_or_else(|| node.malformed("date payload must be a number"))
            .and_then(|ms| float_millis(node, ms))?,
    };
    Ok(Value::Date(Date::from_millis(millis)))
}

fn float_millis(node: &TaggedNode<'_>, ms: f64) -> Result<i64, DecodeError> {
    // i64::MAX as f64 rounds up to 2^63, hence the exclusive upper bound.
    if (i64::MIN as f64..i64::MAX as f64).contains(&ms) {
        Ok(ms.trunc() as i64)
    } else {
        Err(node.malformed("date payload is out of range"))
    }
}
