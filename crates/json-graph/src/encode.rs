//! Graph → document encoder.
//!
//! Walks the graph depth-first from the root. The first time a keyed object
//! is reached it gets the next id and a full node with payload; every later
//! occurrence is written as a back-reference carrying only tag and id. The
//! id is recorded before the payload is walked, which is what lets a child
//! refer back to an ancestor.

use std::collections::HashMap;

use serde_json::{Map, Value as JsonValue};
use tracing::{debug, trace};

use crate::error::EncodeError;
use crate::graph::{Fields, Graph, ObjRef, Object, Value};
use crate::node::{self, TAG_DATE, TAG_MAP, TAG_OBJECT, TAG_SET};
use crate::registry::{Registry, Resolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Two-space indented output. Compact when `false`.
    pub pretty: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Encodes `root` (and everything reachable from it) to a pretty-printed
/// document.
pub fn encode(
    graph: &Graph,
    root: &Value,
    overrides: Option<&Registry>,
) -> Result<String, EncodeError> {
    encode_with_options(graph, root, overrides, EncodeOptions::default())
}

pub fn encode_with_options(
    graph: &Graph,
    root: &Value,
    overrides: Option<&Registry>,
    options: EncodeOptions,
) -> Result<String, EncodeError> {
    let tree = encode_to_value(graph, root, overrides)?;
    let text = if options.pretty {
        serde_json::to_string_pretty(&tree)?
    } else {
        serde_json::to_string(&tree)?
    };
    Ok(text)
}

/// Encodes to a JSON value tree without printing it.
pub fn encode_to_value(
    graph: &Graph,
    root: &Value,
    overrides: Option<&Registry>,
) -> Result<JsonValue, EncodeError> {
    let mut encoder = Encoder::new(graph, overrides);
    let tree = encoder.encode(root)?;
    debug!(objects = encoder.seen.len(), "encoded object graph");
    Ok(tree)
}

struct Encoder<'a> {
    graph: &'a Graph,
    resolver: Resolver<'a>,
    seen: HashMap<ObjRef, (u64, String)>,
    next_id: u64,
}

impl<'a> Encoder<'a> {
    fn new(graph: &'a Graph, overrides: Option<&'a Registry>) -> Self {
        Self {
            graph,
            resolver: Resolver::new(overrides),
            seen: HashMap::new(),
            next_id: 1,
        }
    }

    fn encode(&mut self, value: &Value) -> Result<JsonValue, EncodeError> {
        Ok(match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => JsonValue::Number(n.clone()),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| self.encode(item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Date(d) => node::first_occurrence(TAG_DATE, 0, JsonValue::from(d.millis())),
            Value::Ref(r) => self.encode_object(*r)?,
        })
    }

    fn encode_object(&mut self, r: ObjRef) -> Result<JsonValue, EncodeError> {
        if let Some((id, tag)) = self.seen.get(&r) {
            return Ok(node::back_reference(tag, *id));
        }
        let graph = self.graph;
        let object = graph
            .get(r)
            .ok_or(EncodeError::UnknownObject { index: r.index() })?;
        let tag = self.resolve_tag(object)?;
        let id = self.next_id;
        self.next_id += 1;
        self.seen.insert(r, (id, tag.clone()));
        trace!(%tag, id, "first occurrence");

        let payload = match object {
            Object::Plain(fields) => self.encode_fields(fields)?,
            Object::Map(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key, value) in entries.iter() {
                    let key = self.encode(key)?;
                    let value = self.encode(value)?;
                    pairs.push(JsonValue::Array(vec![key, value]));
                }
                JsonValue::Array(pairs)
            }
            Object::Set(members) => JsonValue::Array(
                members
                    .iter()
                    .map(|member| self.encode(member))
                    .collect::<Result<_, _>>()?,
            ),
            Object::Instance(instance) => {
                let to_payload = self
                    .resolver
                    .binding(&tag)
                    .and_then(|binding| binding.hooks())
                    .map(|hooks| hooks.to_payload.clone());
                match to_payload {
                    Some(hook) => {
                        let fields = hook(graph, instance).map_err(|source| EncodeError::Hook {
                            tag: tag.clone(),
                            source,
                        })?;
                        self.encode_fields(&fields)?
                    }
                    None => self.encode_fields(&instance.fields)?,
                }
            }
        };
        Ok(node::first_occurrence(&tag, id, payload))
    }

    fn encode_fields(&mut self, fields: &Fields) -> Result<JsonValue, EncodeError> {
        let mut out = Map::with_capacity(fields.len());
        for (key, value) in fields {
            out.insert(key.clone(), self.encode(value)?);
        }
        Ok(JsonValue::Object(out))
    }

    fn resolve_tag(&self, object: &Object) -> Result<String, EncodeError> {
        match object {
            Object::Plain(_) => Ok(TAG_OBJECT.to_string()),
            Object::Map(_) => Ok(TAG_MAP.to_string()),
            Object::Set(_) => Ok(TAG_SET.to_string()),
            Object::Instance(instance) => self
                .resolver
                .tag_for_class(&instance.class)
                .map(str::to_string)
                .ok_or_else(|| EncodeError::UnregisteredType {
                    class: instance.class.clone(),
                }),
        }
    }
}
