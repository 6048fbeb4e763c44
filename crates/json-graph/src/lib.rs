//! json-graph - identity-preserving JSON codec for object graphs.
//!
//! Encodes a possibly cyclic, possibly aliased [`Graph`] into a tree of
//! tagged JSON nodes and decodes it back, so that:
//!
//! - two properties pointing at the same object still point at one object;
//! - cycles come back as cycles;
//! - maps, sets, dates and registered class instances keep their kind.
//!
//! ```
//! use json_graph::{decode, encode, ClassBinding, Fields, Graph, Registry, Value};
//!
//! let registry = Registry::new()
//!     .with("Point", ClassBinding::new("geo::Point"))
//!     .unwrap();
//!
//! let mut graph = Graph::new();
//! let p = graph.instance("geo::Point", Fields::from_iter([
//!     ("x".to_string(), Value::from(1)),
//!     ("y".to_string(), Value::from(2)),
//! ]));
//! let root = graph.plain(Fields::from_iter([
//!     ("a".to_string(), Value::from(p)),
//!     ("b".to_string(), Value::from(p)),
//! ]));
//!
//! let text = encode(&graph, &root.into(), Some(&registry)).unwrap();
//! let out = decode(&text, Some(&registry)).unwrap();
//!
//! let root = out.root.as_obj().unwrap();
//! assert_eq!(out.graph.field(root, "a"), out.graph.field(root, "b"));
//! ```
//!
//! Arrays are written inline and have no identity of their own.

pub mod decode;
pub mod encode;
pub mod error;
pub mod graph;
pub mod node;
pub mod registry;

pub use decode::{decode, decode_into, decode_value, Decoded};
pub use encode::{encode, encode_to_value, encode_with_options, EncodeOptions};
pub use error::{DecodeError, EncodeError, HookError, RegistryError};
pub use graph::equal::deep_equal;
pub use graph::{Date, Fields, Graph, Instance, MapEntries, ObjRef, Object, SetEntries, Value};
pub use registry::{
    global_registry, register_type, unregister_type, ClassBinding, Hooks, Registry,
};
