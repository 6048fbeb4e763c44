//! Property tests: random graphs with arbitrary sharing and cycles survive
//! an encode/decode round trip.

use json_graph::{
    decode, deep_equal, encode, encode_with_options, ClassBinding, Date, EncodeOptions, Fields,
    Graph, MapEntries, ObjRef, Object, Registry, SetEntries, Value,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Leaf {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Date(i64),
    List(Vec<Leaf>),
    Obj(usize),
}

#[derive(Debug, Clone)]
enum Shape {
    Plain(Vec<(String, Leaf)>),
    Map(Vec<(Leaf, Leaf)>),
    Set(Vec<Leaf>),
    Point(Leaf, Leaf),
}

fn leaf(objects: usize) -> impl Strategy<Value = Leaf> {
    let scalar = prop_oneof![
        Just(Leaf::Null),
        any::<bool>().prop_map(Leaf::Bool),
        any::<i64>().prop_map(Leaf::Int),
        "[a-z]{0,6}".prop_map(Leaf::Str),
        (-4_102_444_800_000i64..4_102_444_800_000).prop_map(Leaf::Date),
        (0..objects).prop_map(Leaf::Obj),
    ];
    scalar.prop_recursive(2, 12, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Leaf::List)
    })
}

fn shape(objects: usize) -> impl Strategy<Value = Shape> {
    prop_oneof![
        prop::collection::vec(("[a-z]{1,4}", leaf(objects)), 0..5).prop_map(Shape::Plain),
        prop::collection::vec((leaf(objects), leaf(objects)), 0..4).prop_map(Shape::Map),
        prop::collection::vec(leaf(objects), 0..4).prop_map(Shape::Set),
        (leaf(objects), leaf(objects)).prop_map(|(x, y)| Shape::Point(x, y)),
    ]
}

fn graph_layout() -> impl Strategy<Value = Vec<Shape>> {
    (1usize..8).prop_flat_map(|n| prop::collection::vec(shape(n), n))
}

fn to_value(leaf: &Leaf, handles: &[ObjRef]) -> Value {
    match leaf {
        Leaf::Null => Value::Null,
        Leaf::Bool(b) => Value::from(*b),
        Leaf::Int(n) => Value::from(*n),
        Leaf::Str(s) => Value::from(s.as_str()),
        Leaf::Date(ms) => Value::Date(Date::from_millis(*ms)),
        Leaf::List(items) => Value::Array(items.iter().map(|l| to_value(l, handles)).collect()),
        Leaf::Obj(i) => Value::Ref(handles[*i]),
    }
}

/// Allocates every shell first so any object can point at any other.
fn build(layout: &[Shape]) -> (Graph, Value) {
    let mut graph = Graph::new();
    let handles: Vec<ObjRef> = layout
        .iter()
        .map(|shape| match shape {
            Shape::Plain(_) => graph.plain(Fields::new()),
            Shape::Map(_) => graph.map(MapEntries::new()),
            Shape::Set(_) => graph.set(SetEntries::new()),
            Shape::Point(..) => graph.instance("geo::Point", Fields::new()),
        })
        .collect();
    for (shape, &r) in layout.iter().zip(&handles) {
        let filled = match shape {
            Shape::Plain(props) => Object::Plain(
                props
                    .iter()
                    .map(|(k, l)| (k.clone(), to_value(l, &handles)))
                    .collect(),
            ),
            Shape::Map(entries) => Object::Map(
                entries
                    .iter()
                    .map(|(k, v)| (to_value(k, &handles), to_value(v, &handles)))
                    .collect(),
            ),
            Shape::Set(members) => Object::Set(
                members.iter().map(|m| to_value(m, &handles)).collect(),
            ),
            Shape::Point(x, y) => {
                let mut fields = Fields::new();
                fields.insert("x".into(), to_value(x, &handles));
                fields.insert("y".into(), to_value(y, &handles));
                Object::Instance(json_graph::Instance::new("geo::Point", fields))
            }
        };
        if let Some(slot) = graph.get_mut(r) {
            *slot = filled;
        }
    }
    (graph, Value::Ref(handles[0]))
}

fn registry() -> Registry {
    Registry::new()
        .with("Point", ClassBinding::new("geo::Point"))
        .unwrap()
}

proptest! {
    #[test]
    fn random_graphs_roundtrip(layout in graph_layout()) {
        let (graph, root) = build(&layout);
        let reg = registry();
        let text = encode(&graph, &root, Some(&reg)).unwrap();
        let out = decode(&text, Some(&reg)).unwrap();
        prop_assert!(deep_equal(&graph, &root, &out.graph, &out.root), "document:\n{}", text);
        // Only reachable objects are materialized.
        prop_assert!(out.graph.len() <= graph.len());
    }

    #[test]
    fn reencoding_is_stable(layout in graph_layout()) {
        let (graph, root) = build(&layout);
        let reg = registry();
        let compact = EncodeOptions { pretty: false };
        let first = encode_with_options(&graph, &root, Some(&reg), compact).unwrap();
        let out = decode(&first, Some(&reg)).unwrap();
        let second = encode_with_options(&out.graph, &out.root, Some(&reg), compact).unwrap();
        prop_assert_eq!(first, second);
    }
}
