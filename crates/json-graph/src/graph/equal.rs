//! Structural equality across two graphs.
//!
//! Two values are equal when they have the same shape and the same leaves,
//! and when their object handles can be paired one-to-one: if `a` reaches
//! the same object twice, `b` must reach one object at the same two places.
//! Cycles are handled by pairing handles before descending.

use std::collections::HashMap;

use super::{Fields, Graph, ObjRef, Object, Value};

/// Deep, identity-aware comparison of `a` in `graph_a` with `b` in `graph_b`.
pub fn deep_equal(graph_a: &Graph, a: &Value, graph_b: &Graph, b: &Value) -> bool {
    Matcher {
        graph_a,
        graph_b,
        forward: HashMap::new(),
        backward: HashMap::new(),
    }
    .values(a, b)
}

struct Matcher<'g> {
    graph_a: &'g Graph,
    graph_b: &'g Graph,
    forward: HashMap<ObjRef, ObjRef>,
    backward: HashMap<ObjRef, ObjRef>,
}

impl Matcher<'_> {
    fn values(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => x == y,
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Date(x), Value::Date(y)) => x == y,
            (Value::Array(xs), Value::Array(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| self.values(x, y))
            }
            (Value::Ref(x), Value::Ref(y)) => self.refs(*x, *y),
            _ => false,
        }
    }

    fn refs(&mut self, a: ObjRef, b: ObjRef) -> bool {
        match (self.forward.get(&a), self.backward.get(&b)) {
            (Some(paired_b), Some(paired_a)) => return *paired_b == b && *paired_a == a,
            (None, None) => {}
            _ => return false,
        }
        self.forward.insert(a, b);
        self.backward.insert(b, a);
        let (graph_a, graph_b) = (self.graph_a, self.graph_b);
        let (Some(obj_a), Some(obj_b)) = (graph_a.get(a), graph_b.get(b)) else {
            return false;
        };
        self.objects(obj_a, obj_b)
    }

    fn objects(&mut self, a: &Object, b: &Object) -> bool {
        match (a, b) {
            (Object::Plain(x), Object::Plain(y)) => self.fields(x, y),
            (Object::Instance(x), Object::Instance(y)) => {
                x.class == y.class && self.fields(&x.fields, &y.fields)
            }
            (Object::Map(x), Object::Map(y)) => {
                x.len() == y.len()
                    && x.iter()
                        .zip(y.iter())
                        .all(|((ka, va), (kb, vb))| self.values(ka, kb) && self.values(va, vb))
            }
            (Object::Set(x), Object::Set(y)) => {
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(ma, mb)| self.values(ma, mb))
            }
            _ => false,
        }
    }

    fn fields(&mut self, a: &Fields, b: &Fields) -> bool {
        if a.len() != b.len() {
            return false;
        }
        for (key, va) in a {
            match b.get(key) {
                Some(vb) => {
                    if !self.values(va, vb) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}
