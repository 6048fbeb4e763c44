//! Arena-backed object graph.
//!
//! Keyed objects (plain objects, maps, sets, class instances) live in a
//! [`Graph`] arena and are addressed by [`ObjRef`] handles. A handle is the
//! identity of its object: two [`Value::Ref`]s pointing at the same handle
//! are the same object, which is what the codec preserves across a round
//! trip. Cycles are plain handle loops.

pub mod equal;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use indexmap::{IndexMap, IndexSet};
use serde_json::Number;

/// Property map of a plain object or class instance, in insertion order.
pub type Fields = IndexMap<String, Value>;

/// Handle of a keyed object inside a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(usize);

impl ObjRef {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Timestamp value, milliseconds since the Unix epoch.
///
/// Dates are values, not objects: they are never interned and two equal
/// dates are indistinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Date(i64);

impl Date {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    /// Converts a system time, saturating at the `i64` millisecond range.
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Self(i64::try_from(after.as_millis()).unwrap_or(i64::MAX)),
            Err(before) => Self(
                i64::try_from(before.duration().as_millis())
                    .map(|ms| -ms)
                    .unwrap_or(i64::MIN),
            ),
        }
    }

    pub fn to_system_time(self) -> SystemTime {
        let offset = Duration::from_millis(self.0.unsigned_abs());
        if self.0 >= 0 {
            UNIX_EPOCH + offset
        } else {
            UNIX_EPOCH - offset
        }
    }
}

/// A value in the graph.
///
/// Equality and hashing are structural for scalars and arrays and by handle
/// for [`Value::Ref`], which is what map keys and set members need.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Ordered sequence. Arrays are owned, so they have no identity of their
    /// own and are never shared between two properties.
    Array(Vec<Value>),
    Date(Date),
    Ref(ObjRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_obj(&self) -> Option<ObjRef> {
        match self {
            Value::Ref(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

/// Non-finite floats have no JSON form and become `Null`.
impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Date> for Value {
    fn from(d: Date) -> Self {
        Value::Date(d)
    }
}

impl From<ObjRef> for Value {
    fn from(r: ObjRef) -> Self {
        Value::Ref(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

/// Instance of a registered class.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Runtime type name, mapped to a wire tag by the registry.
    pub class: String,
    pub fields: Fields,
}

impl Instance {
    pub fn new(class: impl Into<String>, fields: Fields) -> Self {
        Self {
            class: class.into(),
            fields,
        }
    }
}

/// Ordered map container. Keys are arbitrary values; re-inserting an existing
/// key replaces its value and keeps its position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapEntries(IndexMap<Value, Value>);

impl MapEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    /// Returns the previous value stored under `key`.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        self.0.insert(key, value)
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.0.get(key)
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Value, Value> {
        self.0.iter()
    }
}

impl FromIterator<(Value, Value)> for MapEntries {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Ordered set container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetEntries(IndexSet<Value>);

impl SetEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexSet::with_capacity(capacity))
    }

    /// Returns `false` if the value was already present.
    pub fn insert(&mut self, value: Value) -> bool {
        self.0.insert(value)
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0.contains(value)
    }

    pub fn remove(&mut self, value: &Value) -> bool {
        self.0.shift_remove(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, Value> {
        self.0.iter()
    }
}

impl FromIterator<Value> for SetEntries {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A keyed object stored in the arena.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Plain(Fields),
    Map(MapEntries),
    Set(SetEntries),
    Instance(Instance),
}

impl Object {
    /// Property map of a plain object or instance.
    pub fn fields(&self) -> Option<&Fields> {
        match self {
            Object::Plain(fields) => Some(fields),
            Object::Instance(inst) => Some(&inst.fields),
            _ => None,
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut Fields> {
        match self {
            Object::Plain(fields) => Some(fields),
            Object::Instance(inst) => Some(&mut inst.fields),
            _ => None,
        }
    }
}

/// Arena of keyed objects.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    objects: Vec<Object>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Moves `object` into the arena and returns its handle.
    pub fn alloc(&mut self, object: Object) -> ObjRef {
        let index = self.objects.len();
        self.objects.push(object);
        ObjRef(index)
    }

    pub fn plain(&mut self, fields: Fields) -> ObjRef {
        self.alloc(Object::Plain(fields))
    }

    pub fn map(&mut self, entries: MapEntries) -> ObjRef {
        self.alloc(Object::Map(entries))
    }

    pub fn set(&mut self, entries: SetEntries) -> ObjRef {
        self.alloc(Object::Set(entries))
    }

    pub fn instance(&mut self, class: impl Into<String>, fields: Fields) -> ObjRef {
        self.alloc(Object::Instance(Instance::new(class, fields)))
    }

    pub fn get(&self, r: ObjRef) -> Option<&Object> {
        self.objects.get(r.index())
    }

    pub fn get_mut(&mut self, r: ObjRef) -> Option<&mut Object> {
        self.objects.get_mut(r.index())
    }

    /// Reads one property of a plain object or instance.
    pub fn field(&self, r: ObjRef, key: &str) -> Option<&Value> {
        self.get(r)?.fields()?.get(key)
    }

    /// Sets one property of a plain object or instance. Returns `false` when
    /// `r` is not a keyed object with properties.
    pub fn set_field(&mut self, r: ObjRef, key: impl Into<String>, value: Value) -> bool {
        match self.get_mut(r).and_then(Object::fields_mut) {
            Some(fields) => {
                fields.insert(key.into(), value);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjRef, &Object)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(i, obj)| (ObjRef(i), obj))
    }

    /// Drops every object allocated after the arena had `len` objects.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.objects.truncate(len);
    }
}
