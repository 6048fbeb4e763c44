//! Class registry: maps wire tags to class bindings.
//!
//! Two layers take part in every encode/decode call:
//!
//! - the process-wide registry, filled through [`register_type`] during
//!   startup;
//! - an optional call-scoped [`Registry`] passed directly to the call, which
//!   shadows the process-wide one for that call only.
//!
//! Lookup order for a tag is call-scoped hook, call-scoped constructor,
//! process-wide hook, process-wide constructor. Hooks and constructor of one
//! layer live in the same [`ClassBinding`], so the first layer that knows the
//! tag wins and its hook is preferred over its constructor.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::error::{HookError, RegistryError};
use crate::graph::{Fields, Graph, Instance};
use crate::node::is_builtin_tag;

/// Produces the initial fields of an empty instance.
pub type Constructor = Arc<dyn Fn() -> Fields + Send + Sync>;

/// Produces the payload properties of an instance on encode.
pub type ToPayload = Arc<dyn Fn(&Graph, &Instance) -> Result<Fields, HookError> + Send + Sync>;

/// Turns a raw wire payload into the raw properties of a new instance.
pub type FromPayload =
    Arc<dyn Fn(&JsonValue) -> Result<Map<String, JsonValue>, HookError> + Send + Sync>;

/// Custom payload conversion for one class.
///
/// `to_payload` output is encoded like ordinary fields, and `from_payload`
/// output is decoded like an ordinary payload, so both may carry references
/// and nested nodes.
#[derive(Clone)]
pub struct Hooks {
    pub to_payload: ToPayload,
    pub from_payload: FromPayload,
}

impl Hooks {
    pub fn new<T, F>(to_payload: T, from_payload: F) -> Self
    where
        T: Fn(&Graph, &Instance) -> Result<Fields, HookError> + Send + Sync + 'static,
        F: Fn(&JsonValue) -> Result<Map<String, JsonValue>, HookError> + Send + Sync + 'static,
    {
        Self {
            to_payload: Arc::new(to_payload),
            from_payload: Arc::new(from_payload),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

/// Everything the codec needs to know about one class.
#[derive(Clone)]
pub struct ClassBinding {
    class: String,
    constructor: Constructor,
    hooks: Option<Hooks>,
}

impl ClassBinding {
    /// Binding for instances whose [`Instance::class`] is `class`, with a
    /// constructor producing no fields and no hooks.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            constructor: Arc::new(Fields::new),
            hooks: None,
        }
    }

    pub fn with_constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> Fields + Send + Sync + 'static,
    {
        self.constructor = Arc::new(constructor);
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn construct(&self) -> Fields {
        (self.constructor)()
    }

    pub fn hooks(&self) -> Option<&Hooks> {
        self.hooks.as_ref()
    }
}

impl fmt::Debug for ClassBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBinding")
            .field("class", &self.class)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

/// One registry layer: tag → binding, plus the reverse class → tag index.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    bindings: HashMap<String, ClassBinding>,
    tags_by_class: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `binding` under `tag`, replacing any previous binding for
    /// that tag. The class of the latest registration maps back to `tag`.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        binding: ClassBinding,
    ) -> Result<&mut Self, RegistryError> {
        let tag = tag.into();
        if is_builtin_tag(&tag) {
            return Err(RegistryError::ReservedTag(tag));
        }
        if let Some(previous) = self.bindings.remove(&tag) {
            self.forget_class(&previous.class, &tag);
        }
        self.tags_by_class
            .insert(binding.class.clone(), tag.clone());
        self.bindings.insert(tag, binding);
        Ok(self)
    }

    /// Builder form of [`Registry::register`].
    pub fn with(
        mut self,
        tag: impl Into<String>,
        binding: ClassBinding,
    ) -> Result<Self, RegistryError> {
        self.register(tag, binding)?;
        Ok(self)
    }

    pub fn unregister(&mut self, tag: &str) -> Option<ClassBinding> {
        let binding = self.bindings.remove(tag)?;
        self.forget_class(&binding.class, tag);
        Some(binding)
    }

    pub fn get(&self, tag: &str) -> Option<&ClassBinding> {
        self.bindings.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.bindings.contains_key(tag)
    }

    /// Reverse lookup: the tag instances of `class` are written under.
    pub fn tag_for_class(&self, class: &str) -> Option<&str> {
        self.tags_by_class.get(class).map(String::as_str)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn forget_class(&mut self, class: &str, tag: &str) {
        if self.tags_by_class.get(class).map(String::as_str) != Some(tag) {
            return;
        }
        self.tags_by_class.remove(class);
        // Another tag may still be bound to the same class.
        if let Some((other, _)) = self.bindings.iter().find(|(_, b)| b.class == class) {
            self.tags_by_class.insert(class.to_string(), other.clone());
        }
    }
}

// Copy-on-write: calls hold an `Arc` snapshot, writers swap in a new version.
static GLOBAL_REGISTRY: LazyLock<RwLock<Arc<Registry>>> = LazyLock::new(Default::default);

/// Registers a class in the process-wide registry.
///
/// Meant for startup. Calls already in flight keep the registry they started
/// with.
pub fn register_type(tag: impl Into<String>, binding: ClassBinding) -> Result<(), RegistryError> {
    let tag = tag.into();
    let class = binding.class.clone();
    let mut guard = GLOBAL_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::make_mut(&mut guard).register(tag.clone(), binding)?;
    debug!(%tag, %class, "registered class binding");
    Ok(())
}

/// Removes a tag from the process-wide registry.
pub fn unregister_type(tag: &str) -> Option<ClassBinding> {
    let mut guard = GLOBAL_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    let removed = Arc::make_mut(&mut guard).unregister(tag);
    if removed.is_some() {
        debug!(%tag, "unregistered class binding");
    }
    removed
}

/// Snapshot of the process-wide registry.
pub fn global_registry() -> Arc<Registry> {
    GLOBAL_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Layered view used by one encode/decode call.
pub(crate) struct Resolver<'a> {
    overrides: Option<&'a Registry>,
    global: Arc<Registry>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(overrides: Option<&'a Registry>) -> Self {
        Self {
            overrides,
            global: global_registry(),
        }
    }

    pub(crate) fn binding(&self, tag: &str) -> Option<&ClassBinding> {
        self.overrides
            .and_then(|r| r.get(tag))
            .or_else(|| self.global.get(tag))
    }

    /// A process-wide tag only counts while it still decodes back to `class`
    /// through this resolver, i.e. the overrides don't rebind it.
    pub(crate) fn tag_for_class(&self, class: &str) -> Option<&str> {
        if let Some(tag) = self.overrides.and_then(|r| r.tag_for_class(class)) {
            return Some(tag);
        }
        let tag = self.global.tag_for_class(class)?;
        match self.binding(tag) {
            Some(binding) if binding.class() == class => Some(tag),
            _ => None,
        }
    }
}
