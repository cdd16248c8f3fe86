//! Resource type registry.
//!
//! Maps a domain object's runtime type to its `ResourceDescriptor`. Filled
//! during process start, then shared read-only (typically behind an `Arc`)
//! by every request; lookups take no locks.

#![forbid(unsafe_code)]

use std::any::{Any, TypeId};
use std::sync::Arc;

use japi_core::{CodecError, CodecResult, KeyCase, ResourceIdentifier};
use rustc_hash::FxHashMap;
use tracing::debug;

pub mod descriptor;

pub use descriptor::{AttributeDef, Cardinality, DescriptorBuilder, Related, RelationshipDef, ResourceDescriptor};

/// Anything that can sit in a domain graph handed to the codec.
pub trait DomainObject: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> DomainObject for T {
    fn as_any(&self) -> &dyn Any { self }
    fn type_name(&self) -> &'static str { std::any::type_name::<T>() }
}

/// Shared handle to a domain object.
pub type Node = Arc<dyn DomainObject>;

/// Wrap a domain object. An `Arc<T>` the caller already holds may be passed
/// as is; lookups resolve it to `T`.
pub fn node<T: Any + Send + Sync>(value: T) -> Node { Arc::new(value) }

/// Strip `Node` layers so lookups see the object itself.
pub(crate) fn peel(mut obj: &dyn DomainObject) -> &dyn DomainObject {
    while let Some(inner) = obj.as_any().downcast_ref::<Node>() {
        obj = inner.as_ref();
    }
    obj
}

#[derive(Debug, Default)]
pub struct ResourceTypeRegistry {
    by_type: FxHashMap<TypeId, ResourceDescriptor>,
    by_kind: FxHashMap<String, TypeId>,
    /// `Arc<T>` -> `T`.
    shared: FxHashMap<TypeId, TypeId>,
}

impl ResourceTypeRegistry {
    pub fn new() -> Self { Self::default() }

    /// Associate a descriptor with its domain type. Each domain type and each
    /// type name may be registered once; names that only differ in `_` vs `-`
    /// count as the same name.
    pub fn register(&mut self, descriptor: ResourceDescriptor) -> CodecResult<()> {
        let ty = descriptor.domain_type();
        let wire = KeyCase::Dash.to_wire(descriptor.kind());
        if self.by_type.contains_key(&ty) || self.by_kind.keys().any(|k| KeyCase::Dash.to_wire(k) == wire) {
            return Err(CodecError::DuplicateRegistration(descriptor.kind().to_string()));
        }
        debug!(kind = descriptor.kind(), domain_type = descriptor.domain_type_name(), "registered resource type");
        self.by_kind.insert(descriptor.kind().to_string(), ty);
        self.shared.insert(descriptor.shared_type(), ty);
        self.by_type.insert(ty, descriptor);
        Ok(())
    }

    /// Chaining form of `register` for startup code.
    pub fn with(mut self, descriptor: ResourceDescriptor) -> CodecResult<Self> {
        self.register(descriptor)?;
        Ok(self)
    }

    /// Freeze for sharing across requests.
    pub fn into_shared(self) -> Arc<Self> { Arc::new(self) }

    pub fn describe(&self, obj: &dyn DomainObject) -> CodecResult<&ResourceDescriptor> {
        let obj = peel(obj);
        let ty = obj.as_any().type_id();
        let ty = self.shared.get(&ty).copied().unwrap_or(ty);
        self.by_type.get(&ty).ok_or_else(|| CodecError::UnregisteredType(obj.type_name().to_string()))
    }

    pub fn describe_type<T: Any>(&self) -> Option<&ResourceDescriptor> {
        self.by_type.get(&TypeId::of::<T>())
    }

    pub fn by_kind(&self, kind: &str) -> Option<&ResourceDescriptor> {
        self.by_kind.get(kind).and_then(|ty| self.by_type.get(ty))
    }

    /// Descriptor plus internal `{type, id}` of one object.
    pub fn identify(&self, obj: &dyn DomainObject) -> CodecResult<(&ResourceDescriptor, ResourceIdentifier)> {
        let descriptor = self.describe(obj)?;
        let id = descriptor.id_of(obj).map_err(|source| CodecError::Accessor {
            kind: descriptor.kind().to_string(),
            id: String::new(),
            field: "id".to_string(),
            source,
        })?;
        Ok((descriptor, ResourceIdentifier::new(descriptor.kind(), id)))
    }

    pub fn len(&self) -> usize { self.by_type.len() }
    pub fn is_empty(&self) -> bool { self.by_type.is_empty() }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.by_kind.keys().map(String::as_str)
    }
}
