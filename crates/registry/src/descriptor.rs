//! Per-type resource metadata with explicit accessor tables.
//!
//! Accessors are typed closures erased at registration time; lookups at
//! serialization time are plain table walks.

#![forbid(unsafe_code)]

use std::any::{self, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::anyhow;
use japi_params::RequestContext;
use serde::Serialize;
use serde_json::Value;

use crate::{peel, DomainObject, Node};

type IdFn = Box<dyn Fn(&dyn Any) -> anyhow::Result<String> + Send + Sync>;
type AttributeFn = Box<dyn Fn(&dyn Any, &RequestContext) -> anyhow::Result<Value> + Send + Sync>;
type RelationFn = Box<dyn Fn(&dyn Any, &RequestContext) -> anyhow::Result<Related> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Objects returned by a relationship accessor.
pub enum Related {
    One(Option<Node>),
    Many(Vec<Node>),
}

impl Related {
    pub fn nodes(&self) -> &[Node] {
        match self {
            Related::One(n) => n.as_slice(),
            Related::Many(ns) => ns,
        }
    }
}

pub struct AttributeDef {
    name: String,
    accessor: AttributeFn,
}

impl AttributeDef {
    pub fn name(&self) -> &str { &self.name }

    pub fn read(&self, obj: &dyn DomainObject, ctx: &RequestContext) -> anyhow::Result<Value> {
        (self.accessor)(peel(obj).as_any(), ctx)
    }
}

pub struct RelationshipDef {
    name: String,
    cardinality: Cardinality,
    target: String,
    accessor: RelationFn,
}

impl RelationshipDef {
    pub fn name(&self) -> &str { &self.name }
    pub fn cardinality(&self) -> Cardinality { self.cardinality }
    /// Declared target type name. Linkage uses the related object's own type.
    pub fn target(&self) -> &str { &self.target }

    pub fn read(&self, obj: &dyn DomainObject, ctx: &RequestContext) -> anyhow::Result<Related> {
        (self.accessor)(peel(obj).as_any(), ctx)
    }
}

/// Static metadata for one domain type. Immutable once registered.
pub struct ResourceDescriptor {
    kind: String,
    domain_type: TypeId,
    /// `Arc<T>`, for objects handed over already shared.
    shared_type: TypeId,
    domain_type_name: &'static str,
    id: IdFn,
    attributes: Vec<AttributeDef>,
    relationships: Vec<RelationshipDef>,
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("kind", &self.kind)
            .field("domain_type", &self.domain_type_name)
            .field("attributes", &self.attributes.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("relationships", &self.relationships.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl ResourceDescriptor {
    /// Start describing `T` under the internal type name `kind`.
    pub fn builder<T, F>(kind: &str, id: F) -> DescriptorBuilder<T>
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        let id_fn: IdFn = Box::new(move |obj: &dyn Any| Ok::<_, anyhow::Error>(id(downcast::<T>(obj)?)));
        DescriptorBuilder {
            inner: ResourceDescriptor {
                kind: kind.to_string(),
                domain_type: TypeId::of::<T>(),
                shared_type: TypeId::of::<Arc<T>>(),
                domain_type_name: any::type_name::<T>(),
                id: id_fn,
                attributes: Vec::new(),
                relationships: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// Internal (snake_case) type name.
    pub fn kind(&self) -> &str { &self.kind }
    pub fn domain_type(&self) -> TypeId { self.domain_type }
    pub(crate) fn shared_type(&self) -> TypeId { self.shared_type }
    pub fn domain_type_name(&self) -> &'static str { self.domain_type_name }
    pub fn attributes(&self) -> &[AttributeDef] { &self.attributes }
    pub fn relationships(&self) -> &[RelationshipDef] { &self.relationships }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn id_of(&self, obj: &dyn DomainObject) -> anyhow::Result<String> {
        (self.id)(peel(obj).as_any())
    }
}

pub struct DescriptorBuilder<T> {
    inner: ResourceDescriptor,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> DescriptorBuilder<T> {
    /// Context-aware, fallible attribute.
    pub fn attribute<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&T, &RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.inner.attributes.push(AttributeDef {
            name: name.to_string(),
            accessor: Box::new(move |obj: &dyn Any, ctx: &RequestContext| f(downcast::<T>(obj)?, ctx)),
        });
        self
    }

    /// Plain projection of a serializable value.
    pub fn field<V, F>(self, name: &str, f: F) -> Self
    where
        V: Serialize,
        F: Fn(&T) -> V + Send + Sync + 'static,
    {
        self.attribute(name, move |t, _| Ok(serde_json::to_value(f(t))?))
    }

    pub fn has_one<F>(mut self, name: &str, target: &str, f: F) -> Self
    where
        F: Fn(&T, &RequestContext) -> anyhow::Result<Option<Node>> + Send + Sync + 'static,
    {
        self.inner.relationships.push(RelationshipDef {
            name: name.to_string(),
            cardinality: Cardinality::One,
            target: target.to_string(),
            accessor: Box::new(move |obj: &dyn Any, ctx: &RequestContext| Ok::<_, anyhow::Error>(Related::One(f(downcast::<T>(obj)?, ctx)?))),
        });
        self
    }

    pub fn has_many<F>(mut self, name: &str, target: &str, f: F) -> Self
    where
        F: Fn(&T, &RequestContext) -> anyhow::Result<Vec<Node>> + Send + Sync + 'static,
    {
        self.inner.relationships.push(RelationshipDef {
            name: name.to_string(),
            cardinality: Cardinality::Many,
            target: target.to_string(),
            accessor: Box::new(move |obj: &dyn Any, ctx: &RequestContext| Ok::<_, anyhow::Error>(Related::Many(f(downcast::<T>(obj)?, ctx)?))),
        });
        self
    }

    pub fn build(self) -> ResourceDescriptor { self.inner }
}

fn downcast<T: Any>(obj: &dyn Any) -> anyhow::Result<&T> {
    obj.downcast_ref::<T>()
        .or_else(|| obj.downcast_ref::<Arc<T>>().map(|shared| &**shared))
        .ok_or_else(|| anyhow!("descriptor for {} applied to another type", any::type_name::<T>()))
}
