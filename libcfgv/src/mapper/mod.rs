//! Conversion between trees and typed records.
//!
//! Each record type describes its fields once through [`Configurable::schema`].
//! The [`Registry`] keeps those tables alongside scalar codecs and the
//! concrete types known for polymorphic fields; a [`Mapper`] walks a tree
//! against them.
//!
//! Decoding is partial: a field whose path is absent from the tree keeps its
//! default. Encoding skips fields whose getter returns `None`.

mod registry;
mod schema;

pub use registry::{Codec, Registry};
pub use schema::{
    Configurable, Descriptor, Element, Field, FieldKind, FieldMeta, Schema, Target, TypeKey,
};

use crate::error::{Error, Result};
use crate::value::ValueNode;
use registry::{RecordEntry, Subtype};
use std::any::{type_name, Any, TypeId};
use tracing::{debug, trace};

/// Key under which collection elements are written.
pub const COLLECTION_KEY: &str = "item";

/// Default limit on record nesting while decoding or encoding.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Element handling for one collection.
#[derive(Clone, Copy)]
enum Slot {
    Scalar(TypeKey),
    Record(TypeKey),
}

impl From<Element> for Slot {
    fn from(element: Element) -> Self {
        match element {
            Element::Scalar(ty) => Slot::Scalar(ty),
            Element::Record(desc) => Slot::Record(desc.key),
        }
    }
}

/// Concrete type chosen for a nested field.
enum Resolved<'r> {
    Record(&'r RecordEntry),
    Subtype(&'r Subtype, &'r RecordEntry),
}

/// Walks trees against the schemas of a [`Registry`].
#[derive(Debug, Clone, Copy)]
pub struct Mapper<'r> {
    registry: &'r Registry,
    max_depth: usize,
}

impl Mapper<'static> {
    /// Mapper over the process-wide registry.
    pub fn global() -> Self {
        Mapper::new(Registry::global())
    }
}

impl<'r> Mapper<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Decode a record from `node`.
    pub fn decode<T: Configurable>(&self, node: &ValueNode) -> Result<T> {
        debug!(record = T::NAME, "decoding record");
        self.decode_record(node, 0)
    }

    /// Encode a record into a new tree.
    pub fn encode<T: Configurable>(&self, value: &T) -> Result<ValueNode> {
        debug!(record = T::NAME, "encoding record");
        self.encode_record(value, 0)
    }

    /// Decode a homogeneous list from `node`; all children must share one key.
    pub fn decode_list<E: 'static>(&self, node: &ValueNode) -> Result<Vec<E>> {
        let slot = self.slot_of::<E>()?;
        debug!(element = type_name::<E>(), "decoding list");
        self.decode_items(slot, node, 0)?
            .into_iter()
            .map(|item| {
                item.downcast::<E>()
                    .map(|e| *e)
                    .map_err(|_| Error::UnsupportedType(type_name::<E>()))
            })
            .collect()
    }

    /// Encode a list as repeated [`COLLECTION_KEY`] children.
    pub fn encode_list<E: 'static>(&self, items: &[E]) -> Result<ValueNode> {
        let slot = self.slot_of::<E>()?;
        debug!(element = type_name::<E>(), count = items.len(), "encoding list");
        let items: Vec<&dyn Any> = items.iter().map(|e| e as &dyn Any).collect();
        self.encode_items(slot, &items, 0)
    }

    fn slot_of<E: 'static>(&self) -> Result<Slot> {
        let key = TypeKey::of::<E>();
        if self.registry.has_codec(key.id) {
            Ok(Slot::Scalar(key))
        } else if self.registry.has_record(key.id) {
            Ok(Slot::Record(key))
        } else {
            Err(Error::UnsupportedType(key.name))
        }
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            return Err(Error::TooDeep(self.max_depth, String::new()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Decode
    // ------------------------------------------------------------------

    pub(crate) fn decode_record<T: Configurable>(&self, node: &ValueNode, depth: usize) -> Result<T> {
        self.check_depth(depth)?;
        let entry = self.registry.record_for(TypeKey::of::<T>())?;
        let schema = entry.schema::<T>()?;
        let mut record = T::default();

        for field in &schema.fields {
            let Some(source) = field.source(node)? else {
                trace!(record = T::NAME, field = field.name, "field absent, keeping default");
                continue;
            };
            match &field.kind {
                FieldKind::Scalar { ty, set, .. } => {
                    set(&mut record, self.decode_scalar(*ty, source)?)?;
                }
                FieldKind::Nested { target, set, .. } => {
                    let resolved = self.resolve_name(field, *target, node)?;
                    set(&mut record, self.decode_resolved(resolved, source, depth)?)?;
                }
                FieldKind::Collection { element, set, .. } => {
                    set(&mut record, self.decode_items((*element).into(), source, depth)?)?;
                }
            }
        }
        Ok(record)
    }

    /// A single token is decoded unquoted; several tokens are decoded from
    /// the raw scalar so embedded whitespace survives.
    fn decode_scalar(&self, ty: TypeKey, source: &ValueNode) -> Result<Box<dyn Any>> {
        let tokens = source.tokens()?;
        let text = match tokens {
            [single] => single.raw().unwrap_or_default(),
            _ => source.raw().unwrap_or_default(),
        };
        self.registry.decode_erased(ty, text)
    }

    fn decode_resolved(
        &self,
        resolved: Resolved<'_>,
        source: &ValueNode,
        depth: usize,
    ) -> Result<Box<dyn Any>> {
        match resolved {
            Resolved::Record(entry) => (entry.decode)(self, source, depth + 1),
            Resolved::Subtype(subtype, entry) => {
                subtype.upcast((entry.decode)(self, source, depth + 1)?)
            }
        }
    }

    fn decode_items(&self, slot: Slot, node: &ValueNode, depth: usize) -> Result<Vec<Box<dyn Any>>> {
        collection_values(node)?
            .iter()
            .map(|value| match slot {
                Slot::Scalar(ty) => self.decode_scalar(ty, value),
                Slot::Record(key) => (self.registry.record_for(key)?.decode)(self, value, depth + 1),
            })
            .collect()
    }

    /// Pick the concrete type of a nested field. The discriminator path is
    /// read relative to the record holding the field.
    fn resolve_name<T>(
        &self,
        field: &Field<T>,
        target: Target,
        record: &ValueNode,
    ) -> Result<Resolved<'r>> {
        let type_name = match &field.meta.discriminator {
            Some(path) => match record.get_by_path(path)? {
                Some(node) => node.tokens()?.first().and_then(|t| t.raw()).map(String::from),
                None => None,
            },
            None => None,
        };

        let Some(type_name) = type_name else {
            return match target {
                Target::Record(desc) => Ok(Resolved::Record(self.registry.record_for(desc.key)?)),
                Target::Base(_) => Err(Error::MissingTypeName(field.name.to_string())),
            };
        };
        trace!(field = field.name, type_name = %type_name, "resolving concrete type");

        if let Some(key) = field.meta.aliased(&type_name) {
            return self
                .assignable(target, key.id)
                .ok_or(Error::TypeNotFound(type_name));
        }

        if self.registry.name_scan() {
            if let Target::Record(desc) = target {
                if desc.name.eq_ignore_ascii_case(&type_name) {
                    return Ok(Resolved::Record(self.registry.record_for(desc.key)?));
                }
            }
            let found = self
                .registry
                .subtypes_of(target.key().id)
                .find(|s| s.name.eq_ignore_ascii_case(&type_name));
            if let Some(subtype) = found {
                let entry = self.registry.record_for(subtype.concrete)?;
                return Ok(Resolved::Subtype(subtype, entry));
            }
        }

        Err(Error::TypeNotFound(type_name))
    }

    /// `id` as a concrete type for `target`, if it is one.
    fn assignable(&self, target: Target, id: TypeId) -> Option<Resolved<'r>> {
        if let Target::Record(desc) = target {
            if desc.key.id == id {
                return self.registry.record_for(desc.key).ok().map(Resolved::Record);
            }
        }
        let subtype = self
            .registry
            .subtypes_of(target.key().id)
            .find(|s| s.concrete.id == id)?;
        let entry = self.registry.record_for(subtype.concrete).ok()?;
        Some(Resolved::Subtype(subtype, entry))
    }

    // ------------------------------------------------------------------
    // Encode
    // ------------------------------------------------------------------

    pub(crate) fn encode_record<T: Configurable>(&self, value: &T, depth: usize) -> Result<ValueNode> {
        self.check_depth(depth)?;
        let entry = self.registry.record_for(TypeKey::of::<T>())?;
        let schema = entry.schema::<T>()?;
        let mut tree = ValueNode::new();

        for field in &schema.fields {
            match &field.kind {
                FieldKind::Scalar { ty, get, .. } => {
                    let Some(v) = get(value) else { continue };
                    let text = self.registry.encode_erased(*ty, v)?;
                    field.store(&mut tree, ValueNode::scalar(text))?;
                }
                FieldKind::Nested { target, get, .. } => {
                    let Some(v) = get(value) else { continue };
                    // An open base can only be decoded back through its type name.
                    if matches!(target, Target::Base(_)) && field.meta.discriminator.is_none() {
                        return Err(Error::MissingTypeName(field.name.to_string()));
                    }
                    let (name, inner) = self.encode_nested(&field.meta, *target, v, depth)?;
                    if let Some(discriminator) = &field.meta.discriminator {
                        tree.set_by_path(discriminator, ValueNode::scalar(name))?;
                    }
                    field.store(&mut tree, inner)?;
                }
                FieldKind::Collection { element, get, .. } => {
                    let Some(items) = get(value) else { continue };
                    let list = self.encode_items((*element).into(), &items, depth)?;
                    field.store(&mut tree, list)?;
                }
            }
        }
        Ok(tree)
    }

    /// Encode a nested value and return the type name to write at the
    /// discriminator: the field's alias for the concrete type, else its
    /// lowercased simple name.
    fn encode_nested(
        &self,
        meta: &FieldMeta,
        target: Target,
        value: &dyn Any,
        depth: usize,
    ) -> Result<(String, ValueNode)> {
        match target {
            Target::Record(desc) => {
                let entry = self.registry.record_for(desc.key)?;
                let name = type_label(meta, desc.key.id, desc.name);
                Ok((name, (entry.encode)(self, value, depth + 1)?))
            }
            Target::Base(base) => {
                for subtype in self.registry.subtypes_of(base.id) {
                    if let Some(concrete) = subtype.downcast(value) {
                        let entry = self.registry.record_for(subtype.concrete)?;
                        let name = type_label(meta, subtype.concrete.id, subtype.name);
                        return Ok((name, (entry.encode)(self, concrete, depth + 1)?));
                    }
                }
                Err(Error::TypeNameNotFound(base.name))
            }
        }
    }

    fn encode_items(&self, slot: Slot, items: &[&dyn Any], depth: usize) -> Result<ValueNode> {
        let mut list = ValueNode::new();
        for item in items {
            let node = match slot {
                Slot::Scalar(ty) => ValueNode::scalar(self.registry.encode_erased(ty, *item)?),
                Slot::Record(key) => (self.registry.record_for(key)?.encode)(self, *item, depth + 1)?,
            };
            list.set(COLLECTION_KEY, node);
        }
        Ok(list)
    }
}

fn type_label(meta: &FieldMeta, id: TypeId, name: &str) -> String {
    meta.alias_for(id)
        .map(String::from)
        .unwrap_or_else(|| name.to_lowercase())
}

/// Values of a collection node: the children under its only key.
fn collection_values(node: &ValueNode) -> Result<&[ValueNode]> {
    match node.keys().as_slice() {
        [] => Ok(&[]),
        [key] => Ok(node.get_all(key)),
        keys => Err(Error::MixedCollection(
            keys.iter().map(|k| k.to_string()).collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::parse;

    #[derive(Debug, Default, PartialEq)]
    struct Limits {
        depth: u32,
        label: Option<String>,
    }

    impl Configurable for Limits {
        const NAME: &'static str = "Limits";

        fn schema() -> Schema<Self> {
            Schema::new(vec![
                Field::scalar("depth", |l: &Limits| Some(&l.depth), |l, v| l.depth = v),
                Field::scalar("label", |l: &Limits| l.label.as_ref(), |l, v| l.label = Some(v)),
            ])
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Job {
        name: String,
        limits: Limits,
        tags: Vec<String>,
    }

    impl Configurable for Job {
        const NAME: &'static str = "Job";

        fn schema() -> Schema<Self> {
            Schema::new(vec![
                Field::scalar("name", |j: &Job| Some(&j.name), |j, v| j.name = v),
                Field::nested("limits", |j: &Job| Some(&j.limits), |j, v| j.limits = v),
                Field::scalars("tags", |j: &Job| Some(&j.tags), |j, v| j.tags = v),
            ])
        }
    }

    fn registry() -> Registry {
        Registry::new().record::<Job>()
    }

    #[test]
    fn test_record_registers_dependencies() {
        let registry = registry();
        assert!(registry.has_record(TypeId::of::<Job>()));
        assert!(registry.has_record(TypeId::of::<Limits>()));
    }

    #[test]
    fn test_decode_partial() {
        let registry = registry();
        let tree = parse("name \"nightly build\"\nlimits\n  depth 4\n").unwrap();
        let job: Job = Mapper::new(&registry).decode(&tree).unwrap();
        assert_eq!(job.name, "nightly build");
        assert_eq!(job.limits.depth, 4);
        assert_eq!(job.limits.label, None);
        assert!(job.tags.is_empty());
    }

    #[test]
    fn test_decode_multi_token_scalar_keeps_raw() {
        let registry = registry();
        let tree = parse("name nightly  build").unwrap();
        let job: Job = Mapper::new(&registry).decode(&tree).unwrap();
        assert_eq!(job.name, "nightly  build");
    }

    #[test]
    fn test_encode_skips_none() {
        let registry = registry();
        let job = Job {
            name: "a b".into(),
            limits: Limits { depth: 2, label: None },
            tags: vec!["x".into(), "y z".into()],
        };
        let tree = Mapper::new(&registry).encode(&job).unwrap();
        assert_eq!(
            crate::encode(&tree),
            "name \"a b\"\nlimits\n  depth 2\ntags\n  item x\n  item \"y z\"\n"
        );
        let back: Job = Mapper::new(&registry).decode(&tree).unwrap();
        assert_eq!(back, job);
    }

    #[derive(Debug, Default, PartialEq)]
    struct Ports {
        port: u16,
        port2: u16,
    }

    impl Configurable for Ports {
        const NAME: &'static str = "Ports";

        fn schema() -> Schema<Self> {
            Schema::new(vec![
                Field::scalar("port", |p: &Ports| Some(&p.port), |p, v| p.port = v),
                Field::scalar("port2", |p: &Ports| Some(&p.port2), |p, v| p.port2 = v),
            ])
        }
    }

    #[test]
    fn test_field_names_with_digits_are_keys() {
        let registry = Registry::new().record::<Ports>();
        let mapper = Mapper::new(&registry);
        let ports = Ports { port: 1, port2: 2 };
        let tree = mapper.encode(&ports).unwrap();
        assert_eq!(crate::encode(&tree), "port 1\nport2 2\n");
        assert_eq!(mapper.decode::<Ports>(&tree).unwrap(), ports);
    }

    #[test]
    fn test_scalar_parse_error() {
        let registry = registry();
        let tree = parse("limits\n  depth deep").unwrap();
        let err = Mapper::new(&registry).decode::<Job>(&tree).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_mixed_collection() {
        let registry = registry();
        let tree = parse("tags\n  item a\n  other b").unwrap();
        let err = Mapper::new(&registry).decode::<Job>(&tree).unwrap_err();
        assert!(matches!(err, Error::MixedCollection(_)));
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_list_entry_points() {
        let registry = registry();
        let mapper = Mapper::new(&registry);
        let tree = mapper.encode_list(&[3u16, 1, 2]).unwrap();
        assert_eq!(crate::encode(&tree), "item 3\nitem 1\nitem 2\n");
        assert_eq!(mapper.decode_list::<u16>(&tree).unwrap(), vec![3, 1, 2]);

        let any_key = parse("value 7\nvalue 8").unwrap();
        assert_eq!(mapper.decode_list::<u16>(&any_key).unwrap(), vec![7, 8]);
        assert!(mapper.decode_list::<u16>(&ValueNode::new()).unwrap().is_empty());
    }

    #[test]
    fn test_unregistered_type() {
        let registry = Registry::new();
        let err = Mapper::new(&registry)
            .decode::<Job>(&ValueNode::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);

        #[derive(Debug)]
        struct Opaque;
        let err = Mapper::new(&registry)
            .decode_list::<Opaque>(&ValueNode::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    }

    #[test]
    fn test_depth_limit() {
        let registry = registry();
        let tree = parse("limits\n  depth 1").unwrap();
        let err = Mapper::new(&registry)
            .with_max_depth(0)
            .decode::<Job>(&tree)
            .unwrap_err();
        assert!(matches!(err, Error::TooDeep(0, _)));
    }
}
