//! Field tables describing how a Rust type maps onto a tree.

use crate::error::{Error, Result};
use crate::mapper::Registry;
use crate::value::{normalize_key, ValueNode};
use std::any::{type_name, Any, TypeId};

/// A type that can be decoded from and encoded into a tree.
///
/// `schema` is called once, when the type is registered.
///
/// ```ignore
/// #[derive(Default)]
/// struct Server {
///     host: String,
///     port: u16,
/// }
///
/// impl Configurable for Server {
///     const NAME: &'static str = "Server";
///
///     fn schema() -> Schema<Self> {
///         Schema::new(vec![
///             Field::scalar("host", |s: &Server| Some(&s.host), |s, v| s.host = v),
///             Field::scalar("port", |s: &Server| Some(&s.port), |s, v| s.port = v),
///         ])
///     }
/// }
/// ```
pub trait Configurable: Default + 'static {
    /// Simple type name, matched case-insensitively by discriminators.
    const NAME: &'static str;

    fn schema() -> Schema<Self>;
}

/// Identity of a Rust type as seen by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeKey {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

/// Descriptor of a [`Configurable`] type referenced by a field.
#[derive(Clone, Copy)]
pub struct Descriptor {
    pub key: TypeKey,
    pub name: &'static str,
    pub(crate) register: fn(&mut Registry),
}

impl Descriptor {
    pub fn of<T: Configurable>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            name: T::NAME,
            register: Registry::register_record::<T>,
        }
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("key", &self.key)
            .field("name", &self.name)
            .finish()
    }
}

/// Declared type of a nested field.
#[derive(Debug, Clone, Copy)]
pub enum Target {
    /// A concrete record type.
    Record(Descriptor),
    /// An open base type (usually a boxed trait object) whose concrete
    /// types are registered as subtypes.
    Base(TypeKey),
}

impl Target {
    pub fn key(&self) -> TypeKey {
        match self {
            Target::Record(desc) => desc.key,
            Target::Base(key) => *key,
        }
    }
}

/// Element type of a collection field.
#[derive(Debug, Clone, Copy)]
pub enum Element {
    Scalar(TypeKey),
    Record(Descriptor),
}

/// Per-field metadata: path override, discriminator path and alias table.
#[derive(Debug, Clone, Default)]
pub struct FieldMeta {
    pub path: Option<String>,
    pub discriminator: Option<String>,
    pub aliases: Vec<(String, TypeKey)>,
}

impl FieldMeta {
    /// Alias registered for the concrete type `id`.
    pub fn alias_for(&self, id: TypeId) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(_, key)| key.id == id)
            .map(|(name, _)| name.as_str())
    }

    /// Type registered under alias `name` (case-insensitive).
    pub fn aliased(&self, name: &str) -> Option<TypeKey> {
        self.aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, key)| *key)
    }
}

type Getter<T> = Box<dyn Fn(&T) -> Option<&dyn Any> + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, Box<dyn Any>) -> Result<()> + Send + Sync>;
type ItemsGetter<T> = Box<dyn Fn(&T) -> Option<Vec<&dyn Any>> + Send + Sync>;
type ItemsSetter<T> = Box<dyn Fn(&mut T, Vec<Box<dyn Any>>) -> Result<()> + Send + Sync>;

/// How a field is read and written.
pub enum FieldKind<T> {
    Scalar {
        ty: TypeKey,
        get: Getter<T>,
        set: Setter<T>,
    },
    Nested {
        target: Target,
        get: Getter<T>,
        set: Setter<T>,
    },
    Collection {
        element: Element,
        get: ItemsGetter<T>,
        set: ItemsSetter<T>,
    },
}

/// One mapped field of `T`.
pub struct Field<T> {
    pub name: &'static str,
    pub meta: FieldMeta,
    pub kind: FieldKind<T>,
}

fn erase_get<T: 'static, F>(f: F) -> Getter<T>
where
    F: Fn(&T) -> Option<&dyn Any> + Send + Sync + 'static,
{
    Box::new(f)
}

fn erase_items<T: 'static, F>(f: F) -> ItemsGetter<T>
where
    F: Fn(&T) -> Option<Vec<&dyn Any>> + Send + Sync + 'static,
{
    Box::new(f)
}

fn getter<T: 'static, V: 'static>(get: fn(&T) -> Option<&V>) -> Getter<T> {
    erase_get(move |t: &T| get(t).map(|v| v as &dyn Any))
}

fn setter<T: 'static, V: 'static>(set: fn(&mut T, V)) -> Setter<T> {
    Box::new(move |t: &mut T, value: Box<dyn Any>| -> Result<()> {
        let value = value
            .downcast::<V>()
            .map_err(|_| Error::UnsupportedType(type_name::<V>()))?;
        set(t, *value);
        Ok(())
    })
}

fn items_getter<T: 'static, E: 'static>(get: fn(&T) -> Option<&Vec<E>>) -> ItemsGetter<T> {
    erase_items(move |t: &T| get(t).map(|items| items.iter().map(|e| e as &dyn Any).collect()))
}

fn items_setter<T: 'static, E: 'static>(set: fn(&mut T, Vec<E>)) -> ItemsSetter<T> {
    Box::new(move |t: &mut T, values: Vec<Box<dyn Any>>| -> Result<()> {
        let items = values
            .into_iter()
            .map(|v| v.downcast::<E>().map(|e| *e))
            .collect::<std::result::Result<Vec<E>, _>>()
            .map_err(|_| Error::UnsupportedType(type_name::<E>()))?;
        set(t, items);
        Ok(())
    })
}

impl<T: 'static> Field<T> {
    fn new(name: &'static str, kind: FieldKind<T>) -> Self {
        Self {
            name,
            meta: FieldMeta::default(),
            kind,
        }
    }

    /// A field decoded by the registry codec for `V`.
    pub fn scalar<V: 'static>(
        name: &'static str,
        get: fn(&T) -> Option<&V>,
        set: fn(&mut T, V),
    ) -> Self {
        Self::new(
            name,
            FieldKind::Scalar {
                ty: TypeKey::of::<V>(),
                get: getter(get),
                set: setter(set),
            },
        )
    }

    /// A nested record field.
    pub fn nested<V: Configurable>(
        name: &'static str,
        get: fn(&T) -> Option<&V>,
        set: fn(&mut T, V),
    ) -> Self {
        Self::new(
            name,
            FieldKind::Nested {
                target: Target::Record(Descriptor::of::<V>()),
                get: getter(get),
                set: setter(set),
            },
        )
    }

    /// A field of an open base type `B`; the concrete type is resolved
    /// through the discriminator and the registry's subtypes of `B`.
    pub fn polymorphic<B: 'static>(
        name: &'static str,
        get: fn(&T) -> Option<&B>,
        set: fn(&mut T, B),
    ) -> Self {
        Self::new(
            name,
            FieldKind::Nested {
                target: Target::Base(TypeKey::of::<B>()),
                get: getter(get),
                set: setter(set),
            },
        )
    }

    /// A collection of scalars.
    pub fn scalars<E: 'static>(
        name: &'static str,
        get: fn(&T) -> Option<&Vec<E>>,
        set: fn(&mut T, Vec<E>),
    ) -> Self {
        Self::new(
            name,
            FieldKind::Collection {
                element: Element::Scalar(TypeKey::of::<E>()),
                get: items_getter(get),
                set: items_setter(set),
            },
        )
    }

    /// A collection of records.
    pub fn records<E: Configurable>(
        name: &'static str,
        get: fn(&T) -> Option<&Vec<E>>,
        set: fn(&mut T, Vec<E>),
    ) -> Self {
        Self::new(
            name,
            FieldKind::Collection {
                element: Element::Record(Descriptor::of::<E>()),
                get: items_getter(get),
                set: items_setter(set),
            },
        )
    }

    /// Read the field from `path` instead of its lowercased name.
    ///
    /// Without an override the field name is a single key, so `port2` maps
    /// to the `port2` child. An override is a path expression, where digits
    /// select siblings (`port.2` and `port2` both mean the third `port`).
    pub fn path(mut self, path: &str) -> Self {
        self.meta.path = Some(normalize_key(path));
        self
    }

    /// Read the concrete type name from `path`, relative to the record.
    pub fn discriminator(mut self, path: &str) -> Self {
        self.meta.discriminator = Some(normalize_key(path));
        self
    }

    /// Map type name `name` to the concrete type `C`.
    pub fn alias<C: 'static>(mut self, name: &str) -> Self {
        self.meta
            .aliases
            .push((normalize_key(name), TypeKey::of::<C>()));
        self
    }

    /// Effective path of this field.
    pub fn resolved_path(&self) -> String {
        self.meta
            .path
            .clone()
            .unwrap_or_else(|| normalize_key(self.name))
    }

    /// The node this field is read from.
    pub(crate) fn source<'n>(&self, node: &'n ValueNode) -> Result<Option<&'n ValueNode>> {
        match &self.meta.path {
            Some(path) => node.get_by_path(path),
            None => Ok(node.get(self.name)),
        }
    }

    /// Write `value` where [`Field::source`] reads it, merging into a node
    /// that is already there.
    pub(crate) fn store(&self, tree: &mut ValueNode, value: ValueNode) -> Result<()> {
        match &self.meta.path {
            Some(path) => tree.set_by_path(path, value),
            None => {
                match tree.get_mut(self.name, 0) {
                    Some(existing) => existing.merge(value),
                    None => tree.set(self.name, value),
                }
                Ok(())
            }
        }
    }
}

/// The field table of a type.
pub struct Schema<T> {
    pub fields: Vec<Field<T>>,
}

impl<T: 'static> Schema<T> {
    pub fn new(fields: Vec<Field<T>>) -> Self {
        Self { fields }
    }

    /// Descriptors of the record types this schema refers to.
    pub(crate) fn dependencies(&self) -> Vec<Descriptor> {
        self.fields
            .iter()
            .filter_map(|field| match &field.kind {
                FieldKind::Nested {
                    target: Target::Record(desc),
                    ..
                }
                | FieldKind::Collection {
                    element: Element::Record(desc),
                    ..
                } => Some(*desc),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sample {
        name: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_scalar_accessors() {
        let field = Field::scalar("name", |s: &Sample| Some(&s.name), |s, v| s.name = v);
        let FieldKind::Scalar { ty, get, set } = &field.kind else {
            panic!("expected scalar kind");
        };
        assert_eq!(ty.id, TypeId::of::<String>());
        let mut sample = Sample::default();
        set(&mut sample, Box::new(String::from("x"))).unwrap();
        assert_eq!(sample.name, "x");
        let got = get(&sample).unwrap().downcast_ref::<String>().unwrap();
        assert_eq!(got, "x");
        assert!(set(&mut sample, Box::new(5u8)).is_err());
    }

    #[test]
    fn test_collection_accessors() {
        let field = Field::scalars("tags", |s: &Sample| Some(&s.tags), |s, v| s.tags = v);
        let FieldKind::Collection { get, set, .. } = &field.kind else {
            panic!("expected collection kind");
        };
        let mut sample = Sample::default();
        set(
            &mut sample,
            vec![
                Box::new(String::from("a")) as Box<dyn Any>,
                Box::new(String::from("b")),
            ],
        )
        .unwrap();
        assert_eq!(sample.tags, vec!["a", "b"]);
        assert_eq!(get(&sample).unwrap().len(), 2);
    }

    #[test]
    fn test_meta() {
        struct Circle;
        let field = Field::scalar("Max_Depth", |s: &Sample| Some(&s.name), |s, v| s.name = v);
        assert_eq!(field.resolved_path(), "max_depth");
        let field = field.path("Limits.Depth").alias::<Circle>("Round");
        assert_eq!(field.resolved_path(), "limits.depth");
        assert_eq!(field.meta.aliased("ROUND").unwrap().id, TypeId::of::<Circle>());
        assert_eq!(field.meta.alias_for(TypeId::of::<Circle>()), Some("round"));
    }
}
