//! Scalar codecs, record schemas and polymorphic subtypes.
//!
//! A [`Registry`] is built once at startup and read thereafter. It can be
//! passed to a [`Mapper`](crate::Mapper) explicitly or installed as the
//! process-wide default with [`Registry::install`].

use crate::error::{Error, Result};
use crate::mapper::schema::{Configurable, Schema, TypeKey};
use crate::mapper::Mapper;
use crate::value::{parse_bool, ValueNode};
use num_bigint::BigInt;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::trace;

static GLOBAL: OnceLock<Registry> = OnceLock::new();

type DecodeText = Box<dyn Fn(&str) -> Result<Box<dyn Any>> + Send + Sync>;
type EncodeText = Box<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;
type Upcast = Box<dyn Fn(Box<dyn Any>) -> Result<Box<dyn Any>> + Send + Sync>;
type Downcast = Box<dyn Fn(&dyn Any) -> Option<&dyn Any> + Send + Sync>;

/// Converts between scalar text and one Rust type.
pub struct Codec {
    pub key: TypeKey,
    decode: DecodeText,
    encode: EncodeText,
}

impl Codec {
    pub fn new<V: 'static>(decode: fn(&str) -> Result<V>, encode: fn(&V) -> String) -> Self {
        Self {
            key: TypeKey::of::<V>(),
            decode: Box::new(move |text: &str| decode(text).map(|v| Box::new(v) as Box<dyn Any>)),
            encode: Box::new(move |value: &dyn Any| value.downcast_ref::<V>().map(encode)),
        }
    }

    /// Codec using `FromStr` and `Display`.
    pub fn parsed<V: FromStr + fmt::Display + 'static>() -> Self {
        Self::new::<V>(parse_text::<V>, V::to_string)
    }
}

fn parse_text<V: FromStr>(text: &str) -> Result<V> {
    text.parse::<V>()
        .map_err(|_| Error::InvalidValue(text.to_string(), type_name::<V>()))
}

pub(crate) struct RecordEntry {
    pub name: &'static str,
    schema: Box<dyn Any + Send + Sync>,
    pub decode: fn(&Mapper<'_>, &ValueNode, usize) -> Result<Box<dyn Any>>,
    pub encode: fn(&Mapper<'_>, &dyn Any, usize) -> Result<ValueNode>,
}

impl RecordEntry {
    pub fn schema<T: 'static>(&self) -> Result<&Schema<T>> {
        self.schema
            .downcast_ref::<Schema<T>>()
            .ok_or(Error::UnsupportedType(type_name::<T>()))
    }
}

fn decode_record_erased<T: Configurable>(
    mapper: &Mapper<'_>,
    node: &ValueNode,
    depth: usize,
) -> Result<Box<dyn Any>> {
    mapper
        .decode_record::<T>(node, depth)
        .map(|v| Box::new(v) as Box<dyn Any>)
}

fn encode_record_erased<T: Configurable>(
    mapper: &Mapper<'_>,
    value: &dyn Any,
    depth: usize,
) -> Result<ValueNode> {
    let value = value
        .downcast_ref::<T>()
        .ok_or(Error::UnsupportedType(type_name::<T>()))?;
    mapper.encode_record(value, depth)
}

/// A concrete record type usable where a base type is declared.
pub(crate) struct Subtype {
    pub base: TypeId,
    pub concrete: TypeKey,
    pub name: &'static str,
    upcast: Upcast,
    downcast: Downcast,
}

impl Subtype {
    pub fn upcast(&self, concrete: Box<dyn Any>) -> Result<Box<dyn Any>> {
        (self.upcast)(concrete)
    }

    pub fn downcast<'a>(&self, base: &'a dyn Any) -> Option<&'a dyn Any> {
        (self.downcast)(base)
    }
}

fn erase_downcast<F>(f: F) -> Downcast
where
    F: Fn(&dyn Any) -> Option<&dyn Any> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Registered codecs, record schemas and subtypes.
pub struct Registry {
    codecs: HashMap<TypeId, Codec>,
    records: HashMap<TypeId, RecordEntry>,
    subtypes: Vec<Subtype>,
    name_scan: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Registry with codecs for strings, booleans, chars, all integer
    /// widths, floats and `BigInt`.
    pub fn new() -> Self {
        Self::empty()
            .codec(Codec::new::<String>(|s| Ok(s.to_string()), String::clone))
            .codec(Codec::new::<bool>(parse_bool, bool::to_string))
            .codec(Codec::parsed::<char>())
            .codec(Codec::parsed::<i8>())
            .codec(Codec::parsed::<i16>())
            .codec(Codec::parsed::<i32>())
            .codec(Codec::parsed::<i64>())
            .codec(Codec::parsed::<i128>())
            .codec(Codec::parsed::<isize>())
            .codec(Codec::parsed::<u8>())
            .codec(Codec::parsed::<u16>())
            .codec(Codec::parsed::<u32>())
            .codec(Codec::parsed::<u64>())
            .codec(Codec::parsed::<u128>())
            .codec(Codec::parsed::<usize>())
            .codec(Codec::parsed::<f32>())
            .codec(Codec::parsed::<f64>())
            .codec(Codec::parsed::<BigInt>())
    }

    /// Registry without any codecs.
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
            records: HashMap::new(),
            subtypes: Vec::new(),
            name_scan: true,
        }
    }

    /// Add or replace the codec for its type.
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codecs.insert(codec.key.id, codec);
        self
    }

    /// Register a record type and every record type its schema refers to.
    pub fn record<T: Configurable>(mut self) -> Self {
        self.register_record::<T>();
        self
    }

    /// Register `C` as a concrete type for fields declared as `B`.
    pub fn subtype<B: 'static, C: Configurable>(
        mut self,
        upcast: fn(C) -> B,
        downcast: fn(&B) -> Option<&C>,
    ) -> Self {
        self.register_record::<C>();
        self.subtypes.push(Subtype {
            base: TypeId::of::<B>(),
            concrete: TypeKey::of::<C>(),
            name: C::NAME,
            upcast: Box::new(move |value: Box<dyn Any>| -> Result<Box<dyn Any>> {
                let concrete = value
                    .downcast::<C>()
                    .map_err(|_| Error::UnsupportedType(type_name::<C>()))?;
                Ok(Box::new(upcast(*concrete)) as Box<dyn Any>)
            }),
            downcast: erase_downcast(move |value: &dyn Any| {
                value
                    .downcast_ref::<B>()
                    .and_then(downcast)
                    .map(|c| c as &dyn Any)
            }),
        });
        self
    }

    /// Disable the case-insensitive type name scan; only aliases resolve.
    pub fn without_name_scan(mut self) -> Self {
        self.name_scan = false;
        self
    }

    pub(crate) fn register_record<T: Configurable>(&mut self) {
        let id = TypeId::of::<T>();
        if self.records.contains_key(&id) {
            return;
        }
        trace!(record = T::NAME, "registering record schema");
        let schema = T::schema();
        let dependencies = schema.dependencies();
        self.records.insert(
            id,
            RecordEntry {
                name: T::NAME,
                schema: Box::new(schema),
                decode: decode_record_erased::<T>,
                encode: encode_record_erased::<T>,
            },
        );
        for desc in dependencies {
            (desc.register)(self);
        }
    }

    /// Install as the process-wide registry. Fails, returning `self`, when
    /// one is already installed.
    pub fn install(self) -> std::result::Result<(), Registry> {
        GLOBAL.set(self)
    }

    /// The process-wide registry; defaults to [`Registry::new`].
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::new)
    }

    pub fn has_codec(&self, id: TypeId) -> bool {
        self.codecs.contains_key(&id)
    }

    pub fn has_record(&self, id: TypeId) -> bool {
        self.records.contains_key(&id)
    }

    pub(crate) fn name_scan(&self) -> bool {
        self.name_scan
    }

    pub(crate) fn codec_for(&self, ty: TypeKey) -> Result<&Codec> {
        self.codecs
            .get(&ty.id)
            .ok_or(Error::UnsupportedType(ty.name))
    }

    pub(crate) fn record_for(&self, ty: TypeKey) -> Result<&RecordEntry> {
        self.records
            .get(&ty.id)
            .ok_or(Error::UnsupportedType(ty.name))
    }

    pub(crate) fn subtypes_of(&self, base: TypeId) -> impl Iterator<Item = &Subtype> {
        self.subtypes.iter().filter(move |s| s.base == base)
    }

    /// Decode `text` with the codec registered for `T`.
    pub fn decode_text<T: 'static>(&self, text: &str) -> Result<T> {
        let codec = self.codec_for(TypeKey::of::<T>())?;
        (codec.decode)(text)?
            .downcast::<T>()
            .map(|v| *v)
            .map_err(|_| Error::UnsupportedType(type_name::<T>()))
    }

    /// Decode `text` into a value of type `ty`.
    pub(crate) fn decode_erased(&self, ty: TypeKey, text: &str) -> Result<Box<dyn Any>> {
        (self.codec_for(ty)?.decode)(text)
    }

    /// Encode a value of type `ty` to text.
    pub(crate) fn encode_erased(&self, ty: TypeKey, value: &dyn Any) -> Result<String> {
        (self.codec_for(ty)?.encode)(value).ok_or(Error::UnsupportedType(ty.name))
    }

    /// Encode `value` with the codec registered for `T`.
    pub fn encode_text<T: 'static>(&self, value: &T) -> Result<String> {
        self.encode_erased(TypeKey::of::<T>(), value)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut records: Vec<&str> = self.records.values().map(|r| r.name).collect();
        records.sort_unstable();
        f.debug_struct("Registry")
            .field("codecs", &self.codecs.len())
            .field("records", &records)
            .field("subtypes", &self.subtypes.len())
            .field("name_scan", &self.name_scan)
            .finish()
    }
}
