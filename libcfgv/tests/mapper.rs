//! Record mapping through the crate-level entry points.
//!
//! Every test installs the same registry; the first install wins and the
//! others are ignored.

use std::any::Any;

use libcfgv::{
    from_str, from_tree, list_from_tree, list_to_tree, parse, to_string, to_tree, Codec,
    Configurable, Error, ErrorKind, Field, Mapper, Registry, Schema,
};
use num_bigint::BigInt;

#[derive(Debug, Default, PartialEq)]
struct Method {
    name: String,
    value: i32,
}

impl Configurable for Method {
    const NAME: &'static str = "Method";

    fn schema() -> Schema<Self> {
        Schema::new(vec![
            Field::scalar("name", |m: &Method| Some(&m.name), |m, v| m.name = v),
            Field::scalar("value", |m: &Method| Some(&m.value), |m, v| m.value = v),
        ])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum Level {
    #[default]
    Info,
    Debug,
}

fn parse_level(text: &str) -> libcfgv::Result<Level> {
    match text.to_ascii_lowercase().as_str() {
        "info" => Ok(Level::Info),
        "debug" => Ok(Level::Debug),
        _ => Err(Error::InvalidValue(text.to_string(), "Level")),
    }
}

fn level_text(level: &Level) -> String {
    format!("{:?}", level).to_lowercase()
}

#[derive(Debug, Default, PartialEq)]
struct Settings {
    title: Option<String>,
    enabled: bool,
    initial: char,
    ratio: f64,
    huge: BigInt,
    motto: String,
    max_depth: u32,
    level: Level,
    ports: Vec<u16>,
    methods: Vec<Method>,
}

impl Configurable for Settings {
    const NAME: &'static str = "Settings";

    fn schema() -> Schema<Self> {
        Schema::new(vec![
            Field::scalar("title", |s: &Settings| s.title.as_ref(), |s, v| s.title = Some(v)),
            Field::scalar("enabled", |s: &Settings| Some(&s.enabled), |s, v| s.enabled = v),
            Field::scalar("initial", |s: &Settings| Some(&s.initial), |s, v| s.initial = v),
            Field::scalar("ratio", |s: &Settings| Some(&s.ratio), |s, v| s.ratio = v),
            Field::scalar("huge", |s: &Settings| Some(&s.huge), |s, v| s.huge = v),
            Field::scalar("motto", |s: &Settings| Some(&s.motto), |s, v| s.motto = v),
            Field::scalar("max_depth", |s: &Settings| Some(&s.max_depth), |s, v| {
                s.max_depth = v
            })
            .path("limits.depth"),
            Field::scalar("level", |s: &Settings| Some(&s.level), |s, v| s.level = v),
            Field::scalars("ports", |s: &Settings| Some(&s.ports), |s, v| s.ports = v),
            Field::records("methods", |s: &Settings| Some(&s.methods), |s, v| s.methods = v),
        ])
    }
}

#[derive(Debug, Default, PartialEq)]
struct Category {
    name: String,
    children: Vec<Category>,
}

impl Configurable for Category {
    const NAME: &'static str = "Category";

    fn schema() -> Schema<Self> {
        Schema::new(vec![
            Field::scalar("name", |c: &Category| Some(&c.name), |c, v| c.name = v),
            Field::records(
                "children",
                |c: &Category| (!c.children.is_empty()).then_some(&c.children),
                |c, v| c.children = v,
            ),
        ])
    }
}

trait Shape: Any {
    fn area(&self) -> f64;
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Default, PartialEq)]
struct Circle {
    radius: f64,
}

impl Shape for Circle {
    fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Configurable for Circle {
    const NAME: &'static str = "Circle";

    fn schema() -> Schema<Self> {
        Schema::new(vec![Field::scalar(
            "radius",
            |c: &Circle| Some(&c.radius),
            |c, v| c.radius = v,
        )])
    }
}

#[derive(Debug, Default, PartialEq)]
struct Square {
    side: f64,
}

impl Shape for Square {
    fn area(&self) -> f64 {
        self.side * self.side
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Configurable for Square {
    const NAME: &'static str = "Square";

    fn schema() -> Schema<Self> {
        Schema::new(vec![Field::scalar(
            "side",
            |s: &Square| Some(&s.side),
            |s, v| s.side = v,
        )])
    }
}

/// A shape nobody registers.
struct Dot;

impl Shape for Dot {
    fn area(&self) -> f64 {
        0.0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
struct Drawing {
    title: String,
    shape: Option<Box<dyn Shape>>,
}

impl Configurable for Drawing {
    const NAME: &'static str = "Drawing";

    fn schema() -> Schema<Self> {
        Schema::new(vec![
            Field::scalar("title", |d: &Drawing| Some(&d.title), |d, v| d.title = v),
            Field::polymorphic("shape", |d: &Drawing| d.shape.as_ref(), |d, v| d.shape = Some(v))
                .discriminator("kind")
                .alias::<Circle>("round"),
        ])
    }
}

/// A shape field without a discriminator.
#[derive(Default)]
struct Frame {
    shape: Option<Box<dyn Shape>>,
}

impl Configurable for Frame {
    const NAME: &'static str = "Frame";

    fn schema() -> Schema<Self> {
        Schema::new(vec![Field::polymorphic(
            "shape",
            |f: &Frame| f.shape.as_ref(),
            |f, v| f.shape = Some(v),
        )])
    }
}

fn boxed_circle(c: Circle) -> Box<dyn Shape> {
    Box::new(c)
}

fn as_circle(shape: &Box<dyn Shape>) -> Option<&Circle> {
    shape.as_any().downcast_ref()
}

fn boxed_square(s: Square) -> Box<dyn Shape> {
    Box::new(s)
}

fn as_square(shape: &Box<dyn Shape>) -> Option<&Square> {
    shape.as_any().downcast_ref()
}

fn registry() -> Registry {
    Registry::new()
        .codec(Codec::new(parse_level, level_text))
        .record::<Method>()
        .record::<Settings>()
        .record::<Category>()
        .record::<Drawing>()
        .record::<Frame>()
        .subtype::<Box<dyn Shape>, Circle>(boxed_circle, as_circle)
        .subtype::<Box<dyn Shape>, Square>(boxed_square, as_square)
}

fn init() {
    let _ = registry().install();
}

#[test]
fn test_record_survives_text_round_trip() {
    init();
    let method = Method {
        name: "Test method".to_string(),
        value: 15210,
    };
    let text = to_string(&method).unwrap();
    assert_eq!(text, "name \"Test method\"\nvalue 15210\n");
    let back: Method = from_str(&text).unwrap();
    assert_eq!(back, method);
}

#[test]
fn test_missing_fields_keep_defaults() {
    init();
    let method: Method = from_str("value 3\nunknown ignored").unwrap();
    assert_eq!(method, Method { name: String::new(), value: 3 });
}

#[test]
fn test_complex_values() {
    init();
    let text = "\
title Tools
enabled TRUE
initial x
ratio 0.25
huge 123456789012345678901234567890
motto Keep   it simple
limits
  depth 12
level DEBUG
ports
  item 80
  item 443
methods
  item
    name first
    value 1
  item
    name \"second one\"
    value -2
";
    let settings: Settings = from_str(text).unwrap();
    assert_eq!(settings.title.as_deref(), Some("Tools"));
    assert!(settings.enabled);
    assert_eq!(settings.initial, 'x');
    assert_eq!(settings.ratio, 0.25);
    assert_eq!(
        settings.huge,
        "123456789012345678901234567890".parse::<BigInt>().unwrap()
    );
    assert_eq!(settings.motto, "Keep   it simple");
    assert_eq!(settings.max_depth, 12);
    assert_eq!(settings.level, Level::Debug);
    assert_eq!(settings.ports, vec![80, 443]);
    assert_eq!(settings.methods.len(), 2);
    assert_eq!(settings.methods[1].name, "second one");
    assert_eq!(settings.methods[1].value, -2);

    let tree = to_tree(&settings).unwrap();
    assert_eq!(tree.get_by_path("limits.depth").unwrap().unwrap().raw(), Some("12"));
    assert_eq!(tree.get_by_path("level").unwrap().unwrap().raw(), Some("debug"));
    let back: Settings = from_tree(&parse(&libcfgv::encode(&tree)).unwrap()).unwrap();
    assert_eq!(back, settings);
}

#[test]
fn test_none_fields_are_not_written() {
    init();
    let tree = to_tree(&Settings::default()).unwrap();
    assert!(!tree.contains("title"));
    assert!(tree.contains("enabled"));
}

#[test]
fn test_self_referencing_record() {
    init();
    let text = "\
name root
children
  item
    name a
  item
    name b
    children
      item
        name c
";
    let root: Category = from_str(text).unwrap();
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[1].children[0].name, "c");
    assert_eq!(to_string(&root).unwrap(), text);
}

#[test]
fn test_polymorphic_alias() {
    init();
    let drawing: Drawing = from_str("title Sketch\nkind ROUND\nshape\n  radius 2").unwrap();
    let shape = drawing.shape.unwrap();
    let circle = shape.as_any().downcast_ref::<Circle>().unwrap();
    assert_eq!(circle.radius, 2.0);
}

#[test]
fn test_polymorphic_name_scan() {
    init();
    let drawing: Drawing = from_str("kind square\nshape\n  side 3").unwrap();
    assert_eq!(drawing.shape.unwrap().area(), 9.0);
}

#[test]
fn test_polymorphic_encode_writes_discriminator() {
    init();
    let square = Drawing {
        title: "Box".to_string(),
        shape: Some(Box::new(Square { side: 1.5 })),
    };
    assert_eq!(
        to_string(&square).unwrap(),
        "title Box\nkind square\nshape\n  side 1.5\n"
    );

    let circle = Drawing {
        title: "Ring".to_string(),
        shape: Some(Box::new(Circle { radius: 1.0 })),
    };
    let text = to_string(&circle).unwrap();
    assert_eq!(text, "title Ring\nkind round\nshape\n  radius 1\n");
    let back: Drawing = from_str(&text).unwrap();
    assert!(back.shape.unwrap().as_any().is::<Circle>());
}

#[test]
fn test_polymorphic_errors() {
    init();
    let err = from_str::<Drawing>("kind hexagon\nshape\n  side 1").err().unwrap();
    assert!(matches!(&err, Error::TypeNotFound(name) if name == "hexagon"));
    assert_eq!(err.kind(), ErrorKind::TypeLoad);

    let err = from_str::<Drawing>("shape\n  side 1").err().unwrap();
    assert!(matches!(err, Error::MissingTypeName(_)));
    assert_eq!(err.kind(), ErrorKind::TypeLoad);

    let err = from_str::<Drawing>("kind\nshape\n  side 1").err().unwrap();
    assert!(matches!(&err, Error::MissingTypeName(name) if name == "shape"));
    assert_eq!(err.kind(), ErrorKind::TypeLoad);

    let dot = Drawing {
        title: String::new(),
        shape: Some(Box::new(Dot)),
    };
    let err = to_tree(&dot).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::TypeLoad);
}

#[test]
fn test_base_field_without_discriminator_is_not_encoded() {
    init();
    let frame = Frame {
        shape: Some(Box::new(Square { side: 2.0 })),
    };
    let err = to_tree(&frame).err().unwrap();
    assert!(matches!(&err, Error::MissingTypeName(name) if name == "shape"));
    assert_eq!(err.kind(), ErrorKind::TypeLoad);

    let err = from_str::<Frame>("shape\n  side 2").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::TypeLoad);

    assert_eq!(to_string(&Frame::default()).unwrap(), "");
}

#[test]
fn test_without_name_scan_only_aliases_resolve() {
    let registry = registry().without_name_scan();
    let mapper = Mapper::new(&registry);

    let tree = parse("kind round\nshape\n  radius 1").unwrap();
    assert!(mapper.decode::<Drawing>(&tree).is_ok());

    let tree = parse("kind square\nshape\n  side 1").unwrap();
    let err = mapper.decode::<Drawing>(&tree).err().unwrap();
    assert!(matches!(err, Error::TypeNotFound(_)));
}

#[test]
fn test_lists() {
    init();
    let methods = vec![
        Method { name: "a".to_string(), value: 1 },
        Method { name: "b c".to_string(), value: 2 },
    ];
    let tree = list_to_tree(&methods).unwrap();
    assert_eq!(tree.get_all("item").len(), 2);
    assert_eq!(list_from_tree::<Method>(&tree).unwrap(), methods);

    let mixed = parse("item\n  value 1\nother\n  value 2").unwrap();
    let err = list_from_tree::<Method>(&mixed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}
