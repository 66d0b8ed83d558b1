//! Loading and saving through the file wrappers.

use libcfgv::{
    from_file, load_file, parse, save_file, save_to_writer, to_file, Configurable, ErrorKind,
    Field, LoadOptions, MissingFile, ParseOptions, Registry, Schema, ValueNode,
};

#[derive(Debug, Default, PartialEq)]
struct Window {
    title: String,
    width: u32,
}

impl Configurable for Window {
    const NAME: &'static str = "Window";

    fn schema() -> Schema<Self> {
        Schema::new(vec![
            Field::scalar("title", |w: &Window| Some(&w.title), |w, v| w.title = v),
            Field::scalar("width", |w: &Window| Some(&w.width), |w, v| w.width = v),
        ])
    }
}

#[test]
fn test_missing_file_is_empty_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let tree = load_file(dir.path().join("absent.cfgv"), &LoadOptions::default()).unwrap();
    assert_eq!(tree, ValueNode::new());
}

#[test]
fn test_missing_file_can_be_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let options = LoadOptions::default().require_file();
    assert_eq!(options.missing, MissingFile::Error);
    let err = load_file(dir.path().join("absent.cfgv"), &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.cfgv");
    let tree = parse("server main\n  port 80\n  motd \"hello there\"\n").unwrap();

    save_file(&path, &tree).unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "server main\n  port 80\n  motd \"hello there\"\n"
    );
    assert_eq!(load_file(&path, &LoadOptions::default()).unwrap(), tree);
}

#[test]
fn test_load_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.cfgv");
    std::fs::write(&path, "  key value\n").unwrap();

    let err = load_file(&path, &LoadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(err.to_string().ends_with(&format!("at 1:1 of <{}>", path.display())));

    let options = LoadOptions {
        parse: ParseOptions {
            filename: Some("override.cfgv".to_string()),
            ..ParseOptions::default()
        },
        ..LoadOptions::default()
    };
    let err = load_file(&path, &options).unwrap_err();
    assert!(err.to_string().ends_with("at 1:1 of <override.cfgv>"));
}

#[test]
fn test_save_to_writer() {
    let mut tree = ValueNode::new();
    tree.set_by_path("a.b", ValueNode::scalar("x y")).unwrap();
    let mut out = Vec::new();
    save_to_writer(&tree, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "a\n  b \"x y\"\n");
}

#[test]
fn test_record_file_round_trip() {
    let _ = Registry::new().record::<Window>().install();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("window.cfgv");
    let window = Window {
        title: "Main view".to_string(),
        width: 640,
    };

    to_file(&path, &window).unwrap();
    let back: Window = from_file(&path, &LoadOptions::default()).unwrap();
    assert_eq!(back, window);

    let empty: Window = from_file(dir.path().join("none.cfgv"), &LoadOptions::default()).unwrap();
    assert_eq!(empty, Window::default());
}
