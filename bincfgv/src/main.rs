//! CFGV command-line tool for checking, formatting, querying, and transcoding
//! CFGV documents.
//!
//! Usage: cfgv [OPTIONS] [FILE|DIR]
//!
//! Options:
//!   -f, --from <FORMAT>        Input format (cfgv, yaml, toml, cbor) [default: cfgv]
//!   -t, --to <FORMAT>          Output format (cfgv, tree, yaml, toml, cbor, diag) [default: cfgv]
//!       --get <PATH>           Print the nodes matched by a path expression
//!       --set <PATH> <VALUE>   Set a scalar before writing output
//!       --check                Check that the input is valid
//!   -w, --write                Write output next to the input, with the output format's extension
//!   -o, --output <FILE>        Write output to the specified file
//!
//! Set `CFGV_LOG` (e.g. `CFGV_LOG=debug`) to see library logs on stderr.

use clap::{Parser, ValueEnum};
use libcfgv::{encode, parse, ValueNode};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod transcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    Cfgv,
    Yaml,
    Toml,
    Cbor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Canonical CFGV text
    Cfgv,
    /// Tree dump, one node per line
    Tree,
    Yaml,
    Toml,
    Cbor,
    /// CBOR diagnostic notation
    Diag,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Cfgv => "cfgv",
            OutputFormat::Tree => "tree",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Toml => "toml",
            OutputFormat::Cbor => "cbor",
            OutputFormat::Diag => "diag",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "cfgv",
    about = "Check, format, query and transcode CFGV documents",
    version
)]
struct Cli {
    /// Input file or directory (reads from stdin if absent or `-`)
    input: Option<PathBuf>,
    /// Input format
    #[arg(short, long, value_enum, default_value_t = InputFormat::Cfgv)]
    from: InputFormat,
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Cfgv)]
    to: OutputFormat,
    /// Print every node matched by a path expression
    #[arg(long, value_name = "PATH")]
    get: Option<String>,
    /// Set the scalar at a path expression before writing output
    #[arg(long, num_args = 2, value_names = ["PATH", "VALUE"])]
    set: Option<Vec<String>>,
    /// Check if the input is valid (exit 0 if valid, 1 if invalid)
    #[arg(long)]
    check: bool,
    /// Write output next to the input file, with the output format's extension
    #[arg(short, long, conflicts_with = "output")]
    write: bool,
    /// Write output to the specified file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let input = cli.input.as_deref().filter(|p| *p != Path::new("-"));
    if let Some(dir) = input.filter(|p| p.is_dir()) {
        process::exit(process_directory(&cli, dir));
    }
    process::exit(report(input, process_input(&cli, input)));
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("CFGV_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Print an error prefixed by its input and turn the outcome into an exit code.
fn report(input: Option<&Path>, result: Result<(), String>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            match input {
                Some(path) => eprintln!("{}: {}", path.display(), e),
                None => eprintln!("Error: {}", e),
            }
            1
        }
    }
}

fn process_directory(cli: &Cli, dir: &Path) -> i32 {
    if cli.output.is_some() {
        eprintln!("Error: --output cannot be used with directory input");
        return 1;
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error reading directory {}: {}", dir.display(), e);
            return 1;
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|e| e == "cfgv"))
        .collect();
    paths.sort();

    let mut had_errors = false;
    for path in &paths {
        if report(Some(path), process_input(cli, Some(path))) != 0 {
            had_errors = true;
        }
    }
    i32::from(had_errors)
}

fn process_input(cli: &Cli, input: Option<&Path>) -> Result<(), String> {
    let bytes = read_input(input)?;
    let mut tree = load_tree(cli.from, &bytes)?;
    debug!(format = ?cli.from, keys = tree.keys().len(), "loaded input");

    if let Some(args) = &cli.set {
        let [path, value] = args.as_slice() else {
            return Err("--set takes a path and a value".to_string());
        };
        tree.set_by_path(path, ValueNode::scalar(value))
            .map_err(|e| e.to_string())?;
    }

    if cli.check {
        match input {
            Some(path) => println!("{}: ok", path.display()),
            None => println!("ok"),
        }
        return Ok(());
    }

    if let Some(path) = &cli.get {
        let found = tree.get_all_by_path(path).map_err(|e| e.to_string())?;
        if found.is_empty() {
            return Err(format!("Nothing matches path \"{}\"", path));
        }
        print!("{}", render_matches(&found));
        return Ok(());
    }

    let output = render(&tree, cli.to)?;
    write_output(&output, cli, input)
}

fn read_input(input: Option<&Path>) -> Result<Vec<u8>, String> {
    match input {
        Some(path) => fs::read(path).map_err(|e| format!("Error reading file: {}", e)),
        None => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .map_err(|e| format!("Error reading stdin: {}", e))?;
            Ok(buffer)
        }
    }
}

fn load_tree(format: InputFormat, bytes: &[u8]) -> Result<ValueNode, String> {
    let text = || std::str::from_utf8(bytes).map_err(|e| format!("Input is not valid UTF-8: {}", e));
    match format {
        InputFormat::Cfgv => parse(text()?).map_err(|e| e.to_string()),
        InputFormat::Yaml => transcode::to_tree(&transcode::yaml::decode(text()?)?),
        InputFormat::Toml => transcode::to_tree(&transcode::toml::decode(text()?)?),
        InputFormat::Cbor => transcode::to_tree(&transcode::cbor::decode(bytes)?),
    }
}

fn render(tree: &ValueNode, format: OutputFormat) -> Result<Vec<u8>, String> {
    let text = match format {
        OutputFormat::Cfgv => encode(tree),
        OutputFormat::Tree => tree.dump(),
        OutputFormat::Yaml => transcode::yaml::encode(&transcode::from_tree(tree)?)?,
        OutputFormat::Toml => transcode::toml::encode(&transcode::from_tree(tree)?)?,
        OutputFormat::Cbor => return Ok(transcode::cbor::encode(&transcode::from_tree(tree)?)),
        OutputFormat::Diag => {
            transcode::cbor::diagnostic(&transcode::cbor::encode(&transcode::from_tree(tree)?))?
        }
    };
    Ok(text.into_bytes())
}

/// Each match as its raw scalar line followed by its children in CFGV form.
fn render_matches(found: &[&ValueNode]) -> String {
    let mut out = String::new();
    for node in found {
        if let Some(raw) = node.raw() {
            out.push_str(raw);
            out.push('\n');
        }
        out.push_str(&encode(node));
    }
    out
}

fn write_output(output: &[u8], cli: &Cli, input: Option<&Path>) -> Result<(), String> {
    let target = match (&cli.output, cli.write, input) {
        (Some(path), _, _) => Some(path.clone()),
        (None, true, Some(input)) => Some(input.with_extension(cli.to.extension())),
        (None, true, None) => return Err("--write requires an input file".to_string()),
        (None, false, _) => None,
    };

    match target {
        Some(path) => {
            debug!(path = %path.display(), "writing output");
            fs::write(&path, output).map_err(|e| format!("Error writing {}: {}", path.display(), e))
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output)
                .map_err(|e| format!("Error writing to stdout: {}", e))
        }
    }
}
