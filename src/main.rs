//! Purpose: `stonefs-loader` CLI for inspecting and exercising native binding resolution.
//! Role: Binary crate root; parses args, runs `plan`/`load`, emits status lines and JSON.
//! Invariants: Status lines go to stdout unless `--json` claims stdout for the report.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `to_exit_code`.
use std::io::{self, IsTerminal};
use std::error::Error as StdError;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde::Serialize;
use serde_json::{Map, Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;

use stonefs_loader::{
    DlOpener, Error, ErrorKind, LoaderConfig, NativeBindingLoader, StatusSink, to_exit_code,
};

#[derive(Parser)]
#[command(
    name = "stonefs-loader",
    version,
    about = "Locate, load, and initialize the StoneFS native client binding",
    long_about = None,
    after_help = r#"RESOLUTION ORDER
  1. $STONE_JNI_PATH (exact absolute path; no fallback when set)
  2. platform library search path (libstonefs_jni)
  3. /usr/lib64/libstonefs_jni.so
  4. /usr/lib/jni/libstonefs_jni.so

EXAMPLES
  $ stonefs-loader plan
  $ STONE_JNI_PATH=/opt/lib/custom.so stonefs-loader load
  $ stonefs-loader load --json"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(clap::Args)]
struct LoaderArgs {
    #[arg(
        long,
        help = "Load exactly this absolute path, as if STONE_JNI_PATH were set",
        value_hint = ValueHint::FilePath
    )]
    library: Option<PathBuf>,
    #[arg(long, help = "Entry point symbol to call after loading (default: native_initialize)")]
    entry: Option<String>,
    #[arg(
        long = "fallback-dir",
        help = "Replace the fixed fallback directories (repeatable, tried in order)",
        value_hint = ValueHint::DirPath
    )]
    fallback_dirs: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the locations that would be tried, without loading anything.
    Plan {
        #[command(flatten)]
        loader: LoaderArgs,
        #[arg(long, help = "Emit the plan as JSON")]
        json: bool,
    },
    /// Load the library once and call its entry point.
    Load {
        #[command(flatten)]
        loader: LoaderArgs,
        #[arg(long, help = "Emit a JSON report on stdout; status lines move to stderr")]
        json: bool,
    },
    /// Print the loader version.
    Version,
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(code) => code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<i32, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(code);
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `stonefs-loader --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    dispatch(cli.command).map_err(|err| (err, color_mode))
}

fn dispatch(command: Command) -> Result<i32, Error> {
    match command {
        Command::Plan { loader, json } => {
            let plan = build_loader(&loader, StatusSink::Discard).plan();
            if json {
                emit_json(plan.to_json());
            } else {
                for (index, step) in plan.steps().iter().enumerate() {
                    println!("{}. {step}", index + 1);
                }
            }
            Ok(0)
        }
        Command::Load { loader, json } => {
            let sink = if json {
                StatusSink::Stderr
            } else {
                StatusSink::Stdout
            };
            let loader = build_loader(&loader, sink);
            let outcome = loader.ensure_loaded()?;
            if json {
                let mut report = Map::new();
                report.insert("loaded".to_string(), report_value(&outcome)?);
                report.insert("state".to_string(), report_value(&loader.state())?);
                report.insert(
                    "entry".to_string(),
                    json!(loader.config().entry_symbol()),
                );
                if let Some(time) = time_now() {
                    report.insert("time".to_string(), json!(time));
                }
                emit_json(Value::Object(report));
            }
            Ok(0)
        }
        Command::Version => {
            if io::stdout().is_terminal() {
                println!("stonefs-loader {}", env!("CARGO_PKG_VERSION"));
            } else {
                emit_json(json!({
                    "name": "stonefs-loader",
                    "version": env!("CARGO_PKG_VERSION"),
                }));
            }
            Ok(0)
        }
    }
}

fn build_loader(args: &LoaderArgs, sink: StatusSink) -> NativeBindingLoader {
    let mut config = LoaderConfig::from_env();
    if let Some(entry) = &args.entry {
        config = config.with_entry_symbol(entry.clone());
    }
    if !args.fallback_dirs.is_empty() {
        config = config.with_fallback_dirs(args.fallback_dirs.iter().cloned());
    }
    let loader = NativeBindingLoader::new(config, DlOpener::new()).with_status(sink);
    match &args.library {
        Some(path) => loader.with_override(Some(path.clone())),
        None => loader,
    }
}

fn report_value<T: Serialize>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to serialize load report")
            .with_source(err)
    })
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn time_now() -> Option<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).ok()
}

fn emit_json(value: Value) {
    let json = serde_json::to_string(&value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

/// Writes `err` to stderr: labelled lines on a terminal, one JSON object otherwise.
fn emit_error(err: &Error, color_mode: ColorMode) {
    let message = err
        .message()
        .map_or_else(|| format!("{:?}", err.kind()), str::to_string);
    let causes: Vec<String> = std::iter::successors(err.source(), |&source| source.source())
        .map(ToString::to_string)
        .collect();

    if !io::stderr().is_terminal() {
        let mut body = json!({ "kind": format!("{:?}", err.kind()), "message": message });
        if let Some(hint) = err.hint() {
            body["hint"] = json!(hint);
        }
        if let Some(path) = err.path() {
            body["path"] = json!(path.display().to_string());
        }
        if !causes.is_empty() {
            body["causes"] = json!(causes);
        }
        eprintln!("{}", json!({ "error": body }));
        return;
    }

    // Red for the headline, yellow for the detail labels.
    let paint = |label: &str, code: u8| {
        if color_mode.use_color(true) {
            format!("\u{1b}[{code}m{label}\u{1b}[0m")
        } else {
            label.to_string()
        }
    };
    eprintln!("{} {message}", paint("error:", 31));
    if let Some(hint) = err.hint() {
        eprintln!("{} {hint}", paint("hint:", 33));
    }
    if let Some(path) = err.path() {
        eprintln!("{} {}", paint("path:", 33), path.display());
    }
    if let Some(cause) = causes.first() {
        eprintln!("{} {cause}", paint("caused by:", 33));
    }
}

/// First non-empty line of clap's rendering, without its `error:` prefix.
fn clap_error_summary(err: &clap::Error) -> String {
    err.to_string()
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}
