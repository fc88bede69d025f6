//! Purpose: `corkboard` CLI entry point and command dispatch bootstrap.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (human or JSON by command/flags).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All record creation goes through `api::Board` (validation first).
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::ffi::OsString;
use std::io::{self, IsTerminal, Read};
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use time::format_description::well_known::Rfc3339;

mod command_dispatch;
mod serve;

use corkboard::api::{
    Board, Error, ErrorKind, FeedbackPage, Journal, MEMORY_STORE_PATH, RemoteClient,
    default_store_path, to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(message)
                    .with_hint(hint));
            }
        },
    };

    let store_path = cli.store.unwrap_or_else(default_store_path);

    command_dispatch::dispatch_command(cli.command, store_path)
        .map_err(add_corrupt_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
}

fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            let replacement = arg.to_str().and_then(|value| match value {
                "---help" => Some("--help"),
                "---version" => Some("--version"),
                _ => None,
            });
            replacement.map(OsString::from).unwrap_or_else(|| arg)
        })
        .collect()
}

#[derive(Parser)]
#[command(
    name = "corkboard",
    version,
    about = "Tiny feedback inbox: collect short messages over HTTP or the CLI",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Messages are 1-250 characters, stored newest-first in a plain JSONL file.

Mental model:
  - `add` submits a message (write)
  - `list` shows all messages, newest first (read)
  - `serve` exposes both over HTTP at /feedback
"#,
    after_help = r#"EXAMPLES
  $ corkboard add "the login page is broken on mobile"
  $ corkboard list
  $ corkboard serve --bind 127.0.0.1:9800       # Terminal 1
  $ corkboard add --url http://127.0.0.1:9800 "works over HTTP too"

LEARN MORE
  $ corkboard <command> --help
  https://github.com/sandover/corkboard"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        help = "Store file for records (default: ~/.corkboard/feedback.jsonl; :memory: for ephemeral)",
        value_hint = ValueHint::FilePath
    )]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

const DEFAULT_MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Serve the feedback API over HTTP",
        long_about = r#"Serve the feedback resource over HTTP.

Exposes POST /feedback (submit) and GET /feedback (list, newest first),
plus GET /healthz for liveness probes."#,
        after_help = r#"EXAMPLES
  $ corkboard serve
  $ corkboard serve --bind 127.0.0.1:9801
  $ corkboard --store /tmp/fb.jsonl serve

NOTES
  - Validation failures are 400s with fixed messages; anything else is a generic 500
  - `--store :memory:` serves an ephemeral per-process board (demos, tests)
  - Set RUST_LOG to adjust request logging (default: info)"#
    )]
    Serve {
        #[arg(long, default_value = "127.0.0.1:9800", help = "Bind address")]
        bind: String,
        #[arg(
            long,
            default_value_t = DEFAULT_MAX_BODY_BYTES,
            help = "Max request body size in bytes"
        )]
        max_body_bytes: u64,
    },
    #[command(
        about = "Submit one feedback message",
        long_about = r#"Submit one message to the store (or to a running server with --url).

The message comes from the MESSAGE argument, or from stdin when the
argument is omitted and stdin is piped. Prints the created record as JSON."#,
        after_help = r#"EXAMPLES
  $ corkboard add "search results are stale"
  $ echo "from a pipe" | corkboard add
  $ corkboard add --url http://127.0.0.1:9800 "submit over HTTP"

NOTES
  - Messages are trimmed; the trimmed text must be 1-250 characters
  - Validation failures exit 3 and create no record"#
    )]
    Add {
        #[arg(help = "Message text (omit to read from stdin)")]
        message: Option<String>,
        #[arg(
            long,
            value_name = "BASE",
            help = "Submit to a remote server at this base URL instead of the local store"
        )]
        url: Option<String>,
    },
    #[command(
        about = "List all feedback, newest first",
        after_help = r#"EXAMPLES
  $ corkboard list
  $ corkboard list --json | jq '.results[].message'
  $ corkboard list --url http://127.0.0.1:9800

NOTES
  - Human-readable columns on a terminal; {count, results} JSON with --json or when piped"#
    )]
    List {
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
        #[arg(
            long,
            value_name = "BASE",
            help = "List from a remote server at this base URL instead of the local store"
        )]
        url: Option<String>,
    },
    #[command(
        about = "Check store health",
        long_about = r#"Open and fully scan the store file, reporting the record count.

Exits non-zero (code 6) when a corrupt line is found, naming the line."#,
        after_help = r#"EXAMPLES
  $ corkboard check
  $ corkboard --store /tmp/fb.jsonl check --json"#
    )]
    Check {
        #[arg(long, help = "Emit JSON instead of human-readable output")]
        json: bool,
    },
    #[command(
        about = "Print version info as JSON",
        after_help = r#"EXAMPLES
  $ corkboard version"#
    )]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        long_about = r#"Generate shell completion scripts.

Prints a completion script for the given shell to stdout.
Install the generated file in your shell's completion directory (or source it)
to enable tab completion."#,
        after_help = r#"EXAMPLES
  $ corkboard completion bash > ~/.local/share/bash-completion/completions/corkboard
  $ corkboard completion zsh > ~/.zfunc/_corkboard
  $ corkboard completion fish > ~/.config/fish/completions/corkboard.fish"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn resolve_add_message(message: Option<String>) -> Result<String, Error> {
    if let Some(message) = message {
        return Ok(message);
    }
    if io::stdin().is_terminal() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("missing message input")
            .with_hint("Provide MESSAGE as an argument or pipe text to stdin."));
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read message from stdin")
            .with_source(err)
    })?;
    Ok(buffer)
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    } else {
        serde_json::to_string(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    };
    println!("{json}");
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("corkboard {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "corkboard",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

fn emit_page(page: &FeedbackPage, json: bool) -> Result<(), Error> {
    if json || !io::stdout().is_terminal() {
        let value = serde_json::to_value(page).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode listing")
                .with_source(err)
        })?;
        emit_json(value);
        return Ok(());
    }

    if page.results.is_empty() {
        println!("No feedback yet.");
        return Ok(());
    }

    let rows = page
        .results
        .iter()
        .map(|record| {
            vec![
                record.id.to_string(),
                record
                    .created_at
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| record.created_at.to_string()),
                record.message.clone(),
            ]
        })
        .collect::<Vec<_>>();
    emit_table(&["ID", "CREATED", "MESSAGE"], &rows);
    Ok(())
}

fn emit_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", render_table(headers, rows));
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let column_count = headers.len();
    let mut sanitized_rows = Vec::with_capacity(rows.len());
    let mut widths = headers
        .iter()
        .map(|header| header.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        let mut sanitized = Vec::with_capacity(column_count);
        for (idx, width) in widths.iter_mut().enumerate() {
            let value = row.get(idx).map(String::as_str).unwrap_or("");
            let cleaned = sanitize_table_cell(value);
            *width = (*width).max(cleaned.chars().count());
            sanitized.push(cleaned);
        }
        sanitized_rows.push(sanitized);
    }

    let mut lines = Vec::with_capacity(sanitized_rows.len() + 1);
    lines.push(format_table_line(
        &headers
            .iter()
            .map(|header| header.to_string())
            .collect::<Vec<_>>(),
        &widths,
    ));
    for row in sanitized_rows {
        lines.push(format_table_line(&row, &widths));
    }
    lines.join("\n")
}

fn sanitize_table_cell(value: &str) -> String {
    value.replace('\n', "\\n").replace('\r', "\\r")
}

fn format_table_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let cell = cells.get(idx).map(String::as_str).unwrap_or("");
        line.push_str(cell);
        let cell_len = cell.chars().count();
        if *width > cell_len {
            line.push_str(&" ".repeat(*width - cell_len));
        }
    }
    line
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, is_tty));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Validation => "invalid input".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Corrupt => "corrupt data".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(line) = err.line() {
        inner.insert("line".to_string(), json!(line));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(line) = err.line() {
        lines.push(format!(
            "{} {line}",
            colorize_label("line:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `corkboard --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "corkboard") else {
        return "Try `corkboard --help`.".to_string();
    };

    let mut parts = Vec::new();
    for token in tokens.iter().skip(pos + 1) {
        if token.starts_with('-') || token.starts_with('<') || token.starts_with('[') {
            break;
        }
        parts.push(*token);
    }

    if parts.is_empty() {
        return "Try `corkboard --help`.".to_string();
    }

    format!("Try `corkboard {} --help`.", parts.join(" "))
}

fn add_io_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Permission => err.with_hint(
            "Permission denied. Check file permissions or use --store for a writable location.",
        ),
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        _ => err,
    }
}

fn add_corrupt_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Corrupt || err.hint().is_some() {
        return err;
    }
    err.with_hint("Store file appears corrupt. Inspect the reported line or move the file aside.")
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_BACKTRACE=1 and share command/context if it persists.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_args_rewrites_triple_dash_help() {
        let args = normalize_args(vec![
            OsString::from("corkboard"),
            OsString::from("---help"),
            OsString::from("list"),
        ]);
        assert_eq!(args[1], OsString::from("--help"));
        assert_eq!(args[2], OsString::from("list"));
    }

    #[test]
    fn error_text_respects_color_flag() {
        let err = Error::new(ErrorKind::Validation).with_message("Message is required");
        let plain = error_text(&err, false);
        assert_eq!(plain, "error: Message is required");

        let colored = error_text(&err, true);
        assert!(colored.contains("\u{1b}[31merror:\u{1b}[0m"));
    }

    #[test]
    fn error_json_includes_hint_path_line_and_causes() {
        let io_err = io::Error::other("disk on fire");
        let err = Error::new(ErrorKind::Corrupt)
            .with_message("invalid record json")
            .with_path("/tmp/feedback.jsonl")
            .with_line(4)
            .with_hint("move the file aside")
            .with_source(io_err);

        let value = error_json(&err);
        let inner = value.get("error").expect("error object");
        assert_eq!(inner["kind"], "Corrupt");
        assert_eq!(inner["message"], "invalid record json");
        assert_eq!(inner["hint"], "move the file aside");
        assert_eq!(inner["path"], "/tmp/feedback.jsonl");
        assert_eq!(inner["line"], 4);
        assert_eq!(inner["causes"][0], "disk on fire");
    }

    #[test]
    fn render_table_pads_columns() {
        let rendered = render_table(
            &["ID", "MESSAGE"],
            &[
                vec!["1".to_string(), "short".to_string()],
                vec!["10".to_string(), "rather longer".to_string()],
            ],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID  "));
        assert!(lines[1].starts_with("1   short"));
        assert!(lines[2].starts_with("10  rather longer"));
    }

    #[test]
    fn render_table_escapes_newlines_in_cells() {
        let rendered = render_table(
            &["MESSAGE"],
            &[vec!["line one\nline two".to_string()]],
        );
        assert!(rendered.contains("line one\\nline two"));
    }

    #[test]
    fn hints_do_not_overwrite_existing_hints() {
        let err = Error::new(ErrorKind::Io).with_hint("already hinted");
        let err = add_io_hint(err);
        assert_eq!(err.hint(), Some("already hinted"));
    }
}
