//! Purpose: Hold top-level CLI command dispatch for `corkboard`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Command behavior, output envelopes, and exit code semantics stay unchanged.
//! Invariants: Helpers in `main.rs` remain the source of command output formatting.

use super::*;

pub(super) fn dispatch_command(
    command: Command,
    store_path: PathBuf,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "corkboard", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Serve {
            bind,
            max_body_bytes,
        } => {
            let bind: SocketAddr = bind.parse().map_err(|_| {
                Error::new(ErrorKind::Usage)
                    .with_message("invalid bind address")
                    .with_hint("Use a host:port value like 127.0.0.1:9800.")
            })?;
            let config = serve::ServeConfig {
                bind,
                store_path,
                max_body_bytes,
            };
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
        Command::Add { message, url } => {
            let message = resolve_add_message(message)?;
            let record = match url {
                Some(url) => RemoteClient::new(url)?.submit(&message)?,
                None => Board::open(&store_path)?.submit(Some(&message))?,
            };
            let value = serde_json::to_value(&record).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to encode record")
                    .with_source(err)
            })?;
            emit_json(value);
            Ok(RunOutcome::ok())
        }
        Command::List { json, url } => {
            let page = match url {
                Some(url) => RemoteClient::new(url)?.list()?,
                None => Board::open(&store_path)?.list()?,
            };
            emit_page(&page, json)?;
            Ok(RunOutcome::ok())
        }
        Command::Check { json } => {
            if store_path.as_os_str() == MEMORY_STORE_PATH {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("check requires a journal file")
                    .with_hint("The :memory: store has no file to scan; pass --store PATH."));
            }
            let journal = Journal::open(&store_path)?;
            let records = journal.verify()?;
            if json || !io::stdout().is_terminal() {
                emit_json(json!({
                    "ok": true,
                    "records": records,
                    "path": store_path.display().to_string(),
                }));
            } else {
                println!("{}: healthy", store_path.display());
                println!("  records: {records}");
            }
            Ok(RunOutcome::ok())
        }
    }
}
