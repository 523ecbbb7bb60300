//! classcache - command-line access to the local-first record cache.
//!
//! Every command works against the local data directory first. When a remote
//! endpoint is configured, writes are mirrored to it in the background and
//! the process waits for those mirrors before exiting.

use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use classcache_core::{Config, Engine, Session, Settings, SyncEvent, TableName};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: classcache <command> [args]

Commands:
  list <table>              Print the cached table
  pull <table>              Refresh the table from the remote endpoint and print it
  save <table> <json>       Insert or update a record
  delete <table> <id>       Delete a record
  import <table> <file>     Append every record of a JSON array file as new rows
  settings [<json>]         Show or replace the settings row
  session [show|set <json>|clear]
  endpoint [<url>|--clear]  Show, set or clear the remote endpoint

Tables: users, students, materials, submissions, settings";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let config = Config::load()?;
    let engine = Engine::open(&config)?;
    info!(command = %command, remote = engine.is_remote_enabled(), "classcache starting");

    let mut events = engine.events();
    let rest = &args[1..];
    match command.as_str() {
        "list" => print_json(&engine.table::<Value>(table_arg(rest)?).list())?,
        "pull" => pull(&engine, table_arg(rest)?).await?,
        "save" => {
            let table = table_arg(rest)?;
            let record = json_arg(rest.get(1), "record")?;
            print_json(&engine.table::<Value>(table).save(record))?;
        }
        "delete" => {
            let table = table_arg(rest)?;
            let id = rest.get(1).context("Missing record id")?;
            if !engine.table::<Value>(table).delete(id) {
                eprintln!("No record with id {} in {}", id, table);
            }
        }
        "import" => {
            let table = table_arg(rest)?;
            let path = rest.get(1).context("Missing import file")?;
            let records = read_records(Path::new(path))?;
            let imported = engine.table::<Value>(table).bulk_import(records);
            eprintln!("Imported {} records into {}", imported.len(), table);
        }
        "settings" => match rest.first() {
            Some(raw) => {
                let settings: Settings = serde_json::from_str(raw).context("Invalid settings JSON")?;
                print_json(&engine.settings().save(settings))?;
            }
            None => print_json(&engine.settings().current())?,
        },
        "session" => session(&engine, rest)?,
        "endpoint" => match rest.first().map(String::as_str) {
            Some("--clear") => engine.set_remote_endpoint(None)?,
            Some(url) => engine.set_remote_endpoint(Some(url))?,
            None => match engine.remote_endpoint().or(config.remote_endpoint.clone()) {
                Some(endpoint) => println!("{}", endpoint),
                None => println!("(local only)"),
            },
        },
        "help" | "--help" | "-h" => eprintln!("{}", USAGE),
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }

    // Let background remote writes finish before the runtime shuts down
    engine.settle().await;

    let failures = std::iter::from_fn(|| events.try_recv().ok())
        .filter(SyncEvent::is_failure)
        .count();
    if failures > 0 {
        eprintln!(
            "{} remote operation(s) failed; local data is unaffected (RUST_LOG=warn for details)",
            failures
        );
    }
    Ok(())
}

/// Subscribe to a table, wait for the remote snapshot, print the result.
async fn pull(engine: &Engine, table: TableName) -> Result<()> {
    if !engine.is_remote_enabled() {
        bail!("No remote endpoint configured; run `classcache endpoint <url>` first");
    }

    let mut events = engine.events();
    let subscription = engine.table::<Value>(table).subscribe(|_rows: Vec<Value>| {});
    engine.settle().await;
    subscription.unsubscribe();

    while let Ok(event) = events.try_recv() {
        if let SyncEvent::Reconciled { count, .. } = event {
            eprintln!("Updated {} from remote ({} records)", table, count);
        }
    }

    print_json(&engine.table::<Value>(table).list())
}

fn session(engine: &Engine, args: &[String]) -> Result<()> {
    let sessions = engine.session();
    match args.first().map(String::as_str) {
        None | Some("show") => match sessions.get() {
            Some(session) => print_json(&session)?,
            None => println!("(signed out)"),
        },
        Some("set") => {
            let session: Session = serde_json::from_value(json_arg(args.get(1), "session")?)
                .context("Session must look like {\"kind\": \"staff\"|\"student\", \"identity\": {...}}")?;
            sessions.set(&session)?;
            eprintln!("Signed in as {}", session.display_name());
        }
        Some("clear") => sessions.clear()?,
        Some(other) => bail!("Unknown session action: {}", other),
    }
    Ok(())
}

fn table_arg(args: &[String]) -> Result<TableName> {
    let raw = args.first().context("Missing table name")?;
    raw.parse::<TableName>().map_err(|e| anyhow::anyhow!(e))
}

fn json_arg(raw: Option<&String>, what: &str) -> Result<Value> {
    let raw = raw.with_context(|| format!("Missing {} JSON", what))?;
    serde_json::from_str(raw).with_context(|| format!("Invalid {} JSON", what))
}

fn read_records(path: &Path) -> Result<Vec<Value>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    match serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?
    {
        Value::Array(records) => Ok(records),
        _ => bail!("{} must contain a JSON array of records", path.display()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
