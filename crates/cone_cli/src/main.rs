//! cone: command-line front end for the note index.
//!
//! Every subcommand runs one core operation against the index database and
//! prints the result as pretty JSON on stdout. `stats` inspects the file
//! without creating it; the other commands open (and migrate) it first.

use clap::{Parser, Subcommand};
use cone_core::{
    database_info, default_db_path, default_log_level, init_logging, open_db, reset_db,
    GraphQuery, IndexConfig, IndexRequest, IndexService, LoggingOptions, MetadataValue,
    NoteMetadata, QueryService,
};
use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::UNIX_EPOCH;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "cone")]
#[command(author, version, about = "Index notes and query backlinks and the link graph")]
#[command(propagate_version = true)]
struct Cli {
    /// Index database file
    #[arg(long, global = true, env = "CONE_DB", conflicts_with = "vault")]
    db: Option<PathBuf>,

    /// Vault directory; the database lives at <vault>/.cone_index.sqlite3
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "CONE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory for rolling log files; logging is off when unset
    #[arg(long, global = true, env = "CONE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index one note file
    Index {
        /// Note file to read
        file: PathBuf,

        /// Storage path to index under (default: FILE relative to the vault)
        #[arg(long)]
        path: Option<String>,

        /// Modification time in epoch milliseconds (default: file mtime)
        #[arg(long)]
        modified_at: Option<i64>,

        /// Upper bound on chunk size, in characters
        #[arg(long, default_value_t = IndexConfig::default().max_chunk_chars)]
        max_chunk_chars: usize,

        /// Metadata entry KEY=VALUE (repeatable)
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        metadata: Vec<String>,
    },

    /// Show note metadata, headings, backlinks, and outbound links
    Info {
        /// Storage path of the note
        path: String,
    },

    /// List notes linking to a note
    Backlinks {
        /// Storage path of the note
        path: String,
    },

    /// Dump recent notes and link edges
    Graph {
        /// Maximum node count (default 200)
        #[arg(long)]
        limit: Option<u32>,

        /// Minimum link occurrences for an edge
        #[arg(long, default_value_t = 1)]
        min_degree: u32,
    },

    /// List stored chunks of a note
    Chunks {
        /// Storage path of the note
        path: String,
    },

    /// Remove a note and everything derived from it
    Remove {
        /// Storage path of the note
        path: String,
    },

    /// Show database path, file size, schema version, and table row counts
    Stats,

    /// Delete the database (with its WAL files) and recreate an empty schema
    Reset,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = setup_logging(&cli) {
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(cli: &Cli) -> CliResult<()> {
    let Some(log_dir) = &cli.log_dir else {
        return Ok(());
    };
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    let mut options = LoggingOptions::new(level, absolute(log_dir)?);
    options.echo_to_stderr = true;
    init_logging(&options)?;
    Ok(())
}

fn run(cli: Cli) -> CliResult<()> {
    let db_path = resolve_db_path(&cli)?;

    match cli.command {
        Commands::Index {
            file,
            path,
            modified_at,
            max_chunk_chars,
            metadata,
        } => {
            let request = IndexRequest {
                path: match path {
                    Some(path) => path,
                    None => storage_path(&file, cli.vault.as_deref())?,
                },
                content: std::fs::read_to_string(&file)?,
                modified_at: match modified_at {
                    Some(value) => value,
                    None => file_modified_millis(&file)?,
                },
                metadata: parse_metadata(&metadata)?,
            };
            let mut conn = open_db(&db_path)?;
            let mut service =
                IndexService::try_new(&mut conn, IndexConfig { max_chunk_chars })?;
            print_json(&service.index_note(&request)?)
        }
        Commands::Info { path } => {
            let conn = open_db(&db_path)?;
            print_json(&QueryService::try_new(&conn)?.get_note_info(&path)?)
        }
        Commands::Backlinks { path } => {
            let conn = open_db(&db_path)?;
            print_json(&QueryService::try_new(&conn)?.get_backlinks(&path)?)
        }
        Commands::Graph { limit, min_degree } => {
            let conn = open_db(&db_path)?;
            let query = GraphQuery { limit, min_degree };
            print_json(&QueryService::try_new(&conn)?.get_graph(query)?)
        }
        Commands::Chunks { path } => {
            let conn = open_db(&db_path)?;
            print_json(&QueryService::try_new(&conn)?.list_chunks(&path)?)
        }
        Commands::Remove { path } => {
            let mut conn = open_db(&db_path)?;
            IndexService::try_new(&mut conn, IndexConfig::default())?.remove_note(&path)?;
            print_json(&serde_json::json!({ "removed": path }))
        }
        Commands::Stats => print_json(&database_info(&db_path)?),
        Commands::Reset => {
            drop(reset_db(&db_path)?);
            print_json(&database_info(&db_path)?)
        }
    }
}

fn resolve_db_path(cli: &Cli) -> CliResult<PathBuf> {
    if let Some(db) = &cli.db {
        return Ok(db.clone());
    }
    if let Some(vault) = &cli.vault {
        return Ok(default_db_path(vault));
    }
    Err("either --db (or CONE_DB) or --vault is required".into())
}

/// Storage path for `file`: relative to the vault when inside it, else as given.
fn storage_path(file: &Path, vault: Option<&Path>) -> CliResult<String> {
    let relative = vault
        .and_then(|vault| file.strip_prefix(vault).ok())
        .unwrap_or(file);
    relative
        .to_str()
        .map(str::to_string)
        .ok_or_else(|| format!("note path `{}` is not valid UTF-8", file.display()).into())
}

fn file_modified_millis(file: &Path) -> CliResult<i64> {
    let modified = std::fs::metadata(file)?.modified()?;
    let millis = modified.duration_since(UNIX_EPOCH)?.as_millis();
    Ok(i64::try_from(millis)?)
}

fn parse_metadata(entries: &[String]) -> CliResult<NoteMetadata> {
    let mut metadata = NoteMetadata::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("metadata entry `{entry}` must be KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("metadata entry `{entry}` has an empty key").into());
        }
        metadata.insert(key.to_string(), parse_metadata_value(value.trim()));
    }
    Ok(metadata)
}

fn parse_metadata_value(raw: &str) -> MetadataValue {
    if let Ok(value) = raw.parse::<bool>() {
        MetadataValue::Bool(value)
    } else if let Ok(value) = raw.parse::<i64>() {
        MetadataValue::Integer(value)
    } else if let Some(value) = raw.parse::<f64>().ok().filter(|value| value.is_finite()) {
        MetadataValue::Float(value)
    } else {
        MetadataValue::Text(raw.to_string())
    }
}

fn absolute(path: &Path) -> CliResult<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    info!("event=cli_command module=cli status=ok");
    Ok(())
}
