//! `outline-graft`: insert nodes into stored outline documents
//!
//! Documents live as `<id>.json` files under `--store`. Exit status is `0`
//! on success, `2` when the request itself was invalid, and `1` for any
//! other failure (including an inconsistent document under `check`).

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use graft_core::{
    DocumentId, DocumentState, DocumentStore, ErrorClass, GraftConfig, GraftError, GraftService,
    InsertRequest, JsonFileStore,
};
use graft_tree::Direction;
use graft_views::{assembly, NodeTable};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_STORE: &str = "documents";
const BAD_INPUT_EXIT: u8 = 2;

type Service = GraftService<JsonFileStore>;

fn cli() -> Command {
    let document = || {
        Arg::new("document")
            .required(true)
            .value_parser(value_parser!(DocumentId))
            .help("Document id")
    };

    Command::new("outline-graft")
        .version(graft_core::VERSION)
        .about("Identifier-stable node insertion across text, table and graph views")
        .subcommand_required(true)
        .arg(
            Arg::new("store")
                .long("store")
                .global(true)
                .default_value(DEFAULT_STORE)
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding <document>.json files"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("insert")
                .about("Insert a node relative to an existing one")
                .arg(document())
                .arg(Arg::new("source").required(true).help("Source node id, e.g. 2.1"))
                .arg(
                    Arg::new("direction")
                        .required(true)
                        .value_parser(value_parser!(Direction))
                        .help("child, left-sibling or right-sibling"),
                )
                .arg(
                    Arg::new("label")
                        .long("label")
                        .help("Label for the new node"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print a stored document")
                .arg(document())
                .arg(
                    Arg::new("view")
                        .long("view")
                        .default_value("all")
                        .value_parser(["text", "table", "graph", "all"])
                        .help("Which view to print"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Report id disagreements between the three views")
                .arg(document()),
        )
        .subcommand(Command::new("list").about("List stored documents"))
        .subcommand(
            Command::new("assemble")
                .about("Build a document from plain text, a node table and a graph")
                .arg(document())
                .arg(path_arg("text", "Plain source text"))
                .arg(path_arg("table", "Node table as JSON"))
                .arg(path_arg("graph", "Mermaid flowchart")),
        )
}

fn path_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match run(&matches).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            exit_code(&err)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<GraftError>().map(GraftError::class) {
        Some(ErrorClass::BadInput) => ExitCode::from(BAD_INPUT_EXIT),
        _ => ExitCode::FAILURE,
    }
}

async fn run(matches: &ArgMatches) -> Result<ExitCode> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => GraftConfig::load(path)
            .await
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GraftConfig::default(),
    };

    let root = matches
        .get_one::<PathBuf>("store")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE));
    let store = JsonFileStore::open(&root)
        .await
        .with_context(|| format!("opening store {}", root.display()))?;
    let service = GraftService::new(config, Arc::new(store));

    match matches.subcommand() {
        Some(("insert", args)) => insert(&service, args).await,
        Some(("show", args)) => show(&service, args).await,
        Some(("check", args)) => check(&service, args).await,
        Some(("list", _)) => list(&service).await,
        Some(("assemble", args)) => assemble(&service, args).await,
        Some((other, _)) => bail!("unknown command '{other}'"),
        None => bail!("no command given"),
    }
}

fn required<'a, T>(args: &'a ArgMatches, name: &str) -> Result<&'a T>
where
    T: Clone + Send + Sync + 'static,
{
    args.get_one::<T>(name)
        .with_context(|| format!("missing argument '{name}'"))
}

async fn insert(service: &Service, args: &ArgMatches) -> Result<ExitCode> {
    let document = required::<DocumentId>(args, "document")?.clone();
    let source = required::<String>(args, "source")?.clone();
    let direction = *required::<Direction>(args, "direction")?;

    let mut request = InsertRequest::new(document, source, direction);
    if let Some(label) = args.get_one::<String>("label") {
        request = request.with_label(label.clone());
    }

    let outcome = service.insert_node(request).await?;
    let summary = serde_json::json!({
        "new_id": outcome.new_id,
        "rename_count": outcome.rename_count,
        "renames": outcome.renames,
        "revision": outcome.state.revision,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::SUCCESS)
}

async fn show(service: &Service, args: &ArgMatches) -> Result<ExitCode> {
    let document = required::<DocumentId>(args, "document")?;
    let state = service.document(document).await?;

    match required::<String>(args, "view")?.as_str() {
        "text" => print!("{}", state.text),
        "table" => println!("{}", serde_json::to_string_pretty(&state.table)?),
        "graph" => print!("{}", state.graph),
        _ => println!("{}", serde_json::to_string_pretty(&state)?),
    }
    Ok(ExitCode::SUCCESS)
}

async fn check(service: &Service, args: &ArgMatches) -> Result<ExitCode> {
    let document = required::<DocumentId>(args, "document")?;
    let report = service.check(document).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_consistent() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!(
            document = %document,
            discrepancies = report.discrepancies.len(),
            duplicates = report.duplicate_markers.len(),
            "views disagree"
        );
        Ok(ExitCode::FAILURE)
    }
}

async fn list(service: &Service) -> Result<ExitCode> {
    for id in service.store().list().await? {
        println!("{id}");
    }
    Ok(ExitCode::SUCCESS)
}

async fn assemble(service: &Service, args: &ArgMatches) -> Result<ExitCode> {
    let document = required::<DocumentId>(args, "document")?;
    let text = read(args, "text").await?;
    let table: NodeTable =
        serde_json::from_str(&read(args, "table").await?).context("parsing node table")?;
    let graph = read(args, "graph").await?;

    let tagged = assembly::tag_paragraphs(&text);
    let annotated = assembly::build_annotated_document(&tagged, &table);
    let state = DocumentState::new(annotated.render(), table, graph);

    let report = state.check_consistency()?;
    service.import(document, state).await?;
    if !report.is_consistent() {
        tracing::warn!(
            document = %document,
            discrepancies = report.discrepancies.len(),
            "assembled document has disagreeing views"
        );
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

async fn read(args: &ArgMatches, name: &str) -> Result<String> {
    let path = required::<PathBuf>(args, name)?;
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}
