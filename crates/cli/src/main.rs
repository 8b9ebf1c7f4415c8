use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use verdant_api::VerdantClient;
use verdant_engine::{ChannelObserver, FieldFetch, FieldFillOrchestrator, FillEvent, FillRequest, HttpFillTransport};
use verdant_types::{FieldSchema, ProgressField, VerdantSettings};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = build_cli().get_matches();
    let settings = verdant_util::load_settings().context("failed to load settings")?;

    match matches.subcommand() {
        Some(("fill", sub)) => run_fill(&settings, sub).await,
        Some(("field", sub)) => run_field(&settings, sub).await,
        _ => bail!("expected a subcommand: fill or field"),
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_cli() -> Command {
    let plant = Arg::new("plant")
        .long("plant")
        .short('p')
        .required(true)
        .action(ArgAction::Set)
        .help("Plant name sent to the AI backend");
    let language = Arg::new("language")
        .long("language")
        .action(ArgAction::Set)
        .help("Answer language code, e.g. en or fr");

    Command::new("verdant")
        .about("AI-assisted completion of plant records")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("fill")
                .about("Fill the empty fields of a plant record")
                .arg(plant.clone())
                .arg(
                    Arg::new("schema")
                        .long("schema")
                        .short('s')
                        .action(ArgAction::Set)
                        .help("Field schema (JSON or YAML); omit for a whole-record request"),
                )
                .arg(
                    Arg::new("existing")
                        .long("existing")
                        .short('e')
                        .action(ArgAction::Set)
                        .help("Current record (JSON or YAML object)"),
                )
                .arg(
                    Arg::new("field")
                        .long("field")
                        .short('f')
                        .action(ArgAction::Append)
                        .help("Only fill this field; repeatable"),
                )
                .arg(language.clone())
                .arg(
                    Arg::new("continue-on-error")
                        .long("continue-on-error")
                        .action(ArgAction::SetTrue)
                        .help("Keep going when a field fails"),
                ),
        )
        .subcommand(
            Command::new("field")
                .about("Fetch a single field value")
                .arg(plant)
                .arg(Arg::new("schema").long("schema").short('s').required(true).action(ArgAction::Set))
                .arg(Arg::new("field").long("field").short('f').required(true).action(ArgAction::Set))
                .arg(
                    Arg::new("existing-value")
                        .long("existing-value")
                        .action(ArgAction::Set)
                        .help("Current value; parsed as JSON, otherwise taken as a string"),
                )
                .arg(language),
        )
}

fn build_orchestrator(settings: &VerdantSettings) -> Result<FieldFillOrchestrator<HttpFillTransport>> {
    let client = VerdantClient::new(&settings.api)?;
    Ok(FieldFillOrchestrator::new(HttpFillTransport::new(client), settings.fill.clone()))
}

/// Token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling");
            trigger.cancel();
        }
    });
    cancel
}

async fn run_fill(settings: &VerdantSettings, matches: &ArgMatches) -> Result<()> {
    let plant = required(matches, "plant")?;
    let schema = matches
        .get_one::<String>("schema")
        .map(|path| read_structured::<FieldSchema>(Path::new(path)))
        .transpose()?;
    let existing = matches
        .get_one::<String>("existing")
        .map(|path| read_structured::<Map<String, Value>>(Path::new(path)))
        .transpose()?
        .unwrap_or_default();
    let fields: Vec<String> = matches
        .get_many::<String>("field")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let mut request = FillRequest::new(plant, schema)
        .with_existing_data(existing)
        .continue_on_field_error(matches.get_flag("continue-on-error"))
        .with_cancellation(cancel_on_ctrl_c());
    if !fields.is_empty() {
        request = request.with_fields(fields);
    }
    if let Some(language) = matches.get_one::<String>("language") {
        request = request.with_language(language);
    }

    let orchestrator = build_orchestrator(settings)?;
    let (event_tx, event_rx) = unbounded_channel();
    let reporter = tokio::spawn(report_events(event_rx));
    let observer = ChannelObserver::new(event_tx);

    let outcome = orchestrator.fill(&request, &observer).await;
    drop(observer);
    let _ = reporter.await;

    let record = outcome.with_context(|| format!("failed to fill '{}'", request.entity_name))?;
    println!("{}", serde_json::to_string_pretty(&Value::Object(record))?);
    Ok(())
}

async fn run_field(settings: &VerdantSettings, matches: &ArgMatches) -> Result<()> {
    let plant = required(matches, "plant")?;
    let schema = read_structured::<FieldSchema>(Path::new(required(matches, "schema")?))?;
    let field = required(matches, "field")?;
    let existing_value = matches.get_one::<String>("existing-value").map(|raw| parse_existing_value(raw));

    let fetch = FieldFetch::new(plant, schema, field)
        .with_existing_value(existing_value)
        .with_language(matches.get_one::<String>("language").cloned());

    let orchestrator = build_orchestrator(settings)?;
    let value = orchestrator.fetch_field(&fetch, &cancel_on_ctrl_c()).await?;
    println!("{}", serde_json::to_string_pretty(&value.unwrap_or(Value::Null))?);
    Ok(())
}

async fn report_events(mut event_rx: UnboundedReceiver<FillEvent>) {
    while let Some(event) = event_rx.recv().await {
        match event {
            FillEvent::Progress(progress) => match progress.field {
                ProgressField::Init => info!(total = progress.total, "fill started"),
                ProgressField::Complete => info!(total = progress.total, "fill complete"),
                ProgressField::Field(field) => info!(field = %field, completed = progress.completed, total = progress.total, "progress"),
            },
            FillEvent::FieldCompleted { field, value } => match value {
                Some(value) => info!(field = %field, value = %value, "field filled"),
                None => info!(field = %field, "field cleared"),
            },
            FillEvent::FieldFailed { field, message } => warn!(field = %field, error = %message, "field failed"),
        }
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing --{name}"))
}

/// Read a JSON file, or YAML when the extension says so.
fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
    }
}

fn parse_existing_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
