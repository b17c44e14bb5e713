//! `mintflow` command line

#![allow(missing_docs, unreachable_pub)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use ed25519_dalek::SigningKey;
use mintflow_core::{ContentStore, EntryAddress, MintPipeline, PipelineInput, RunFailure};
use mintflow_ledger::LocalLedger;
use mintflow_storage::{FsContentStore, HttpContentStore, MemoryContentStore};
use serde_json::json;

mod config;
mod keys;
mod telemetry;

use config::{AppConfig, StorageBackend, StorageSection};

/// Exit status of a run that created an entry but could not verify it
const EXIT_UNVERIFIED: u8 = 2;

fn cli() -> Command {
    Command::new("mintflow")
        .version(mintflow_core::VERSION)
        .about("Publish an asset, mint a registry entry for it and verify its group membership")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .env("MINTFLOW_CONFIG")
                .value_parser(value_parser!(PathBuf))
                .help("Path to mintflow.toml"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .value_parser(["pretty", "json"])
                .help("Override [logging].format"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("keygen")
                .about("Write a fresh authority keypair to [ledger].authority_keypair")
                .arg(
                    Arg::new("force")
                        .long("force")
                        .action(clap::ArgAction::SetTrue)
                        .help("Overwrite an existing keypair file"),
                ),
        )
        .subcommand(
            Command::new("group")
                .about("Manage groups")
                .subcommand_required(true)
                .subcommand(
                    Command::new("create")
                        .about("Register a group owned by the authority keypair")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(
                            Arg::new("symbol")
                                .long("symbol")
                                .help("Defaults to [pipeline].default_symbol"),
                        )
                        .arg(Arg::new("uri").long("uri").default_value("")),
                ),
        )
        .subcommand(
            Command::new("mint")
                .about("Run the publish, mint and verify pipeline for one asset")
                .arg(
                    Arg::new("image")
                        .long("image")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("metadata")
                        .long("metadata")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("group")
                        .long("group")
                        .help("Override [pipeline].group"),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print a ledger entry")
                .arg(Arg::new("address").long("address").required(true)),
        )
        .subcommand(
            Command::new("journal")
                .about("Inspect the ledger journal")
                .subcommand_required(true)
                .subcommand(Command::new("verify").about("Check hash chain and signatures")),
        )
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    telemetry::init(&config.logging.filter, config.logging.format);

    match dispatch(&matches, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(matches: &ArgMatches) -> Result<AppConfig> {
    let mut config = AppConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    if let Some(format) = matches.get_one::<String>("log-format") {
        config.logging.format = format.parse()?;
    }
    Ok(config)
}

async fn dispatch(matches: &ArgMatches, config: &AppConfig) -> Result<ExitCode> {
    match matches.subcommand() {
        Some(("keygen", args)) => keygen(config, args.get_flag("force")),
        Some(("group", args)) => match args.subcommand() {
            Some(("create", args)) => create_group(config, args).await,
            _ => Err(anyhow!("unknown group command")),
        },
        Some(("mint", args)) => mint(config, args).await,
        Some(("show", args)) => {
            let address = args
                .get_one::<String>("address")
                .context("--address is required")?;
            show(config, address).await
        }
        Some(("journal", args)) => match args.subcommand() {
            Some(("verify", _)) => verify_journal(config).await,
            _ => Err(anyhow!("unknown journal command")),
        },
        _ => Err(anyhow!("no command given")),
    }
}

fn keygen(config: &AppConfig, force: bool) -> Result<ExitCode> {
    let path = &config.ledger.authority_keypair;
    if path.exists() && !force {
        return Err(anyhow!("{} exists; pass --force to replace it", path.display()));
    }
    let key = SigningKey::generate(&mut rand::rngs::OsRng);
    keys::save_authority(path, &key)?;
    print_json(&json!({
        "keypair": path.display().to_string(),
        "authority": hex_key(&key),
    }))?;
    Ok(ExitCode::SUCCESS)
}

async fn create_group(config: &AppConfig, args: &ArgMatches) -> Result<ExitCode> {
    let name = args.get_one::<String>("name").context("--name is required")?;
    let symbol = args
        .get_one::<String>("symbol")
        .unwrap_or(&config.pipeline.default_symbol);
    let uri = args.get_one::<String>("uri").map_or("", String::as_str);

    let ledger = open_ledger(config, keys::load_authority(&config.ledger.authority_keypair)?).await?;
    let group = ledger.register_group(name, symbol, uri).await?;

    print_json(&json!({ "group": group, "name": name, "symbol": symbol }))?;
    Ok(ExitCode::SUCCESS)
}

async fn mint(config: &AppConfig, args: &ArgMatches) -> Result<ExitCode> {
    let image = args.get_one::<PathBuf>("image").context("--image is required")?;
    let metadata = args
        .get_one::<PathBuf>("metadata")
        .context("--metadata is required")?;
    let pipeline_config = config.pipeline_config(args.get_one::<String>("group").map(String::as_str))?;

    let store = open_store(&config.storage)?;
    let ledger = open_ledger(config, keys::load_authority(&config.ledger.authority_keypair)?).await?;
    let pipeline = MintPipeline::new(pipeline_config, store, Arc::new(ledger));

    match pipeline.run(PipelineInput::from_paths(image, metadata)).await {
        Ok(outcome) => {
            print_json(&json!({ "status": "done", "outcome": outcome }))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            print_json(&failure_report(&failure))?;
            Ok(ExitCode::from(exit_code_for(&failure)))
        }
    }
}

async fn show(config: &AppConfig, address: &str) -> Result<ExitCode> {
    let ledger = open_ledger(config, read_only_key()).await?;
    let entry = ledger
        .entry(&EntryAddress::new(address))
        .with_context(|| format!("no entry at {address}"))?;
    print_json(&serde_json::to_value(entry)?)?;
    Ok(ExitCode::SUCCESS)
}

async fn verify_journal(config: &AppConfig) -> Result<ExitCode> {
    let ledger = open_ledger(config, read_only_key()).await?;
    let transactions = ledger.journal().len();
    match ledger.verify_journal() {
        Ok(()) => {
            print_json(&json!({ "valid": true, "transactions": transactions }))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            print_json(&json!({
                "valid": false,
                "transactions": transactions,
                "error": e.to_string(),
            }))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn open_store(storage: &StorageSection) -> Result<Arc<dyn ContentStore>> {
    let store: Arc<dyn ContentStore> = match storage.backend {
        StorageBackend::Fs => {
            Arc::new(FsContentStore::new(&storage.root).with_scheme(storage.scheme.clone()))
        }
        StorageBackend::Memory => Arc::new(MemoryContentStore::new()),
        StorageBackend::Http => Arc::new(HttpContentStore::new(storage.http.clone())?),
    };
    tracing::debug!(backend = ?storage.backend, "Content store ready");
    Ok(store)
}

async fn open_ledger(config: &AppConfig, authority: SigningKey) -> Result<LocalLedger> {
    LocalLedger::open(&config.ledger.state_path, authority)
        .await
        .with_context(|| format!("opening ledger {}", config.ledger.state_path.display()))
}

/// Key for commands that never submit a transaction
fn read_only_key() -> SigningKey {
    SigningKey::generate(&mut rand::rngs::OsRng)
}

fn hex_key(key: &SigningKey) -> String {
    hex::encode(key.verifying_key().as_bytes())
}

fn exit_code_for(failure: &RunFailure) -> u8 {
    if failure.left_ledger_artifact() {
        EXIT_UNVERIFIED
    } else {
        1
    }
}

fn failure_report(failure: &RunFailure) -> serde_json::Value {
    json!({
        "status": "failed",
        "run_id": failure.run_id,
        "state": failure.state().to_string(),
        "error": {
            "kind": failure.error.kind(),
            "message": failure.error.to_string(),
        },
        "entry": failure.entry,
        "history": failure.history,
    })
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
