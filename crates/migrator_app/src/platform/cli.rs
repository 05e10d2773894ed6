use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use engine_logging::{engine_info, engine_warn};
use migrator_core::{update, AppState, MessageId, Msg};
use migrator_engine::{
    ContentStore, EngineHandle, IdentityOutcome, IdentityRequest, IpfsRelayStore, LedgerChain,
    LocalContentStore, NotePublisher, ReqwestFetcher, SigningContext,
};

use super::app::{load_msg, Driver};
use super::config::{AppConfig, StorageConfig};
use super::effects::{request_identity, EffectRunner};
use super::logging::{self, LogDestination};
use super::persistence::ProgressStore;
use super::ui::render;

#[derive(Parser)]
#[command(name = "migrator")]
#[command(version)]
#[command(about = "Migrate an exported chat history into on-chain notes", long_about = None)]
pub struct Cli {
    /// Config file (defaults to ./migrator.ron when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Hex private key of the signing wallet
    #[arg(long, global = true, env = "MIGRATOR_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Where log output goes
    #[arg(long, global = true, value_enum, default_value_t = LogDestination::File)]
    log: LogDestination,

    /// Log debug detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the messages and their migration status
    List,
    /// Migrate the selected messages, in export order
    Run {
        /// Flip the selection of a message before starting (repeatable)
        #[arg(long = "toggle", value_name = "ID")]
        toggles: Vec<MessageId>,
        /// Change whether service messages are selected by default
        #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
        include_service: Option<bool>,
    },
    /// Persist settings without running
    Settings {
        #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
        include_service: bool,
    },
    /// Forget which messages were migrated
    Reset,
    /// Print the address of the signing wallet
    Whoami,
    /// Manage operators of the configured character
    Operator {
        #[command(subcommand)]
        action: OperatorAction,
    },
}

#[derive(Subcommand)]
enum OperatorAction {
    /// Check whether an address may post for the character
    Check { address: String },
    /// Grant an address permission to post for the character
    Add { address: String },
    /// Revoke a previously granted operator
    Remove { address: String },
}

pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;
    let private_key = cli.private_key.as_deref();

    match cli.command {
        Commands::List => list(&config),
        Commands::Run {
            toggles,
            include_service,
        } => run_migration(
            &config,
            private_key,
            &toggles,
            include_service,
            io::stdout().lock(),
        ),
        Commands::Settings { include_service } => {
            progress_store(&config)
                .set_include_service(include_service)
                .context("saving settings")?;
            println!("includeService = {include_service}");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Reset => {
            let store = progress_store(&config);
            store.reset_finished().context("resetting progress")?;
            println!("Cleared finished messages in {}", store.path().display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Whoami => identity_command(&config, private_key, IdentityRequest::SignerAddress),
        Commands::Operator { action } => {
            let request = match action {
                OperatorAction::Check { address } => IdentityRequest::CheckOperator { operator: address },
                OperatorAction::Add { address } => IdentityRequest::AddOperator { operator: address },
                OperatorAction::Remove { address } => {
                    IdentityRequest::RemoveOperator { operator: address }
                }
            };
            identity_command(&config, private_key, request)
        }
    }
}

fn progress_store(config: &AppConfig) -> ProgressStore {
    ProgressStore::new(config.state_dir.clone())
}

fn list(config: &AppConfig) -> Result<ExitCode> {
    let msg = load_msg(&config.export_path, progress_store(config).load());
    let (state, _) = update(AppState::new(), msg);
    let view = state.view();

    let mut out = io::stdout().lock();
    out.write_all(render::list(&view).as_bytes())?;
    if let Some(message) = &view.error_dialog {
        out.write_all(render::error_dialog(message).as_bytes())?;
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Refuses a run before the progress record is touched when nothing could be signed.
fn run_migration<W: Write>(
    config: &AppConfig,
    private_key: Option<&str>,
    toggles: &[MessageId],
    include_service: Option<bool>,
    mut out: W,
) -> Result<ExitCode> {
    let identity = signing_context(config, private_key)?;
    if let Err(err) = identity.ensure_ready() {
        let err = err.into_migrate(None);
        engine_warn!("Run refused: {}", err);
        out.write_all(render::error_dialog(&err.to_string()).as_bytes())?;
        return Ok(ExitCode::FAILURE);
    }
    let engine = build_engine(config, Arc::new(identity))?;
    let runner = EffectRunner::new(engine, progress_store(config), config.channel.clone());
    let mut driver = Driver::new(runner, out);

    driver.load(&config.export_path)?;
    if driver.failure().is_some() {
        return Ok(ExitCode::FAILURE);
    }
    if let Some(include_service) = include_service {
        driver.dispatch(Msg::IncludeServiceChanged(include_service))?;
    }
    for &id in toggles {
        if driver.state().candidate(id).is_none() {
            engine_warn!("--toggle {}: no such message in the export", id);
            eprintln!("warning: message {id} is not in the export");
            continue;
        }
        driver.dispatch(Msg::SelectionToggled(id))?;
    }
    driver.dispatch(Msg::StartClicked)?;

    Ok(match driver.failure() {
        Some(_) => ExitCode::FAILURE,
        None => ExitCode::SUCCESS,
    })
}

fn identity_command(
    config: &AppConfig,
    private_key: Option<&str>,
    request: IdentityRequest,
) -> Result<ExitCode> {
    let identity = signing_context(config, private_key)?;
    let engine = build_engine(config, Arc::new(identity))?;
    match request_identity(&engine, request) {
        Ok(IdentityOutcome::Signer(address)) => println!("{address}"),
        Ok(IdentityOutcome::IsOperator(true)) => println!("operator"),
        Ok(IdentityOutcome::IsOperator(false)) => println!("not an operator"),
        Ok(IdentityOutcome::Submitted { transaction_hash }) => {
            println!("submitted {transaction_hash}")
        }
        Err(err) => {
            print!("{}", render::error_dialog(&err.to_string()));
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn signing_context(config: &AppConfig, private_key: Option<&str>) -> Result<SigningContext> {
    let chain = LedgerChain::open(config.ledger_path.clone())
        .with_context(|| format!("opening ledger in {}", config.ledger_path.display()))?;
    let mut identity = SigningContext::new(Box::new(chain));
    match private_key {
        Some(key) => {
            identity
                .init_with_private_key(key)
                .context("loading private key")?;
        }
        None => engine_info!("No private key supplied; signing calls will fail"),
    }
    if let Some(character) = config.character_id {
        identity.select_character(character);
    }
    Ok(identity)
}

/// Wires signing context, store, fetcher and publisher into an engine worker.
fn build_engine(config: &AppConfig, identity: Arc<SigningContext>) -> Result<EngineHandle> {
    let store: Arc<dyn ContentStore> = match &config.storage {
        StorageConfig::Local(dir) => Arc::new(LocalContentStore::new(dir.clone())),
        StorageConfig::Relay(endpoint) => Arc::new(
            IpfsRelayStore::new(
                endpoint.clone(),
                Duration::from_secs(config.fetch.request_timeout_secs),
            )
            .context("building relay client")?,
        ),
    };
    let fetcher = Arc::new(ReqwestFetcher::new(config.fetch_settings()));
    let publisher = NotePublisher::new(fetcher, store, identity.clone(), config.publish_settings());

    Ok(EngineHandle::new(Arc::new(publisher), identity))
}
