use anyhow::{bail, Context, Result};
use aznuke::azure::auth::AzureCredentials;
use aznuke::azure::http::format_azure_error;
use aznuke::azure::ops::AzureClientFactory;
use aznuke::azure::subscriptions::{list_subscriptions, select_profile};
use aznuke::config::Config;
use aznuke::engine::{ConsoleProgress, DeletionEngine, DeletionSettings};
use aznuke::report::{write_completion, write_scan_text, write_summary_by_type, ScanReport};
use aznuke::resource::discovery::{discover_all, filter_by_region, parse_resource_types};
use aznuke::resource::filter::{load_exclusions, partition};
use aznuke::resource::ResourceRecord;
use aznuke::safety::{confirm_deletion, remove_protected};
use aznuke::VERSION;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Exit status after a Ctrl-C during deletion
const INTERRUPTED_EXIT: u8 = 130;

/// Azure resource scanner and cleanup tool
#[derive(Parser, Debug)]
#[command(name = "aznuke", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Azure Resource Manager endpoint (sovereign clouds, emulators)
    #[arg(long, global = true)]
    endpoint: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan for resources in Azure
    Scan(ScanArgs),
    /// Delete resources in Azure
    Delete(DeleteArgs),
    /// Show or change the saved configuration
    Config(ConfigArgs),
}

/// Which resources a command looks at
#[derive(clap::Args, Debug)]
struct TargetArgs {
    /// Azure subscription display name
    #[arg(long)]
    profile: Option<String>,

    /// Azure region to target (e.g. westeurope)
    #[arg(long)]
    region: Option<String>,

    /// Comma-separated list of resource types
    #[arg(long)]
    checks: Option<String>,

    /// Path to the exclusions file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print full error chains
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args, Debug)]
struct ScanArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(clap::Args, Debug)]
struct DeleteArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Simulate the deletion without touching anything
    #[arg(long)]
    dry_run: bool,

    /// Subscription IDs that must not be modified
    #[arg(long, num_args = 1..)]
    protected_subscriptions: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

#[derive(clap::Args, Debug)]
struct ConfigArgs {
    /// Default exclusions file
    #[arg(long)]
    exclusions: Option<PathBuf>,

    /// Add a protected subscription ID
    #[arg(long)]
    protect: Vec<String>,

    /// Remove a protected subscription ID
    #[arg(long)]
    unprotect: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled, cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("aznuke {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = Config::config_dir() {
        return config_dir.join("aznuke.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".aznuke").join("aznuke.log");
    }
    PathBuf::from("aznuke.log")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);
    let config = Config::load();

    match args.command {
        Command::Scan(scan) => {
            let json = scan.output == OutputFormat::Json;
            let verbose = scan.target.verbose;
            match cmd_scan(scan, &config, args.endpoint.as_deref()).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) if json => {
                    println!("{}", serde_json::json!({ "error": format_azure_error(&err) }));
                    ExitCode::FAILURE
                }
                Err(err) => report_error(&err, verbose),
            }
        }
        Command::Delete(delete) => {
            let verbose = delete.target.verbose;
            match cmd_delete(delete, &config, args.endpoint.as_deref()).await {
                Ok(code) => code,
                Err(err) => report_error(&err, verbose),
            }
        }
        Command::Config(cfg) => match cmd_config(cfg, config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => report_error(&err, true),
        },
    }
}

fn report_error(err: &anyhow::Error, verbose: bool) -> ExitCode {
    tracing::error!("{:#}", err);
    eprintln!("\n[ERROR] {}", format_azure_error(err));
    if verbose {
        eprintln!("{err:?}");
    }
    ExitCode::FAILURE
}

fn client_factory(config: &Config, endpoint: Option<&str>) -> Result<AzureClientFactory> {
    let endpoint = config.effective_endpoint(endpoint);
    tracing::info!("Using management endpoint {}", endpoint);
    Ok(AzureClientFactory::new(AzureCredentials::from_environment())?
        .with_endpoint(&endpoint)
        .with_poll_interval(config.effective_poll_interval()))
}

/// Discovered resources split by the exclusion rules
struct Selection {
    total: usize,
    selected: Vec<ResourceRecord>,
    preserved: Vec<ResourceRecord>,
}

async fn select_resources(
    factory: &AzureClientFactory,
    config: &Config,
    target: &TargetArgs,
    protected: &[String],
    quiet: bool,
) -> Result<Selection> {
    let mut accounts = list_subscriptions(&factory.tenant_client())
        .await
        .context("Failed to list subscriptions")?;

    if let Some(profile) = &target.profile {
        accounts = select_profile(accounts, profile);
        if accounts.is_empty() {
            bail!("No subscriptions found matching profile '{}'", profile);
        }
    }
    accounts = remove_protected(accounts, protected);

    if !quiet {
        println!("Found {} accessible subscriptions", accounts.len());
        println!("[DISCOVERING] Starting resource discovery...");
    }

    let resource_types = parse_resource_types(target.checks.as_deref());
    let mut resources = discover_all(factory, &accounts, resource_types.as_deref()).await?;
    if let Some(region) = &target.region {
        resources = filter_by_region(resources, region);
    }
    let total = resources.len();

    let rules = load_exclusions(&config.effective_exclusions(target.config.as_deref()))?;
    let (selected, preserved) = partition(resources, &rules)?;

    Ok(Selection {
        total,
        selected,
        preserved,
    })
}

async fn cmd_scan(args: ScanArgs, config: &Config, endpoint: Option<&str>) -> Result<()> {
    let json = args.output == OutputFormat::Json;
    let factory = client_factory(config, endpoint)?;
    let selection = select_resources(&factory, config, &args.target, &[], json).await?;

    if json {
        let report = ScanReport::new(selection.total, &selection.selected, selection.preserved.len());
        println!("{}", report.to_json()?);
    } else {
        let mut stdout = std::io::stdout().lock();
        write_scan_text(
            &mut stdout,
            selection.total,
            &selection.selected,
            selection.preserved.len(),
        )?;
    }
    Ok(())
}

async fn cmd_delete(args: DeleteArgs, config: &Config, endpoint: Option<&str>) -> Result<ExitCode> {
    let factory = client_factory(config, endpoint)?;
    let protected = config.effective_protected(&args.protected_subscriptions);
    let selection = select_resources(&factory, config, &args.target, &protected, false).await?;

    println!("Found {} total resources", selection.total);
    println!("[SELECTED] {} resources for deletion", selection.selected.len());
    println!("[EXCLUDED] {} resources based on filters", selection.preserved.len());

    let proceed = if args.yes {
        let mut stdout = std::io::stdout().lock();
        write_summary_by_type(&mut stdout, &selection.selected)?;
        !selection.selected.is_empty()
    } else {
        confirm_deletion(
            &mut std::io::stdin().lock(),
            &mut std::io::stdout().lock(),
            &selection.selected,
            args.dry_run,
        )?
    };
    if !proceed {
        println!("\n[CANCELLED] Nothing was deleted");
        return Ok(ExitCode::SUCCESS);
    }

    let settings = DeletionSettings {
        dry_run: args.dry_run,
        simulated_delay: config.effective_simulated_delay(),
        ..DeletionSettings::default()
    };
    let engine = DeletionEngine::new(factory, settings);
    let progress = ConsoleProgress::new(if args.dry_run {
        "Dry run - simulating deletion"
    } else {
        "Deleting resources"
    });
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let mut stdout = std::io::stdout();
    match engine
        .delete_all_until(&selection.selected, &progress, interrupt)
        .await
    {
        Ok(result) => {
            write_completion(&mut stdout, &result, args.dry_run)?;
            stdout.flush()?;
            Ok(if result.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Err(interrupted) => {
            eprintln!("\n[INTERRUPTED] Operation cancelled by user");
            write_completion(&mut stdout, &interrupted.partial, args.dry_run)?;
            stdout.flush()?;
            Ok(ExitCode::from(INTERRUPTED_EXIT))
        }
    }
}

fn cmd_config(args: ConfigArgs, mut config: Config) -> Result<()> {
    let mut changed = false;

    if let Some(path) = args.exclusions {
        config.exclusions_path = Some(path);
        changed = true;
    }
    for id in &args.protect {
        changed |= config.protect(id);
    }
    for id in &args.unprotect {
        changed |= config.unprotect(id);
    }

    if changed {
        config.save()?;
        println!("Configuration saved");
    }
    if let Some(dir) = Config::config_dir() {
        println!("Config directory: {}", dir.display());
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
