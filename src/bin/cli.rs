//! adaptive-locator command line
//!
//! Resolves a locator against a live page or a captured DOM snapshot and
//! inspects the healing ledger.

use adaptive_locator::browser::{BrowserSession, ConnectionOptions, LaunchOptions};
use adaptive_locator::{Document, DomSnapshot, Healer, HealerConfig, HealingLedger, SuggesterConfig};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SuggesterMode {
    /// Never ask for suggestions
    Disabled,
    /// Offline data-testid guesses
    Mock,
    /// Decide from MOCK_LLM / OPENAI_API_KEY (default)
    Env,
}

#[derive(Parser)]
#[command(name = "adaptive-locator")]
#[command(version)]
#[command(about = "Self-healing element resolution for browser UI tests", long_about = None)]
struct Cli {
    /// Directory holding the healing ledger (default: $SELF_HEALING_LEDGER_DIR or ./data/selectors)
    #[arg(long, global = true, value_name = "DIR")]
    ledger_dir: Option<PathBuf>,

    /// Semantic suggestion provider
    #[arg(long, global = true, value_enum, default_value = "env")]
    suggester: SuggesterMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a locator, healing it if needed, and print the result as JSON
    Resolve(ResolveArgs),

    /// Print ledger statistics as JSON
    Stats {
        /// Number of recent events to include
        #[arg(long, value_name = "N")]
        recent: Option<usize>,
    },

    /// Print every ledger event as JSON
    History,
}

#[derive(Args)]
struct ResolveArgs {
    /// Locator expression to resolve
    #[arg(long, short = 's')]
    selector: String,

    /// Description of the element's purpose
    #[arg(long, short = 'c')]
    context: Option<String>,

    /// Page to open in Chrome
    #[arg(long, value_name = "URL", conflicts_with = "snapshot", required_unless_present = "snapshot")]
    url: Option<String>,

    /// JSON element tree to resolve against instead of a live page
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    executable_path: Option<PathBuf>,

    /// WebSocket endpoint of an already running browser
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Per-operation browser timeout in milliseconds
    #[arg(long, default_value = "30000")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    match cli.command {
        Command::Resolve(args) => resolve(config, args).await,
        Command::Stats { recent } => {
            let ledger = HealingLedger::new(config.ledger_dir.clone());
            let stats = ledger.stats(recent.unwrap_or(config.recent_window)).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Command::History => {
            let ledger = HealingLedger::new(config.ledger_dir.clone());
            let events = ledger.read_all().await?;
            println!("{}", serde_json::to_string_pretty(&events)?);
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> Result<HealerConfig> {
    let mut config = HealerConfig::from_env().context("Invalid environment configuration")?;
    if let Some(dir) = &cli.ledger_dir {
        config = config.ledger_dir(dir);
    }
    match cli.suggester {
        SuggesterMode::Disabled => config = config.suggester(SuggesterConfig::Disabled),
        SuggesterMode::Mock => config = config.suggester(SuggesterConfig::Mock),
        SuggesterMode::Env => {}
    }
    Ok(config)
}

async fn resolve(config: HealerConfig, args: ResolveArgs) -> Result<()> {
    let healer = Healer::new(config)?;

    if let Some(path) = &args.snapshot {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot = DomSnapshot::from_json(&json)?;
        return print_resolution(&healer, &snapshot, &args).await;
    }

    let url = args.url.as_deref().context("Either --url or --snapshot is required")?;
    let session = match &args.ws_endpoint {
        Some(ws) => BrowserSession::connect(ConnectionOptions::new(ws.clone()).timeout(args.timeout))?,
        None => {
            let mut options = LaunchOptions::new().headless(!args.headed).timeout(args.timeout);
            if let Some(path) = &args.executable_path {
                options = options.chrome_path(path);
            }
            BrowserSession::launch(options)?
        }
    };

    session.navigate(url)?;
    session.wait_for_navigation()?;
    let page = session.document()?;
    print_resolution(&healer, &page, &args).await
}

async fn print_resolution(healer: &Healer, document: &dyn Document, args: &ResolveArgs) -> Result<()> {
    let result = healer.resolve(document, &args.selector, args.context.as_deref()).await?;
    if let Some(warning) = &result.ledger_warning {
        eprintln!("warning: {}", warning);
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
