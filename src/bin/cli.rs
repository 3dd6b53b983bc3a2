//! Props CLI - Fantasy point projections from NFL player-prop odds

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nfl_props::config::{load_config, ScraperConfig};
use nfl_props::export::{save_table, to_json};
use nfl_props::scraper::{
    discover_games, HttpSession, PageSession, SessionPool, WebDriverSession,
};
use nfl_props::source::{
    LiveScrapeSource, ManualEntrySource, Prompter, QuoteSnapshot, QuoteSource, SnapshotSource,
};
use nfl_props::{run_pipeline, Projection, RunOutcome};

#[derive(Parser)]
#[command(name = "props")]
#[command(author, version, about = "NFL prop odds to fantasy projections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run in interactive mode
    #[arg(short, long)]
    interactive: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sportsbook site root
    #[arg(long)]
    base_url: Option<String>,

    /// Concurrent game pages
    #[arg(short, long)]
    workers: Option<usize>,

    /// Rendering service for client-side pages
    #[arg(long)]
    render_endpoint: Option<String>,

    /// WebDriver server to load pages in a real browser (e.g. http://localhost:9515)
    #[arg(long)]
    webdriver: Option<String>,

    /// Show the WebDriver browser window
    #[arg(long)]
    headed: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args, Clone)]
struct OutputArgs {
    /// Write the table to a file (tab separated for .tsv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Field delimiter for --output (a single character or "tab")
    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<char>,

    /// Print the projections as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Only show the top N players
    #[arg(short, long)]
    top: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// List this week's games
    Games,

    /// Scrape every game page and project all players
    Scrape {
        #[command(flatten)]
        output: OutputArgs,

        /// Save every scraped quote to a JSON snapshot
        #[arg(long)]
        save_quotes: Option<PathBuf>,
    },

    /// Enter odds by hand
    Manual {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Recompute projections from a saved quote snapshot
    Project {
        /// Snapshot written by `scrape --save-quotes`
        #[arg(short, long)]
        quotes: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = build_config(&cli)?;

    if cli.interactive {
        return run_interactive(&config);
    }

    if let Some(command) = cli.command {
        match command {
            Commands::Games => list_games(&config)?,
            Commands::Scrape {
                output,
                save_quotes,
            } => run_scrape(&config, &output, save_quotes.as_deref())?,
            Commands::Manual { output } => run_manual(&output)?,
            Commands::Project { quotes, output } => run_project(&quotes, &output)?,
        }
    } else {
        println!("Use --help for usage information or --interactive for interactive mode.");
    }

    Ok(())
}

/// Defaults, then the config file, then environment, then flags
fn build_config(cli: &Cli) -> Result<ScraperConfig> {
    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => ScraperConfig::default(),
    };
    let mut config = config.apply_env()?;

    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(endpoint) = &cli.render_endpoint {
        config.render_endpoint = Some(endpoint.clone());
    }
    if let Some(url) = &cli.webdriver {
        config.webdriver_url = Some(url.clone());
    }
    if cli.headed {
        config.headless = false;
    }

    config.validate()?;
    Ok(config)
}

fn parse_delimiter(value: &str) -> std::result::Result<char, String> {
    match value {
        "tab" | "\\t" | "\t" => Ok('\t'),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(format!("delimiter must be a single character, got {:?}", value)),
            }
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb.set_message(message.to_string());
    pb
}

/// Cancellation flag raised by Ctrl-C
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, cancelling run");
            let _ = tx.send(true);
        }
    });
    rx
}

fn list_games(config: &ScraperConfig) -> Result<()> {
    let rt = runtime()?;
    let pb = spinner("Loading schedule...");

    let games = rt.block_on(async {
        if config.uses_browser() {
            let mut session = WebDriverSession::connect(config).await?;
            let games = discover_games(&mut session, config).await;
            if let Err(e) = session.close().await {
                tracing::warn!("Failed to close browser session: {}", e);
            }
            games
        } else {
            let mut session = HttpSession::new(config.clone())?;
            discover_games(&mut session, config).await
        }
    });
    pb.finish_and_clear();

    let games = games.context("Failed to discover games")?;

    println!("{}", "This week's games:".yellow().bold());
    println!("{}", "-".repeat(60));
    for game in &games {
        println!("  {:<45} {}", game.matchup(), game.id.id.to_string().dimmed());
    }
    println!("\n{} games", games.len());

    Ok(())
}

fn run_scrape(config: &ScraperConfig, output: &OutputArgs, save_quotes: Option<&Path>) -> Result<()> {
    println!(
        "{}: {} ({} workers)",
        "Scraping".green(),
        config.schedule_url(),
        config.workers
    );
    println!();

    let rt = runtime()?;
    let outcome = if config.uses_browser() {
        let sessions = rt
            .block_on(connect_browsers(config))
            .context("Failed to start browser sessions")?;
        let pool = SessionPool::new(sessions, config.checkout_timeout());
        let outcome = scrape_with(&rt, pool.clone(), config);
        rt.block_on(async {
            for session in pool.take_idle() {
                if let Err(e) = session.close().await {
                    tracing::warn!("Failed to close browser session: {}", e);
                }
            }
        });
        outcome?
    } else {
        let sessions = (0..config.workers)
            .map(|_| HttpSession::new(config.clone()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to create page sessions")?;
        scrape_with(&rt, SessionPool::new(sessions, config.checkout_timeout()), config)?
    };

    if let Some(path) = save_quotes {
        QuoteSnapshot::new(outcome.records.clone())
            .save(path)
            .with_context(|| format!("Failed to save quotes to {:?}", path))?;
        println!("{}: {:?}", "Saved quotes".green(), path);
    }

    report(&outcome, output)
}

/// One browser per worker
async fn connect_browsers(config: &ScraperConfig) -> nfl_props::Result<Vec<WebDriverSession>> {
    let mut sessions = Vec::with_capacity(config.workers);
    for _ in 0..config.workers {
        match WebDriverSession::connect(config).await {
            Ok(session) => sessions.push(session),
            Err(e) => {
                for session in sessions {
                    let _ = session.close().await;
                }
                return Err(e);
            }
        }
    }
    Ok(sessions)
}

fn scrape_with<S: PageSession + 'static>(
    rt: &tokio::runtime::Runtime,
    pool: SessionPool<S>,
    config: &ScraperConfig,
) -> Result<RunOutcome> {
    let mut source = LiveScrapeSource::new(pool, config.clone());
    run_source(rt, &mut source)
}

fn run_manual(output: &OutputArgs) -> Result<()> {
    let mut source = ManualEntrySource::new(DialoguerPrompter::default());
    let outcome = run_source(&runtime()?, &mut source)?;
    report(&outcome, output)
}

fn run_project(quotes: &Path, output: &OutputArgs) -> Result<()> {
    let mut source = SnapshotSource::from_path(quotes)
        .with_context(|| format!("Failed to load quotes from {:?}", quotes))?;
    let outcome = run_source(&runtime()?, &mut source)?;
    report(&outcome, output)
}

/// Run a source to completion, printing each player as they complete
fn run_source<S: QuoteSource>(
    rt: &tokio::runtime::Runtime,
    source: &mut S,
) -> Result<RunOutcome> {
    let interactive = source.name() == "manual";

    rt.block_on(async {
        let cancel = cancel_on_ctrl_c();
        let pb = if interactive {
            ProgressBar::hidden()
        } else {
            spinner("Collecting quotes...")
        };

        let outcome = run_pipeline(source, cancel, |projection| {
            pb.println(format!(
                "{} {} ({}) {:.2}",
                "✓".green(),
                projection.player,
                projection.position,
                projection.total
            ));
        })
        .await;

        pb.finish_and_clear();
        match outcome {
            Err(e) if e.is_fatal_to_run() => Err(anyhow::Error::new(e).context("Run aborted")),
            other => other.context("Run failed"),
        }
    })
}

fn report(outcome: &RunOutcome, output: &OutputArgs) -> Result<()> {
    let shown = match output.top {
        Some(n) => &outcome.projections[..n.min(outcome.projections.len())],
        None => &outcome.projections[..],
    };

    if output.json {
        println!("{}", to_json(shown)?);
    } else {
        print_table(shown);
    }

    if !outcome.warnings.is_empty() {
        println!("{}", "Incomplete players:".yellow().bold());
        for warning in &outcome.warnings {
            let missing: Vec<&str> = warning.missing.iter().map(|m| m.label()).collect();
            println!(
                "  {} ({}): missing {}",
                warning.player,
                warning.position,
                missing.join(", ")
            );
        }
        println!();
    }

    let summary = &outcome.summary;
    let status = if summary.report.cancelled {
        "Cancelled".yellow()
    } else {
        "Complete".green()
    };
    println!(
        "{}: {} quotes, {} players, {} projections ({:.1}s)",
        status,
        summary.quotes_received,
        summary.players_seen,
        summary.projections,
        summary.elapsed_ms as f64 / 1000.0
    );
    if summary.report.games_discovered > 0 {
        println!(
            "Games: {} processed, {} failed of {}; panels skipped: {}, lines skipped: {}",
            summary.report.games_processed,
            summary.report.games_failed,
            summary.report.games_discovered,
            summary.report.panels_skipped,
            summary.report.lines_skipped
        );
    }
    if summary.quotes_rejected > 0 {
        println!("{}: {} quotes rejected", "Warning".yellow(), summary.quotes_rejected);
    }

    if let Some(path) = &output.output {
        save_table(path, &outcome.projections, output.delimiter)
            .with_context(|| format!("Failed to write table to {:?}", path))?;
        println!("{}: {:?}", "Saved".green(), path);
    }

    Ok(())
}

fn print_table(projections: &[Projection]) {
    if projections.is_empty() {
        println!("{}", "No complete players.".yellow());
        println!();
        return;
    }

    println!("{}", "Projected fantasy points:".yellow().bold());
    println!("{:>4} {:<28} {:<9} {:<32} {:>7}", "#", "Player", "Pos", "Game", "Total");
    println!("{}", "-".repeat(84));

    for (rank, projection) in projections.iter().enumerate() {
        let game = projection
            .game
            .as_ref()
            .map(|g| truncate_name(&g.slug, 32))
            .unwrap_or_else(|| "-".to_string());
        let total = format!("{:.2}", projection.total);
        let total = if rank < 3 { total.green().bold() } else { total.normal() };

        println!(
            "{:>4} {:<28} {:<9} {:<32} {:>7}",
            rank + 1,
            truncate_name(&projection.player, 28),
            projection.position.to_string(),
            game,
            total
        );
    }
    println!();
}

fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        name.to_string()
    } else {
        let truncated: String = name.chars().take(max_len - 1).collect();
        format!("{}…", truncated)
    }
}

/// Terminal prompts through dialoguer
#[derive(Default)]
struct DialoguerPrompter {
    theme: ColorfulTheme,
}

fn prompt_error(e: dialoguer::Error) -> nfl_props::Error {
    nfl_props::Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

impl Prompter for DialoguerPrompter {
    fn text(&mut self, prompt: &str) -> nfl_props::Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()
            .map_err(prompt_error)
    }

    fn number(&mut self, prompt: &str) -> nfl_props::Result<f64> {
        Input::<f64>::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()
            .map_err(prompt_error)
    }

    fn confirm(&mut self, prompt: &str) -> nfl_props::Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(prompt_error)
    }

    fn warn(&mut self, message: &str) {
        println!("{}", message.yellow());
    }
}

fn run_interactive(config: &ScraperConfig) -> Result<()> {
    println!("{}", "Interactive mode".green().bold());
    println!();

    let theme = ColorfulTheme::default();
    let output = OutputArgs {
        output: None,
        delimiter: None,
        json: false,
        top: None,
    };

    loop {
        let options = vec![
            "List this week's games",
            "Scrape all games",
            "Enter odds manually",
            "Project from a saved snapshot",
            "Quit",
        ];

        let selection = Select::with_theme(&theme)
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        let result = match selection {
            0 => list_games(config),
            1 => run_scrape(config, &output, None),
            2 => run_manual(&output),
            3 => {
                let path: String = Input::with_theme(&theme)
                    .with_prompt("Snapshot file")
                    .interact_text()?;
                run_project(Path::new(&path), &output)
            }
            _ => {
                println!("Goodbye!");
                break;
            }
        };

        if let Err(e) = result {
            println!("{}: {:#}", "Error".red(), e);
        }
        println!();
    }

    Ok(())
}
