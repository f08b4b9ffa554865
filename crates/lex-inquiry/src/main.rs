//! CLI entry point for 20-questions guessing sessions.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use lex_inquiry::{
    Decision, History, InMemoryKnowledgeStore, InquiryConfig, Session, SessionOrchestrator,
    SessionState, SplitOutcome, StrategyKind,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Attribute-selection engine for 20-questions guessing sessions",
    long_about = "Pick the most discriminating next question over a knowledge base, \
                  or commit to a guess.\n\n\
                  The knowledge base is a JSON array of objects or a CSV file with a header.\n\n\
                  EXAMPLES:\n  \
                  # Play interactively\n  \
                  lex-inquiry play --data animals.json\n\n  \
                  # One decision for a given history\n  \
                  lex-inquiry decide --data animals.json --history '[{\"name\":\"legs\",\"answer\":\"4\"}]'\n\n  \
                  # Compare every strategy on the same candidates\n  \
                  lex-inquiry compare --data animals.csv --workers 8"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show errors and results)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// JSON file with an InquiryConfig; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Attribute holding the entity label
    #[arg(short, long, default_value = "name", global = true)]
    target: String,

    /// Number of aggregation worker threads
    #[arg(short, long, global = true)]
    workers: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a game on stdin; answer `?` or nothing when you don't know
    Play {
        /// Knowledge base (.json or .csv)
        #[arg(short, long)]
        data: PathBuf,

        /// Strategy name, e.g. gain_ratio or gini_impurity_distributed
        #[arg(short, long)]
        strategy: Option<String>,

        /// Maximum number of questions before a forced guess
        #[arg(short, long)]
        max_depth: Option<usize>,
    },

    /// Print one decision as JSON
    Decide {
        /// Knowledge base (.json or .csv)
        #[arg(short, long)]
        data: PathBuf,

        /// Answered questions, as a JSON array of {"name", "answer"}
        #[arg(long, default_value = "[]")]
        history: String,

        #[arg(short, long)]
        strategy: Option<String>,

        #[arg(short, long)]
        max_depth: Option<usize>,
    },

    /// Run every strategy on the same candidates
    Compare {
        /// Knowledge base (.json or .csv)
        #[arg(short, long)]
        data: PathBuf,

        /// Answered questions, as a JSON array of {"name", "answer"}
        #[arg(long, default_value = "[]")]
        history: String,
    },
}

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so `decide` output stays pipeable.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    // Load environment variables from .env file (RUST_LOG) before reading them
    dotenv().ok();

    let effective_level = if quiet { "warn" } else { level };
    let directive = log_directive(effective_level, env::var("RUST_LOG").ok());

    let filter =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// A non-empty RUST_LOG overrides the command-line level.
fn log_directive(level: &str, rust_log: Option<String>) -> String {
    rust_log
        .filter(|directive| !directive.trim().is_empty())
        .unwrap_or_else(|| level.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet);

    let config = load_config(&args)?;

    match &args.command {
        Command::Play {
            data,
            strategy,
            max_depth,
        } => {
            let orchestrator = build_orchestrator(&args, data, config)?;
            let strategy = parse_strategy(strategy.as_deref(), orchestrator.config())?;
            let max_depth = max_depth.unwrap_or(orchestrator.config().max_depth);
            play(orchestrator, strategy, max_depth)
        }
        Command::Decide {
            data,
            history,
            strategy,
            max_depth,
        } => {
            let history = parse_history(history)?;
            let orchestrator = build_orchestrator(&args, data, config)?;
            let strategy = parse_strategy(strategy.as_deref(), orchestrator.config())?;
            let max_depth = max_depth.unwrap_or(orchestrator.config().max_depth);

            let decision = orchestrator.decide_next_step(&history, strategy, max_depth)?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(())
        }
        Command::Compare { data, history } => {
            let history = parse_history(history)?;
            let orchestrator = build_orchestrator(&args, data, config)?;
            compare(&orchestrator, &history)
        }
    }
}

/// Read the config file, if any, and apply command-line overrides.
fn load_config(args: &Args) -> Result<InquiryConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => InquiryConfig::default(),
    };

    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    config.validate()?;
    debug!("Configuration: {:?}", config);
    Ok(config)
}

fn load_store(path: &Path, target: &str) -> Result<InMemoryKnowledgeStore> {
    if !path.exists() {
        return Err(anyhow!("Data file not found: {}", path.display()));
    }

    let store = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => {
            InMemoryKnowledgeStore::from_csv_file(path, target)?
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            InMemoryKnowledgeStore::from_json_file(path, target)?
        }
        _ => {
            return Err(anyhow!(
                "Unsupported data file {} (expected .json or .csv)",
                path.display()
            ));
        }
    };

    info!("Loaded {} entities from {}", store.len(), path.display());
    Ok(store)
}

fn build_orchestrator(
    args: &Args,
    data: &Path,
    config: InquiryConfig,
) -> Result<Arc<SessionOrchestrator>> {
    let store = load_store(data, &args.target)?;

    let mut builder = SessionOrchestrator::builder()
        .store(Arc::new(store))
        .config(config);

    if !args.quiet {
        builder = builder.on_stage(|update| {
            debug!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(Arc::new(builder.build()?))
}

fn parse_strategy(name: Option<&str>, config: &InquiryConfig) -> Result<StrategyKind> {
    match name {
        Some(name) => Ok(name.parse()?),
        None => Ok(config.default_strategy),
    }
}

fn parse_history(json: &str) -> Result<History> {
    serde_json::from_str(json).context("parsing --history (expected [{\"name\", \"answer\"}, ..])")
}

/// Interactive game on stdin.
///
/// Uses `println!` for the dialogue; logging stays on stderr.
fn play(orchestrator: Arc<SessionOrchestrator>, strategy: StrategyKind, max_depth: usize) -> Result<()> {
    let mut session = Session::new(orchestrator)
        .with_strategy(strategy)
        .with_max_depth(max_depth);
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("Think of something. Answer with one of the offered values, or `?` if unsure.");

    loop {
        let state = session.next_step()?.clone();
        let (attribute, values) = match state {
            SessionState::AwaitingAnswer { attribute, values } => (attribute, values),
            SessionState::Terminated { guess, reason } => {
                println!(
                    "It's {}! ({} questions, {})",
                    guess,
                    session.history().len(),
                    reason.describe()
                );
                return Ok(());
            }
            SessionState::AwaitingQuestion => {
                return Err(anyhow!("session did not advance"));
            }
        };

        loop {
            print!("{}? [{}] ", attribute, values.join(" / "));
            io::stdout().flush()?;

            let Some(line) = lines.next() else {
                println!();
                info!("Input closed, ending session");
                return Ok(());
            };
            let line = line?;
            let answer = match line.trim() {
                "" | "?" => None,
                value => Some(value.to_string()),
            };

            match session.answer(answer) {
                Ok(()) => break,
                Err(e) => println!("{}", e),
            }
        }
    }
}

/// Print the attribute, score and timing chosen by every strategy.
fn compare(orchestrator: &SessionOrchestrator, history: &History) -> Result<()> {
    use lex_inquiry::{SelectionContext, find_best_feature};

    let view = orchestrator.candidate_view(history)?;
    let config = orchestrator.config();
    let context = SelectionContext {
        workers: config.workers,
        timeout: config.pipeline_timeout(),
        observer: None,
    };

    println!(
        "{} candidates, {} attributes",
        view.height(),
        view.candidate_attributes().len()
    );
    println!("{:<30} {:<20} {:>12} {:>12}", "Strategy", "Attribute", "Score", "Time");
    println!("{}", "-".repeat(77));

    for kind in StrategyKind::all() {
        let started = Instant::now();
        let outcome = find_best_feature(kind, &view, &context);
        let elapsed = started.elapsed();

        match outcome {
            Ok(SplitOutcome::Split(split)) => println!(
                "{:<30} {:<20} {:>12.6} {:>12?}",
                kind.name(),
                split.attribute,
                split.score,
                elapsed
            ),
            Ok(SplitOutcome::NoSplit) => println!(
                "{:<30} {:<20} {:>12} {:>12?}",
                kind.name(),
                "-",
                "-",
                elapsed
            ),
            Err(e) => println!("{:<30} failed: {}", kind.name(), e),
        }
    }

    match orchestrator.decide(history)? {
        Decision::Question { question, .. } => {
            println!("\nNext question ({}): {}", config.default_strategy, question)
        }
        Decision::Guess { guess, reason } => {
            println!("\nGuess: {} ({})", guess, reason.describe())
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_level() {
        assert_eq!(log_directive("info", Some("lex_inquiry=debug".to_string())), "lex_inquiry=debug");
        assert_eq!(log_directive("warn", None), "warn");
    }

    #[test]
    fn test_blank_rust_log_falls_back_to_level() {
        assert_eq!(log_directive("info", Some("  ".to_string())), "info");
    }
}
