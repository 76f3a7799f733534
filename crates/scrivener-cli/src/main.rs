//! Scrivener - supervised multi-agent article writing
//!
//! The `scrivener` command seeds a writers' room session from a content
//! source and lets the operator steer it from the terminal.
//!
//! ## Commands
//!
//! - `run`: Start a session and keep instructing it
//! - `resume`: Restore a persisted session and keep instructing it
//! - `fetch`: Print the normalized corpus for a topic
//! - `roles`: Show the standard roster
//! - `transcript`: Print a session's transcript
//! - `sessions`: List persisted sessions

mod terminal;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use content_sources::{ContentProvider, ForumProvider, LocalCorpusProvider, NewsProvider};
use scrivener_core::fakes::EchoGenerator;
use scrivener_core::metrics::METRICS;
use scrivener_core::obs::SessionSpan;
use scrivener_core::telemetry::{init_tracing, level_for};
use scrivener_core::{
    normalize, standard_roster, DriveOutcome, DriveReport, Generator, OpenAiGenerator,
    ScrivenerConfig, SeedSelector, SessionId, SessionManager, SessionRecord, SessionSummary,
    SourceKind, SurrealTranscriptLedger, TranscriptLedger,
};
use tracing::info;

use crate::terminal::{render_turn, TerminalHuman};

#[derive(Parser)]
#[command(name = "scrivener")]
#[command(author = "Scrivener Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Supervised multi-agent article writing", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: ./scrivener.toml when present)
    #[arg(long, global = true, env = "SCRIVENER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session and keep instructing it
    Run {
        /// Where the corpus comes from
        #[arg(short, long, value_enum, default_value = "text")]
        source: SeedSource,

        /// Topic to fetch, and the first instruction
        #[arg(short, long)]
        topic: Option<String>,

        /// File used as the corpus with `--source text`
        #[arg(long)]
        seed_file: Option<PathBuf>,

        /// Records requested from the source
        #[arg(short, long)]
        count: Option<usize>,

        /// Round ceiling for the session
        #[arg(long)]
        max_rounds: Option<u64>,

        /// Use the offline echo generator instead of the chat completions API
        #[arg(long)]
        offline: bool,
    },

    /// Restore a persisted session and keep instructing it
    Resume {
        /// Session ID
        #[arg(long)]
        session: String,

        /// Use the offline echo generator instead of the chat completions API
        #[arg(long)]
        offline: bool,
    },

    /// Fetch from a source and print the normalized corpus
    Fetch {
        #[arg(short, long, value_enum)]
        source: FetchSource,

        #[arg(short, long)]
        topic: String,

        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Show the standard roster in rotation order
    Roles,

    /// Print a session's transcript
    Transcript {
        /// Session ID
        #[arg(long)]
        session: String,
    },

    /// List persisted sessions
    Sessions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SeedSource {
    Forum,
    News,
    Local,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FetchSource {
    Forum,
    News,
    Local,
}

impl From<FetchSource> for SourceKind {
    fn from(source: FetchSource) -> Self {
        match source {
            FetchSource::Forum => SourceKind::Forum,
            FetchSource::News => SourceKind::News,
            FetchSource::Local => SourceKind::Local,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json, level_for(cli.verbose));

    let mut config = ScrivenerConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    let result = match cli.command {
        Commands::Run {
            source,
            topic,
            seed_file,
            count,
            max_rounds,
            offline,
        } => {
            if let Some(max_rounds) = max_rounds {
                config.session.max_rounds = max_rounds;
            }
            if let Some(count) = count {
                config.session.fetch_count = count;
            }
            config.validate().context("Invalid settings")?;
            let selector = seed_selector(
                source,
                topic.as_deref(),
                seed_file.as_deref(),
                config.session.fetch_count,
            )?;
            let manager = session_manager(&config, offline).await?;
            cmd_run(&manager, selector, topic).await
        }
        Commands::Resume { session, offline } => {
            let manager = session_manager(&config, offline).await?;
            cmd_resume(&manager, &SessionId::from(session.as_str())).await
        }
        Commands::Fetch {
            source,
            topic,
            count,
        } => cmd_fetch(&config, source.into(), &topic, count).await,
        Commands::Roles => cmd_roles(),
        Commands::Transcript { session } => {
            let ledger = connect_ledger().await?;
            cmd_transcript(&ledger, &SessionId::from(session.as_str())).await
        }
        Commands::Sessions => {
            let ledger = connect_ledger().await?;
            cmd_sessions(&ledger).await
        }
    };

    METRICS.flush();
    result
}

async fn connect_ledger() -> Result<SurrealTranscriptLedger> {
    SurrealTranscriptLedger::from_env()
        .await
        .context("Failed to connect to transcript ledger")
}

async fn session_manager(config: &ScrivenerConfig, offline: bool) -> Result<SessionManager> {
    let ledger: Arc<dyn TranscriptLedger> = Arc::new(connect_ledger().await?);
    let generator: Arc<dyn Generator> = if offline {
        Arc::new(EchoGenerator::new())
    } else {
        if config.openai.api_key.is_none() {
            bail!("OPENAI_API_KEY is not set; export it or pass --offline");
        }
        let generator = OpenAiGenerator::new(config.openai.clone())
            .context("Failed to build chat completions client")?;
        info!(model = generator.model(), "using chat completions generator");
        Arc::new(generator)
    };
    Ok(SessionManager::new(config, ledger, generator))
}

fn seed_selector(
    source: SeedSource,
    topic: Option<&str>,
    seed_file: Option<&Path>,
    count: usize,
) -> Result<SeedSelector> {
    let fetch = |source: SourceKind| -> Result<SeedSelector> {
        let topic = topic.context("--topic is required when fetching from a source")?;
        Ok(SeedSelector::Fetch {
            source,
            topic: topic.to_string(),
            count,
        })
    };
    match source {
        SeedSource::Forum => fetch(SourceKind::Forum),
        SeedSource::News => fetch(SourceKind::News),
        SeedSource::Local => fetch(SourceKind::Local),
        SeedSource::Text => match (seed_file, topic) {
            (Some(path), _) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read seed file {}", path.display()))?;
                Ok(SeedSelector::Text(text))
            }
            (None, Some(topic)) => Ok(SeedSelector::Text(topic.to_string())),
            (None, None) => bail!("--source text needs --seed-file or --topic"),
        },
    }
}

/// Start a session and keep instructing it
async fn cmd_run(
    manager: &SessionManager,
    selector: SeedSelector,
    first_instruction: Option<String>,
) -> Result<()> {
    let human = Arc::new(TerminalHuman::stdin());
    let summary = manager
        .on_session_start(selector, human.clone())
        .await
        .context("Failed to start session")?;
    print_summary(&summary);

    converse(manager, &human, &summary.session_id, first_instruction).await
}

/// Restore a persisted session and keep instructing it
async fn cmd_resume(manager: &SessionManager, session_id: &SessionId) -> Result<()> {
    let human = Arc::new(TerminalHuman::stdin());
    let summary = manager
        .restore(session_id, human.clone())
        .await
        .with_context(|| format!("Failed to restore session {session_id}"))?;
    print_summary(&summary);

    if summary.state.is_terminated() {
        println!("Session {session_id} has already ended ({}).", summary.state);
        return Ok(());
    }
    converse(manager, &human, session_id, None).await
}

/// Drive the session until it terminates or input ends.
async fn converse(
    manager: &SessionManager,
    human: &TerminalHuman,
    session_id: &SessionId,
    first_instruction: Option<String>,
) -> Result<()> {
    let _span = SessionSpan::enter(session_id.as_str());
    human.attach(manager.subscribe(session_id).await?).await;

    let mut next = first_instruction;
    loop {
        let instruction = match next.take() {
            Some(text) => text,
            None => match human.read_line("Instruction (Ctrl-D to close): ").await? {
                Some(text) => text,
                None => {
                    manager.on_close(session_id).await?;
                    human.flush_turns().await;
                    println!("Session {session_id} closed.");
                    return Ok(());
                }
            },
        };

        let report = manager
            .on_instruction(session_id, &instruction)
            .await
            .context("Instruction failed")?;
        human.flush_turns().await;
        println!("{}", describe_report(&report));

        if report.outcome.is_terminated() {
            return Ok(());
        }
    }
}

fn describe_report(report: &DriveReport) -> String {
    match &report.outcome {
        DriveOutcome::Suspended => format!(
            "Waiting for you ({} turn(s) this drive).",
            report.turns_appended
        ),
        DriveOutcome::Terminated { reason } => {
            format!("{} [{}]", reason.message(), reason.code())
        }
    }
}

fn print_summary(summary: &SessionSummary) {
    println!("Session {}", summary.session_id);
    println!("  Source:     {}", summary.source);
    println!(
        "  Corpus:     {} chars{}{}",
        summary.corpus_chars,
        if summary.dropped_records > 0 {
            format!(", {} record(s) dropped", summary.dropped_records)
        } else {
            String::new()
        },
        if summary.truncated { ", truncated" } else { "" }
    );
    println!("  Roles:      {}", summary.roles.join(" -> "));
    println!("  Max rounds: {}", summary.max_rounds);
    println!("  Turns:      {}", summary.turns);
    println!("  State:      {}", summary.state);
    println!();
}

/// Fetch from a source and print the normalized corpus
async fn cmd_fetch(
    config: &ScrivenerConfig,
    source: SourceKind,
    topic: &str,
    count: Option<usize>,
) -> Result<()> {
    let provider: Box<dyn ContentProvider> = match source {
        SourceKind::Forum => Box::new(ForumProvider::new(config.forum.clone())),
        SourceKind::News => Box::new(NewsProvider::new(config.news.clone())),
        SourceKind::Local => Box::new(LocalCorpusProvider::new(config.local.clone())),
    };
    let records = provider
        .fetch(topic, count.unwrap_or(config.session.fetch_count))
        .await
        .with_context(|| format!("Failed to fetch '{topic}' from {source}"))?;

    let corpus = normalize(records, config.session.corpus_ceiling);
    println!("{}", corpus.rendered());
    println!();
    println!(
        "{} record(s), {} chars, {} dropped{}, digest {}",
        corpus.records().len(),
        corpus.char_len(),
        corpus.dropped(),
        if corpus.truncated() { ", truncated" } else { "" },
        corpus.digest().short()
    );
    Ok(())
}

/// Show the standard roster in rotation order
fn cmd_roles() -> Result<()> {
    for (i, spec) in standard_roster().iter().enumerate() {
        let marker = if spec.human_proxy { " (operator)" } else { "" };
        let headline = spec.profile.lines().next().unwrap_or_default();
        println!("{}. {}{}", i + 1, spec.name, marker);
        println!("   {headline}");
    }
    Ok(())
}

/// Print a session's transcript
async fn cmd_transcript(ledger: &dyn TranscriptLedger, session_id: &SessionId) -> Result<()> {
    let record = ledger
        .get_session(session_id)
        .await
        .with_context(|| format!("Session {session_id} not found"))?;
    let turns = ledger.get_turns(session_id).await?;

    if turns.is_empty() {
        println!("Session {session_id} has no turns yet.");
    }
    for turn in &turns {
        println!("{}", render_turn(turn));
    }
    println!("{}", session_status_line(&record));
    Ok(())
}

/// List persisted sessions
async fn cmd_sessions(ledger: &dyn TranscriptLedger) -> Result<()> {
    let sessions = ledger.list_sessions().await?;
    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }
    for record in &sessions {
        println!(
            "{}  {}  corpus {}",
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            session_status_line(record),
            record.metadata.corpus_digest.short()
        );
    }
    Ok(())
}

fn session_status_line(record: &SessionRecord) -> String {
    let reason = record
        .termination
        .as_ref()
        .and_then(|t| t.get("reason"))
        .and_then(|r| r.as_str())
        .map(|r| format!(" ({r})"))
        .unwrap_or_default();
    format!(
        "{} {}{} after {} turn(s)",
        record.session_id,
        record.status.as_str(),
        reason,
        record.turn_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivener_core::TerminationReason;
    use transcript_ledger::SessionMetadata;

    #[test]
    fn test_text_source_prefers_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.txt");
        std::fs::write(&path, "Notes on agents").unwrap();

        let selector = seed_selector(SeedSource::Text, Some("ignored"), Some(&path), 5).unwrap();
        assert_eq!(selector, SeedSelector::Text("Notes on agents".to_string()));
    }

    #[test]
    fn test_fetch_source_requires_topic() {
        assert!(seed_selector(SeedSource::News, None, None, 5).is_err());
        let selector = seed_selector(SeedSource::Forum, Some("rust"), None, 3).unwrap();
        assert_eq!(
            selector,
            SeedSelector::Fetch {
                source: SourceKind::Forum,
                topic: "rust".to_string(),
                count: 3
            }
        );
    }

    #[test]
    fn test_text_source_without_input_is_error() {
        assert!(seed_selector(SeedSource::Text, None, None, 5).is_err());
    }

    #[test]
    fn test_describe_report() {
        let suspended = DriveReport {
            outcome: DriveOutcome::Suspended,
            turns_appended: 5,
            last_seq: Some(5),
        };
        assert!(describe_report(&suspended).contains("5 turn(s)"));

        let ended = DriveReport {
            outcome: DriveOutcome::Terminated {
                reason: TerminationReason::RoundLimit,
            },
            turns_appended: 2,
            last_seq: Some(9),
        };
        assert!(describe_report(&ended).contains("ROUND_LIMIT"));
    }

    #[tokio::test]
    async fn test_status_line_reports_termination_reason() {
        let ledger = SurrealTranscriptLedger::in_memory().await.unwrap();
        let id = ledger
            .create_session(SessionMetadata {
                corpus_digest: transcript_ledger::ContentDigest::from_bytes(b"seed"),
                corpus_text: "seed".to_string(),
                roster: serde_json::json!([]),
                max_rounds: 3,
            })
            .await
            .unwrap();
        ledger
            .mark_terminated(
                &id,
                serde_json::to_value(TerminationReason::UserExit).unwrap(),
            )
            .await
            .unwrap();

        let record = ledger.get_session(&id).await.unwrap();
        let line = session_status_line(&record);
        assert!(line.contains("terminated (USER_EXIT)"));
        assert!(line.ends_with("after 0 turn(s)"));

        cmd_transcript(&ledger, &id).await.unwrap();
        cmd_sessions(&ledger).await.unwrap();
    }

    #[test]
    fn test_cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "scrivener",
            "--verbose",
            "run",
            "--source",
            "news",
            "--topic",
            "agents",
            "--max-rounds",
            "8",
            "--offline",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                source,
                topic,
                max_rounds,
                offline,
                ..
            } => {
                assert_eq!(source, SeedSource::News);
                assert_eq!(topic.as_deref(), Some("agents"));
                assert_eq!(max_rounds, Some(8));
                assert!(offline);
            }
            _ => panic!("expected run"),
        }
    }
}
