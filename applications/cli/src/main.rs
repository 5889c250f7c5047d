/// Lector - console text-to-speech reader
use anyhow::Context;
use clap::{Parser, Subcommand};
use lector_core::{ChapterSegmenter, DocumentId, EngineEventSink, LectorError, PersistentStore, PlayMode};
use lector_cli::{CliConfig, ConsoleEngine, Library};
use lector_playback::{
    Collaborators, CoordinatorEvent, CoordinatorHandle, OpenOutcome, PlaybackCoordinator,
};
use lector_segment::HeadingSegmenter;
use lector_storage::{global_record, ResumeStore, SqliteStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lector")]
#[command(about = "Read text documents aloud, chapter by chapter", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the chapters found in a document
    Chapters {
        /// Text file to segment
        file: PathBuf,
    },
    /// Read a document, resuming where it was left
    Read {
        /// Text file to read
        file: PathBuf,
        /// Play mode: sequential, single_repeat or list_repeat
        #[arg(short, long, value_parser = parse_mode)]
        mode: Option<PlayMode>,
        /// Ignore saved progress and start at the first chapter
        #[arg(long)]
        from_start: bool,
        /// Read even if the voice does not match the text language
        #[arg(long)]
        force: bool,
    },
    /// Show what was playing last
    Status {
        /// Print the global record as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_mode(value: &str) -> Result<PlayMode, String> {
    PlayMode::from_str(value).ok_or_else(|| format!("unknown play mode '{value}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lector=info,lector_cli=info,lector_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chapters { file } => {
            list_chapters(&file).await?;
        }
        Commands::Read {
            file,
            mode,
            from_start,
            force,
        } => {
            let config = load_config(cli.config.as_deref())?;
            read(config, &file, mode, from_start, force).await?;
        }
        Commands::Status { json } => {
            let config = load_config(cli.config.as_deref())?;
            status(&config, json).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<CliConfig> {
    let config = CliConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

async fn list_chapters(file: &Path) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let chapters = HeadingSegmenter::new().identify(&text);
    println!("{} chapter(s) in {}", chapters.len(), file.display());
    for (index, chapter) in chapters.iter().enumerate() {
        println!("{:>4}  {:<40} {:>8} chars", index + 1, chapter.title, chapter.len());
    }
    Ok(())
}

async fn read(
    config: CliConfig,
    file: &Path,
    mode: Option<PlayMode>,
    from_start: bool,
    force: bool,
) -> anyhow::Result<()> {
    let store = SqliteStore::open(&config.storage.database_url).await?;
    tracing::info!(database = %config.storage.database_url, "Database connected");

    let library = Library::new();
    let document = library.import(file).await?;
    let chapters = document.chapter_lengths(config.playback.chars_per_second);

    let (sink, engine_events) = EngineEventSink::channel();
    let engine = ConsoleEngine::new(
        sink,
        config.playback.chars_per_second,
        config.speech.voice_language.clone(),
        config.speech.echo,
    );

    let coordinator = PlaybackCoordinator::new(
        config.playback.clone(),
        Collaborators {
            engine: Arc::new(engine),
            engine_events,
            content: library.content(),
            store: Arc::new(store),
        },
    )
    .await?;
    let (handle, task) = coordinator.spawn();
    let mut events = handle.subscribe();

    if let Some(mode) = mode {
        handle.set_mode(mode).await?;
    }

    match open(&handle, document.document_id, from_start, force).await {
        Ok(OpenOutcome::Opened(state)) => {
            tracing::info!(
                title = %state.title,
                resuming = state.is_resuming,
                "Opened document"
            );
        }
        Ok(OpenOutcome::InFlight) => {}
        Err(LectorError::LanguageMismatch { voice, content }) => {
            eprintln!(
                "The voice ({voice}) may not read this {content} text correctly. \
                 Re-run with --force to read it anyway."
            );
            handle.shutdown().await?;
            task.await?;
            return Ok(());
        }
        Err(err) => {
            handle.shutdown().await.ok();
            return Err(err.into());
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(CoordinatorEvent::Transitioned(transition)) => {
                    let (title, length) = chapters
                        .get(&transition.to)
                        .map_or(("untitled", "0:00"), |(title, length)| {
                            (title.as_str(), length.as_str())
                        });
                    tracing::info!(chapter = transition.index + 1, %title, %length, "Now reading");
                }
                Ok(CoordinatorEvent::PlaylistEnded) => {
                    println!("\nEnd of document.");
                    break;
                }
                Ok(CoordinatorEvent::Error(err)) => {
                    eprintln!("{err}");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping; progress saved.");
                break;
            }
        }
    }

    handle.shutdown().await?;
    task.await?;
    Ok(())
}

async fn open(
    handle: &CoordinatorHandle,
    document: DocumentId,
    from_start: bool,
    force: bool,
) -> lector_core::Result<OpenOutcome> {
    if force {
        handle.open_document_anyway(document, from_start).await
    } else {
        handle.open_document(document, from_start).await
    }
}

async fn status(config: &CliConfig, json: bool) -> anyhow::Result<()> {
    let store: Arc<dyn PersistentStore> =
        Arc::new(SqliteStore::open(&config.storage.database_url).await?);
    let record = global_record::load(store.as_ref()).await?.unwrap_or_default();
    let last_played = ResumeStore::new(Arc::clone(&store)).last_played().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    match record.content_id {
        Some(id) => {
            let state = if record.is_playing { "playing" } else { "stopped" };
            println!("{} ({state}, {id})", record.title);
        }
        None => println!("Nothing has been played yet."),
    }
    if let Some(unit) = last_played {
        println!("Last unit: {unit}");
    }
    Ok(())
}
