//! `ragchat`: ask questions about local documents from the terminal.

mod config;

use clap::{Parser, Subcommand};
use config::RagchatConfig;
use ragchat_agent::{
    build_generator, AskOutcome, Document, DocumentExtractor, Orchestrator, TextExtractor,
};
use ragchat_core::RagError;
use ragchat_memory::Chunker;
use ragchat_session::render_transcript;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_CONFIG: &str = "ragchat.toml";

#[derive(Parser)]
#[command(name = "ragchat", about = "Chat with your documents")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process documents, then answer questions interactively
    Chat {
        /// Documents to load (PDF or plain text)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Process documents and answer a single question
    Ask {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// The question to answer
        #[arg(short, long)]
        question: String,
    },
    /// Print the chunks a document is split into
    Chunk {
        file: PathBuf,
        /// Window size in characters (overrides config)
        #[arg(long)]
        size: Option<usize>,
        /// Overlap in characters (overrides config)
        #[arg(long)]
        overlap: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let (config_path, required) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    let config = RagchatConfig::load(&config_path, required).await?;

    match cli.command {
        Commands::Chat { files } => {
            let orch = build_orchestrator(&config)?;
            let session = orch.sessions().create();
            process(&orch, session, &files).await?;
            repl(&orch, session, &files).await?;
        }
        Commands::Ask { files, question } => {
            let orch = build_orchestrator(&config)?;
            let session = orch.sessions().create();
            process(&orch, session, &files).await?;
            match orch.ask(session, &question).await? {
                AskOutcome::Answered(answer) => {
                    println!("{}", answer.answer);
                    println!();
                    println!("Sources:");
                    for source in &answer.sources {
                        println!(
                            "  [chunk {} | score {:.3}] {}",
                            source.chunk.index,
                            source.score,
                            preview(&source.chunk.text)
                        );
                    }
                }
                AskOutcome::Ignored { .. } => {
                    println!("Question is empty, nothing to answer.");
                }
            }
        }
        Commands::Chunk {
            file,
            size,
            overlap,
        } => {
            let chunker = Chunker::new(
                size.unwrap_or(config.rag.chunk_size),
                overlap.unwrap_or(config.rag.chunk_overlap),
            )?;
            let document = Document::from_path(&file).await?;
            let text = DocumentExtractor.extract(&document)?;
            let chunks = chunker.split(&text);
            println!("{} chunks", chunks.len());
            for chunk in &chunks {
                println!(
                    "  #{:<4} bytes {}..{} ({} chars) {}",
                    chunk.index,
                    chunk.start,
                    chunk.end,
                    chunk.text.chars().count(),
                    preview(&chunk.text)
                );
            }
        }
    }

    Ok(())
}

fn build_orchestrator(config: &RagchatConfig) -> anyhow::Result<Orchestrator> {
    let generator = build_generator(&config.model)?;
    let embedder = config.embedding.build();
    info!(
        generator = generator.name(),
        embedding = ?config.embedding.backend,
        "Pipeline configured"
    );
    Ok(Orchestrator::new(&config.rag, embedder, generator)?)
}

async fn load_documents(files: &[PathBuf]) -> Vec<Document> {
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        match Document::from_path(path).await {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read document, skipping");
            }
        }
    }
    documents
}

async fn process(orch: &Orchestrator, session: Uuid, files: &[PathBuf]) -> anyhow::Result<()> {
    let documents = load_documents(files).await;
    let report = orch.ingest(session, documents).await?;
    println!(
        "Processed {} document(s) into {} chunks ({} characters).",
        report.documents.len(),
        report.chunks,
        report.characters
    );
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.name, skipped.reason);
    }
    Ok(())
}

async fn repl(orch: &Orchestrator, session: Uuid, files: &[PathBuf]) -> anyhow::Result<()> {
    println!("Ask a question, or /history, /status, /reload, /quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/history" => {
                let history = orch.history(session).await;
                if history.is_empty() {
                    println!("(no conversation yet)");
                } else {
                    println!("{}", render_transcript(&history));
                }
            }
            "/status" => {
                if let Some(status) = orch.status(session).await {
                    println!("{}", serde_json::to_string_pretty(&status)?);
                }
            }
            "/reload" => {
                if let Err(e) = process(orch, session, files).await {
                    println!("Reload failed: {e}");
                }
            }
            question => match orch.ask(session, question).await {
                Ok(AskOutcome::Answered(answer)) => println!("{}\n", answer.answer),
                Ok(AskOutcome::Ignored { .. }) => {}
                Err(e @ RagError::Generation(_)) => {
                    println!("Could not answer: {e}. Your question was not recorded.");
                }
                Err(e) => println!("Error: {e}"),
            },
        }
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let line: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() > 60 {
        format!("{}...", line.chars().take(60).collect::<String>())
    } else {
        line
    }
}
