//! Lectern CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Write a default config file
//! - `ingest`   — Index a transcript or a folder of transcripts
//! - `ask`      — Answer a single question
//! - `chat`     — Interactive question/answer session
//! - `search`   — Raw semantic search, no language model involved
//! - `outline`  — Show a course's lessons
//! - `courses`  — List indexed courses
//! - `status`   — Show configuration and index statistics

use clap::{Parser, Subcommand};
use lectern_ingest::DocumentEncoding;
use std::path::PathBuf;

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "lectern",
    about = "Lectern — ask questions about your course transcripts",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.lectern/config.toml
    #[arg(short, long, global = true, env = "LECTERN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Index a transcript file or every transcript in a folder
    Ingest {
        /// A .txt/.md transcript, or a folder of them
        path: PathBuf,

        /// Remove all indexed courses first
        #[arg(long)]
        clear: bool,

        /// Course title to use when the document has no `Course Title:` line
        #[arg(long)]
        title: Option<String>,

        /// Text encoding of the documents (utf-8 or latin-1)
        #[arg(long, default_value = "utf-8")]
        encoding: DocumentEncoding,
    },

    /// Answer a single question
    Ask {
        question: String,
    },

    /// Start an interactive session that remembers recent exchanges
    Chat,

    /// Search indexed content directly
    Search {
        query: String,

        /// Restrict to a course (loose title match)
        #[arg(long)]
        course: Option<String>,

        /// Restrict to a lesson number
        #[arg(long)]
        lesson: Option<u32>,

        /// Maximum number of hits (defaults to index.max_search_results)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show a course outline
    Outline {
        course: String,
    },

    /// List indexed courses
    Courses,

    /// Show configuration and index statistics
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    if let Commands::Init = cli.command {
        return commands::init::run(cli.config.as_deref()).await;
    }

    let config = runtime::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => {}
        Commands::Ingest {
            path,
            clear,
            title,
            encoding,
        } => commands::ingest::run(&config, &path, clear, title.as_deref(), encoding).await?,
        Commands::Ask { question } => commands::ask::run(&config, &question).await?,
        Commands::Chat => commands::chat::run(&config).await?,
        Commands::Search {
            query,
            course,
            lesson,
            limit,
        } => commands::search::run(&config, &query, course.as_deref(), lesson, limit).await?,
        Commands::Outline { course } => commands::outline::run(&config, &course).await?,
        Commands::Courses => commands::courses::run(&config).await?,
        Commands::Status => commands::status::run(&config, cli.config.as_deref()).await?,
    }

    Ok(())
}
