//! docent - terminal entry point
//!
//! Thin driver over the assistant pipeline: streams raw chunks to stdout
//! and prints the citation-resolved answer after the `[REF_POSTPROCESS]`
//! marker line, so the output can be consumed by callers that split on it.

use anyhow::Result;
use clap::Parser;
use docent::types::StreamEvent;
use docent::{Assistant, AssistantConfig};
use futures_util::{pin_mut, StreamExt};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// docent - ask questions answered from a reference document corpus
#[derive(Parser, Debug)]
#[command(name = "docent")]
#[command(version)]
#[command(about = "Streaming retrieval-augmented assistant with document citations", long_about = None)]
struct Args {
    /// One-shot query (starts an interactive session when omitted)
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = AssistantConfig::load(args.config.as_deref())?;
    let mut assistant = Assistant::from_config(&config)?;

    match args.query {
        Some(query) => run_turn(&mut assistant, &query).await,
        None => run_interactive(&mut assistant).await,
    }
}

/// Stream one turn to stdout
async fn run_turn(assistant: &mut Assistant, query: &str) -> Result<()> {
    let stream = assistant.stream_answer(query);
    pin_mut!(stream);

    let mut stdout = std::io::stdout();
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Chunk(text) => {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            StreamEvent::Final(resolved) => {
                writeln!(stdout, "\n[REF_POSTPROCESS]{}", resolved)?;
            }
        }
    }

    Ok(())
}

/// Interactive loop with `:undo` and `:reload` session commands
async fn run_interactive(assistant: &mut Assistant) -> Result<()> {
    let mut editor = rustyline::DefaultEditor::new()?;
    println!("docent - escribe tu consulta (:undo, :reload, :quit)");

    loop {
        let line = match editor.readline(">> ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        editor.add_history_entry(input)?;

        match input {
            ":quit" | ":q" => break,
            ":undo" => match assistant.erase_last() {
                Some(turn) => println!("turno eliminado: {}", turn.query),
                None => println!("no hay turnos que eliminar"),
            },
            ":reload" => match assistant.reload_corpus() {
                Ok(count) => println!("corpus recargado: {} documentos", count),
                Err(e) => eprintln!("error recargando corpus: {}", e),
            },
            query => run_turn(assistant, query).await?,
        }
    }

    Ok(())
}
