use std::{process, time::Duration};

use clap::{Parser, Subcommand};
use notes_client::{
    api::NotesApi,
    config::load_config,
    model::NoteDraft,
    state::{NotesController, NotesView, format_note, render},
};

#[derive(Debug, Parser)]
#[command(name = "notes-client")]
#[command(about = "Command-line client for the notes server")]
struct Cli {
    /// Per-request timeout in seconds, overriding the configured ones.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List all notes, newest first.
    List,
    /// Show a single note.
    Show { id: i64 },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    Edit {
        id: i64,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    Delete { id: i64 },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = load_config().unwrap_or_else(|e| {
        tracing::error!("Invalid client configuration: {e}");
        process::exit(1);
    });

    let mut api = NotesApi::new(&cfg).unwrap_or_else(|e| {
        tracing::error!("{e}");
        process::exit(1);
    });
    if let Some(secs) = cli.timeout {
        api = api.with_timeout(Duration::from_secs(secs));
    }

    if let Command::Show { id } = cli.command {
        match api.get(id).await {
            Ok(envelope) => match envelope.data {
                Some(note) if envelope.success => println!("{}", format_note(&note)),
                _ => println!("No note returned."),
            },
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let mut view = NotesView::new(cfg.notice_ttl);
    let controller = NotesController::new(api, view.sender());

    controller.refresh().await;
    view.drain();

    if view.state().error.is_none() {
        match cli.command {
            Command::Create { title, content } => {
                controller.create(NoteDraft { title, content }).await;
            }
            Command::Edit { id, title, content } => {
                controller.update(id, NoteDraft { title, content }).await;
            }
            Command::Delete { id } => controller.delete(id).await,
            Command::List | Command::Show { .. } => {}
        }
        view.drain();
    }

    print!("{}", render(view.state()));

    if view.state().error.is_some() {
        process::exit(1);
    }
}
