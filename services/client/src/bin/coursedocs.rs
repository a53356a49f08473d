//! services/client/src/bin/coursedocs.rs

use clap::{Parser, Subcommand};
use client_lib::{
    adapters::{AssumeYes, TerminalConfirm},
    config::Config,
    engine::{AppState, CommandOutcome, DocumentSnapshot, Ports, SyncPhase},
    error::ClientError,
};
use coursedocs_core::{ports::PortError, ConfirmationService, User};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "coursedocs", version, about = "Organize course documents and follow their processing")]
struct Cli {
    /// Answer yes to every confirmation prompt.
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and remember the session.
    Login {
        email: String,
        #[arg(long, env = "COURSEDOCS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in to it.
    Register {
        email: String,
        #[arg(long, env = "COURSEDOCS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// List classes.
    Classes,
    /// Create a class.
    CreateClass { name: String },
    /// Delete a class and all of its documents.
    DeleteClass { class_id: String },
    /// List the documents of a class once.
    Documents { class_id: String },
    /// Follow a class until every document is processed.
    Watch {
        class_id: String,
        /// Keep following after the class settles, until interrupted.
        #[arg(long)]
        follow: bool,
    },
    /// Delete a document and show the reconciled list.
    DeleteDocument { class_id: String, document_id: String },
    /// Upload files into a class and follow their processing.
    Upload {
        class_id: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ClientError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded.");

    // --- 2. Build the Shared AppState ---
    let confirm: Arc<dyn ConfirmationService> = if cli.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(TerminalConfirm)
    };
    let state = AppState::new(config.clone(), Ports::from_config(&config, confirm)?);

    // --- 3. Dispatch ---
    match cli.command {
        Command::Login { email, password } => {
            let user = state.session.login(&email, &password).await.map_err(report)?;
            println!("Logged in as {}", user.email);
        }
        Command::Register { email, password } => {
            let user = state.session.register(&email, &password).await.map_err(report)?;
            println!("Registered and logged in as {}", user.email);
        }
        Command::Logout => {
            state.session.logout();
            println!("Logged out.");
        }
        Command::Whoami => {
            let user = require_user(&state).await?;
            println!("{} ({}), member since {}", user.email, user.id, user.created_at.format("%Y-%m-%d"));
        }
        Command::Classes => {
            require_user(&state).await?;
            for class in state.catalog.reload().await? {
                match class.created_at {
                    Some(created) => println!("{}\t{}\t{}", class.id, class.name, created.format("%Y-%m-%d")),
                    None => println!("{}\t{}", class.id, class.name),
                }
            }
        }
        Command::CreateClass { name } => {
            require_user(&state).await?;
            state.commands.open_create_dialog();
            match state.commands.create_class(&name).await? {
                CommandOutcome::Rejected => println!("A class needs a name."),
                _ => println!("Created class '{}'.", name.trim()),
            }
        }
        Command::DeleteClass { class_id } => {
            require_user(&state).await?;
            state.catalog.reload().await?;
            match state.commands.delete_class(&class_id).await? {
                CommandOutcome::Declined => println!("Nothing deleted."),
                _ => println!("Deleted class {}.", class_id),
            }
        }
        Command::Documents { class_id } => {
            let (handle, mut snapshots) = follow_class(&state, &class_id).await?;
            print_documents(&next_result(&mut snapshots, &class_id).await?);
            handle.detach().await;
        }
        Command::Watch { class_id, follow } => {
            let (handle, mut snapshots) = follow_class(&state, &class_id).await?;
            watch_until_settled(&mut snapshots, &class_id, follow, false).await?;
            handle.detach().await;
        }
        Command::DeleteDocument { class_id, document_id } => {
            let (handle, mut snapshots) = follow_class(&state, &class_id).await?;
            next_result(&mut snapshots, &class_id).await?;
            let outcome = state.commands.delete_document(&document_id).await;
            drop(snapshots.borrow_and_update());
            if let Ok(CommandOutcome::Declined) = outcome {
                println!("Nothing deleted.");
                handle.detach().await;
                return Ok(());
            }
            if let Err(e) = &outcome {
                eprintln!("Delete failed: {}", e.user_message());
            }
            // The delete pulsed the refresh signal; wait for the refetch it caused.
            snapshots.changed().await.map_err(|_| sync_stopped())?;
            print_documents(&next_result(&mut snapshots, &class_id).await?);
            handle.detach().await;
            outcome?;
        }
        Command::Upload { class_id, files } => {
            let (handle, mut snapshots) = follow_class(&state, &class_id).await?;
            next_result(&mut snapshots, &class_id).await?;
            for path in files {
                let contents = tokio::fs::read(&path).await?;
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .ok_or_else(|| ClientError::Internal(format!("{} is not a file", path.display())))?;
                state.commands.upload_document(&class_id, &filename, contents).await?;
                println!("Uploaded {}", filename);
            }
            // Only fetches caused by the last upload's pulse are of interest.
            drop(snapshots.borrow_and_update());
            watch_until_settled(&mut snapshots, &class_id, false, true).await?;
            handle.detach().await;
        }
    }

    Ok(())
}

/// Revalidates the stored token and returns its user, or fails as unauthorized.
async fn require_user(state: &AppState) -> Result<User, ClientError> {
    state
        .session
        .init()
        .await
        .ok_or(ClientError::Port(PortError::Unauthorized))
        .map_err(|e| {
            eprintln!("Not logged in. Run `coursedocs login <email>` first.");
            e
        })
}

/// Selects `class_id` and starts the sync engine on it.
async fn follow_class(
    state: &AppState,
    class_id: &str,
) -> Result<(client_lib::engine::SyncHandle, watch::Receiver<DocumentSnapshot>), ClientError> {
    require_user(state).await?;
    state.catalog.reload().await?;
    state.catalog.select(Some(class_id))?;
    let snapshots = state.documents.subscribe();
    Ok((state.start_sync(), snapshots))
}

/// Waits for the next completed fetch of `class_id`.
async fn next_result(
    snapshots: &mut watch::Receiver<DocumentSnapshot>,
    class_id: &str,
) -> Result<DocumentSnapshot, ClientError> {
    loop {
        {
            let snapshot = snapshots.borrow_and_update();
            if snapshot.phase == SyncPhase::Stopped {
                return Err(sync_stopped());
            }
            let done = matches!(snapshot.phase, SyncPhase::Settled | SyncPhase::Polling);
            if done && snapshot.class_id.as_deref() == Some(class_id) {
                return Ok(snapshot.clone());
            }
        }
        snapshots.changed().await.map_err(|_| sync_stopped())?;
    }
}

/// Prints every completed fetch until the class settles (or forever with
/// `follow`). With `skip_current`, the snapshot already seen is not reprinted.
async fn watch_until_settled(
    snapshots: &mut watch::Receiver<DocumentSnapshot>,
    class_id: &str,
    follow: bool,
    skip_current: bool,
) -> Result<(), ClientError> {
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);
    let mut wait_for_change = skip_current;

    loop {
        let next = async {
            if wait_for_change {
                snapshots.changed().await.map_err(|_| sync_stopped())?;
            }
            next_result(&mut *snapshots, class_id).await
        };
        let snapshot = tokio::select! {
            result = next => result?,
            _ = &mut interrupted => {
                info!("Interrupted.");
                return Ok(());
            }
        };
        print_documents(&snapshot);
        if snapshot.phase == SyncPhase::Settled && !follow {
            return Ok(());
        }
        wait_for_change = true;
    }
}

fn print_documents(snapshot: &DocumentSnapshot) {
    if let Some(error) = &snapshot.error {
        println!("Could not load documents: {}", error);
        return;
    }
    if snapshot.documents.is_empty() {
        println!("No documents uploaded.");
        return;
    }
    for doc in &snapshot.documents {
        let status = if doc.status.is_processed() {
            "processed"
        } else {
            doc.status.label().unwrap_or("pending")
        };
        println!("{}\t{}\t{}", doc.id, doc.filename, status);
    }
    if snapshot.phase == SyncPhase::Polling {
        println!("-- still processing --");
    }
}

fn report(err: ClientError) -> ClientError {
    eprintln!("{}", err.user_message());
    err
}

fn sync_stopped() -> ClientError {
    ClientError::Internal("document sync stopped unexpectedly".to_string())
}
