use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use journal_recorder::{
    create_router, AppState, Category, Config, Inventory, NatsUploader, SessionManager,
    SessionState, StaticIdentity, StaticPermission, Uploader,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "journal-recorder", about = "Voice journaling recorder service")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/journal-recorder")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Record one entry from the configured audio source
    Record {
        #[arg(long)]
        category: Category,
        /// Stop after this many seconds (capped by the session ceiling)
        #[arg(long)]
        seconds: Option<u32>,
    },
    /// List recordings for a category
    List { category: Category },
    /// Delete one recording
    Delete { id: Uuid },
    /// Delete every recording in a category
    Clear { category: Category },
    /// Show the journaling prompts
    Prompts,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let inventory = Arc::new(Inventory::open(cfg.recordings_dir())?);

    match cli.command {
        Command::Serve => serve(&cfg, inventory).await,
        Command::Record { category, seconds } => record(&cfg, inventory, category, seconds).await,
        Command::List { category } => {
            for recording in inventory.list(category).await? {
                println!(
                    "{}  {}  {:>5}  {}",
                    recording.id,
                    recording.created_at.format("%Y-%m-%d %H:%M:%S"),
                    recording.duration_label(),
                    recording.file_path.display()
                );
            }
            Ok(())
        }
        Command::Delete { id } => {
            let recording = inventory.delete(id).await?;
            println!("Deleted {} recording {}", recording.category, recording.id);
            Ok(())
        }
        Command::Clear { category } => {
            let removed = inventory.clear(category).await?;
            println!("Removed {} {} recordings", removed, category);
            Ok(())
        }
        Command::Prompts => {
            for category in Category::ALL {
                println!("{:<12} {}", category.title(), category.prompt());
            }
            Ok(())
        }
    }
}

async fn build_manager(cfg: &Config, inventory: Arc<Inventory>) -> Result<SessionManager> {
    let mut builder = SessionManager::builder(cfg.session_config()?, inventory)
        .permission(Arc::new(StaticPermission(cfg.permissions.microphone)))
        .identity(Arc::new(StaticIdentity(cfg.identity.user_id.clone())));

    if cfg.upload.enabled {
        match NatsUploader::connect(
            &cfg.upload.nats_url,
            cfg.upload.subject.clone(),
            Duration::from_secs(cfg.upload.timeout_secs),
        )
        .await
        {
            Ok(uploader) => {
                builder = builder.uploader(Arc::new(uploader) as Arc<dyn Uploader>);
            }
            // Recordings still persist locally without the remote store
            Err(e) => warn!("Uploads disabled: {:#}", e),
        }
    }

    Ok(builder.build())
}

async fn serve(cfg: &Config, inventory: Arc<Inventory>) -> Result<()> {
    let manager = build_manager(cfg, inventory).await?;
    let app = create_router(AppState::new(manager.clone()));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    if let Some(recording) = manager.shutdown().await? {
        info!("Saved in-progress recording {} on shutdown", recording.id);
    }
    Ok(())
}

async fn record(
    cfg: &Config,
    inventory: Arc<Inventory>,
    category: Category,
    seconds: Option<u32>,
) -> Result<()> {
    let manager = build_manager(cfg, inventory).await?;
    let mut state = manager.subscribe();

    println!("{}", category.prompt());
    let snapshot = manager.start(category).await?;
    println!(
        "Recording to {} (max {}s, Ctrl-C to stop)",
        snapshot
            .target_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        snapshot.max_duration_secs
    );

    let limit = seconds.unwrap_or(snapshot.max_duration_secs);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = state.borrow_and_update().clone();
                if !current.is_recording() || current.elapsed_seconds >= limit {
                    break;
                }
                let left = current
                    .remaining_seconds()
                    .min(limit - current.elapsed_seconds);
                eprint!("\r{:>3}s left ", left);
            }
        }
    }
    eprintln!();

    let recording = match manager.stop().await? {
        Some(recording) => recording,
        // The ceiling stop got there first
        None => {
            while manager.snapshot().state != SessionState::Idle {
                if state.changed().await.is_err() {
                    break;
                }
            }
            let id = snapshot.session_id.context("Session started without an id")?;
            manager
                .inventory()
                .get(id)
                .await
                .context("Recording was not saved")?
        }
    };

    println!(
        "Saved {} ({}) -> {}",
        recording.id,
        recording.duration_label(),
        recording.file_path.display()
    );

    for url in manager.drain_uploads().await {
        println!("Uploaded: {}", url);
    }
    Ok(())
}
