use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use memefeed::config::Config;
use memefeed::feed::{FeedClient, FeedPhase, FeedSession};
use memefeed::likes::LikeSet;
use memefeed::media::{self, CommandOpener};
use memefeed::report::{ClientReporter, DeviceInfo};
use memefeed::selection;
use memefeed::store::Storage;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    init_tracing()?;

    info!("Starting memefeed");

    // Load and validate configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(feed_base_url = %config.feed_base_url, "Configuration loaded");

    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    let storage = Storage::new(&config.database_path)
        .await
        .context("Failed to initialize storage")?;

    info!("Storage initialized");

    // One-time client report; a missing bot configuration is surfaced but
    // must not keep the feed from starting.
    let reporter = ClientReporter::new(config.clone(), storage.clone())?;
    match reporter.report_once(&DeviceInfo::detect()).await {
        Ok(true) => info!("Client report sent"),
        Ok(false) => {}
        Err(e) => error!("Client report unavailable: {e:#}"),
    }

    let cancel = CancellationToken::new();

    // Keep the liked-set mirror in sync with storage for the lifetime of
    // the session.
    let likes = LikeSet::new(storage.clone());
    let watcher = likes.spawn_watcher(config.likes_refresh_interval, cancel.child_token());

    // Initial feed load
    let client = FeedClient::new(&config)?;
    let mut session = FeedSession::new(client, &config, cancel.child_token());
    session.load_initial().await;
    print_feed(&session, &likes);

    let opener = CommandOpener::new(&config.opener_path);

    // Command loop until EOF or shutdown signal
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_command(line.trim(), &mut session, &likes, &storage, &opener).await {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read input: {e}");
                        break;
                    }
                }
            }
        }
    }

    info!("Shutting down...");

    cancel.cancel();
    let _ = watcher.await;

    info!("Shutdown complete");

    Ok(())
}

/// Handle one command line. Returns `false` when the loop should exit.
async fn handle_command(
    line: &str,
    session: &mut FeedSession,
    likes: &LikeSet,
    storage: &Storage,
    opener: &CommandOpener,
) -> bool {
    let (command, arg) = match line.split_once(' ') {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "help" => print_help(),
        "list" => print_feed(session, likes),
        "more" => {
            if session.phase() == FeedPhase::Failed {
                println!("Feed is unavailable (max retries reached).");
            } else if !session.has_more() {
                println!("No more pages.");
            } else {
                session.load_more().await;
                print_feed(session, likes);
            }
        }
        "like" => {
            if let Some(meme) = feed_item(session, arg) {
                let liked = likes.toggle(&meme).await;
                println!("{} {}", if liked { "Liked" } else { "Unliked" }, meme.title);
            }
        }
        "likes" => print_likes(likes),
        "unlike" => {
            let snapshot = likes.snapshot();
            match parse_index(arg, snapshot.len()) {
                Some(i) => {
                    let meme = snapshot[i].meme.clone();
                    likes.remove(&meme).await;
                    println!("Removed {}", meme.title);
                }
                None => println!("Usage: unlike <number from `likes`>"),
            }
        }
        "show" => {
            if let Some(meme) = feed_item(session, arg) {
                // The selection write must succeed before "navigating" to
                // the detail view.
                match selection::select(storage, &meme).await {
                    Ok(()) => show_detail(storage).await,
                    Err(e) => error!("Failed to save meme data: {e:#}"),
                }
            }
        }
        "download" => {
            if let Some(meme) = feed_item(session, arg) {
                if let Err(e) = media::download(&meme, opener).await {
                    error!("Failed to open media: {e:#}");
                }
            }
        }
        "about" => print_about(),
        "quit" | "exit" => return false,
        _ => println!("Unknown command; try `help`."),
    }

    true
}

/// Resolve a 1-based feed index argument.
fn feed_item(session: &FeedSession, arg: &str) -> Option<memefeed::model::Meme> {
    match parse_index(arg, session.memes().len()) {
        Some(i) => Some(session.memes()[i].clone()),
        None => {
            println!("Usage: <command> <number from `list`>");
            None
        }
    }
}

fn parse_index(arg: &str, len: usize) -> Option<usize> {
    arg.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .filter(|&i| i < len)
}

fn print_feed(session: &FeedSession, likes: &LikeSet) {
    for (i, meme) in session.memes().iter().enumerate() {
        let heart = if likes.is_liked(meme) { "♥" } else { " " };
        println!(
            "{:3}. {heart} [{}] {} - {}",
            i + 1,
            meme.kind.as_str(),
            meme.title,
            meme.description
        );
    }
    println!(
        "Page {}/{}{}",
        session.current_page(),
        session.total_pages(),
        if session.has_more() {
            " - `more` to load the next page"
        } else {
            ""
        }
    );
}

fn print_likes(likes: &LikeSet) {
    let snapshot = likes.snapshot();
    if snapshot.is_empty() {
        println!("No liked memes yet.");
        return;
    }
    for (i, liked) in snapshot.iter().enumerate() {
        println!(
            "{:3}. [{}] {} (liked {})",
            i + 1,
            liked.meme.kind.as_str(),
            liked.meme.title,
            liked.liked_at
        );
    }
}

async fn show_detail(storage: &Storage) {
    match selection::load_selected(storage).await {
        Ok(Some(meme)) => {
            println!("{}", meme.title);
            println!("{}", meme.description);
            match media::download_url(&meme) {
                Some(url) => println!("media: {url}"),
                None => println!("media: unavailable"),
            }
        }
        Ok(None) => println!("Nothing selected."),
        Err(e) => error!("Failed to load meme data: {e:#}"),
    }
}

fn print_about() {
    println!("memefeed v{}", env!("CARGO_PKG_VERSION"));
    println!("Browse, like and download the latest memes in image and video form.");
    println!("store:   https://myket.ir/app/com.memefeed.app");
    println!("contact: https://t.me/memefeed_dev");
    println!("source:  https://github.com/memefeed/memefeed");
}

fn print_help() {
    println!("Commands:");
    println!("  list            show the loaded feed");
    println!("  more            load the next page");
    println!("  like <n>        toggle like on feed item n");
    println!("  likes           show liked memes");
    println!("  unlike <n>      remove liked meme n");
    println!("  show <n>        show feed item n in detail");
    println!("  download <n>    open feed item n's media externally");
    println!("  about           about this client");
    println!("  quit            exit");
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,memefeed=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
