//! Fetch a playlist and download matching entries
//!
//! Loads the playlist, filters it by a search query and queues every match.
//!
//! Usage: cargo run --example fetch_and_download -- <playlist-url> [query]

use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vod_dl::{
    ConfigStore, DownloadManager, EntryFilter, JsonFileStore, ManagerEvent, PlaylistFetcher,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = Arc::new(JsonFileStore::default_location());
    let mut config = store.load().await?;

    let mut args = env::args().skip(1);
    if let Some(url) = args.next() {
        config.playlist_url = url;
    }
    let query = args.next().unwrap_or_default();
    if config.playlist_url.is_empty() {
        eprintln!("No playlist URL given and none saved");
        return Ok(());
    }

    let fetcher = PlaylistFetcher::new(&config.http)?;
    let mut fetch = fetcher.spawn(config.playlist_url.clone());
    while let Some(phase) = fetch.next_phase().await {
        println!("{phase}");
    }
    let playlist = match fetch.join().await {
        Ok(playlist) => playlist,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Ok(());
        }
    };
    println!("Loaded {} entries", playlist.len());

    let matches = EntryFilter::new().query(query).apply(&playlist);
    if matches.is_empty() {
        println!("Nothing matched");
        return Ok(());
    }

    let manager = DownloadManager::new(config, store).await?;
    let mut events = manager.subscribe();
    let mut remaining = 0usize;
    for entry in matches {
        manager.enqueue(&entry.title, &entry.media_url, None).await?;
        println!("Queued: {}", entry.title);
        remaining += 1;
    }

    while remaining > 0 {
        match events.recv().await {
            Ok(ManagerEvent::Progress { name, progress }) => {
                println!("{name}: {}% ({:.1} KB/s)", progress.percent, progress.speed_kbs);
            }
            Ok(event @ (ManagerEvent::Completed { .. } | ManagerEvent::Failed { .. })) => {
                println!("{event:?}");
                remaining -= 1;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Event error: {e}");
                break;
            }
        }
    }

    for record in manager.history().await? {
        println!("{:30} {}", record.name, record.status_text);
    }

    manager.shutdown().await?;
    Ok(())
}
