//! Queue display example
//!
//! Shows how to poll manager snapshots for a human-readable queue view.
//!
//! Usage: cargo run --example queue_display -- [url1] [url2] ...

use std::env;
use std::sync::Arc;
use std::time::Duration;
use vod_dl::{format_size, ClientConfig, DownloadManager, MemoryStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let urls: Vec<String> = env::args().skip(1).collect();
    let urls = if urls.is_empty() {
        vec![
            "https://httpbin.org/bytes/4096".to_string(),
            "https://httpbin.org/bytes/8192".to_string(),
        ]
    } else {
        urls
    };

    // Pace everything to 64 KB/s so there is something to watch
    let config = ClientConfig::default().bandwidth_limit(64);
    let manager = DownloadManager::new(config, Arc::new(MemoryStore::new())).await?;
    println!("Saving to {:?}", manager.download_dir());

    for (i, url) in urls.iter().enumerate() {
        let id = manager.enqueue(format!("Item {}", i + 1), url, None).await?;
        println!("Added: {id} - {url}");
    }

    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let snapshot = manager.snapshot().await?;

        println!("\n--- Queue ---");
        if let Some(task) = &snapshot.active {
            println!(
                "  {} | {:8} | {:5.1}% | {}/{} | {:.1} KB/s",
                task.id,
                task.status.label(),
                task.percentage(),
                format_size(task.downloaded_bytes),
                format_size(task.total_bytes),
                task.current_speed_kbs,
            );
        }
        for (position, task) in snapshot.queued.iter().enumerate() {
            println!("  {} | waiting #{} | {}", task.id, position + 1, task.name);
        }

        println!(
            "  Total: {} downloads, {}, avg {}/s",
            snapshot.stats.total_downloads,
            format_size(snapshot.stats.total_size_bytes),
            format_size(snapshot.stats.average_speed_bps as u64),
        );

        if snapshot.active.is_none() && snapshot.queued.is_empty() {
            println!("\n--- History ---");
            for record in &snapshot.history {
                println!("  {:10} {}", record.name, record.status_text);
            }
            break;
        }
    }

    manager.shutdown().await?;
    Ok(())
}
