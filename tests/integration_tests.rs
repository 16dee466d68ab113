//! Integration tests for vod-dl
//!
//! These tests use wiremock to simulate playlist panels and media servers
//! and drive the download manager through queueing, pause/resume,
//! cancellation and error recovery.

mod test_helpers;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use test_helpers::{
    create_test_manager, media_body, mount_media, mount_status, wait_for_event, wait_for_finish,
    PlaylistBuilder,
};
use tokio_util::sync::CancellationToken;
use vod_dl::{
    ClientConfig, ConfigStore, DownloadManager, Error, FetchPhase, FormatErrorKind,
    JsonFileStore, ManagerEvent, PlaylistFetcher, TaskStatus,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(20);

// =============================================================================
// Queue Ordering Tests
// =============================================================================

#[tokio::test]
async fn test_idle_enqueue_starts_immediately() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_media(&mock_server, "/movie/slow.mp4", media_body(64 * 1024)).await;

    let (manager, _store) = create_test_manager(&temp_dir, 1024).await;
    let url = format!("{}/movie/slow.mp4", mock_server.uri());
    let id = manager
        .enqueue("Slow Movie", &url, Some(8))
        .await
        .expect("Failed to enqueue");

    // Never observably queued
    let snapshot = manager.snapshot().await.unwrap();
    let active = snapshot.active.expect("Task should be active");
    assert_eq!(active.id, id);
    assert_eq!(active.status, TaskStatus::Active);
    assert!(active.started_at.is_some());
    assert!(snapshot.queued.is_empty());
    assert_eq!(snapshot.history[0].status_text, "Active");

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_second_enqueue_waits_for_first() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_media(&mock_server, "/movie/first.mp4", media_body(8 * 1024)).await;
    mount_media(&mock_server, "/movie/second.mkv", media_body(2048)).await;

    let (manager, _store) = create_test_manager(&temp_dir, 1024).await;
    let mut events = manager.subscribe();

    manager
        .enqueue("First", format!("{}/movie/first.mp4", mock_server.uri()), Some(16))
        .await
        .unwrap();
    manager
        .enqueue("Second", format!("{}/movie/second.mkv", mock_server.uri()), None)
        .await
        .unwrap();

    let snapshot = manager.snapshot().await.unwrap();
    assert_eq!(snapshot.active.map(|t| t.name), Some("First".to_string()));
    assert_eq!(snapshot.queued.len(), 1);
    assert_eq!(snapshot.queued[0].name, "Second");
    assert_eq!(snapshot.queued[0].status, TaskStatus::Queued);

    // First must finish before Second starts
    let mut order = Vec::new();
    let collected = tokio::time::timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(ManagerEvent::Started { name }) => order.push(format!("start {}", name)),
                Ok(ManagerEvent::Completed { name, .. }) => {
                    let done = name == "Second";
                    order.push(format!("done {}", name));
                    if done {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => panic!("Event channel failed: {}", e),
            }
        }
    })
    .await;
    assert!(collected.is_ok(), "Second should complete");
    assert_eq!(
        order,
        vec!["start First", "done First", "start Second", "done Second"]
    );

    let history = manager.history().await.unwrap();
    let status = |name: &str| {
        history
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.status_text.clone())
    };
    assert_eq!(status("First").as_deref(), Some("Completed - 8.00 KB"));
    assert_eq!(status("Second").as_deref(), Some("Completed - 2.00 KB"));
    // Most recent first
    assert_eq!(history[0].name, "Second");

    assert_eq!(
        std::fs::read(temp_dir.path().join("First.mp4")).unwrap(),
        media_body(8 * 1024)
    );
    assert_eq!(
        std::fs::read(temp_dir.path().join("Second.mkv")).unwrap(),
        media_body(2048)
    );

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_start_order_follows_enqueue_order() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    for name in ["a", "b", "c"] {
        mount_media(&mock_server, &format!("/{}.mp4", name), media_body(1024)).await;
    }

    let (manager, _store) = create_test_manager(&temp_dir, 512).await;
    let mut events = manager.subscribe();

    for name in ["a", "b", "c"] {
        manager
            .enqueue(name, format!("{}/{}.mp4", mock_server.uri(), name), None)
            .await
            .unwrap();
    }

    let mut started = Vec::new();
    while started.len() < 3 {
        match wait_for_event(
            &mut events,
            |e| matches!(e, ManagerEvent::Started { .. }),
            WAIT,
        )
        .await
        {
            Some(ManagerEvent::Started { name }) => started.push(name),
            other => panic!("Expected a start event, got {:?}", other),
        }
    }
    assert_eq!(started, vec!["a", "b", "c"]);

    wait_for_finish(&mut events, "c", WAIT)
        .await
        .expect("Last task should finish");
    manager.shutdown().await.unwrap();
}

// =============================================================================
// Cancellation Tests
// =============================================================================

#[tokio::test]
async fn test_cancel_active_removes_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_media(&mock_server, "/movie/slow.mp4", media_body(64 * 1024)).await;

    let (manager, _store) = create_test_manager(&temp_dir, 1024).await;
    let mut events = manager.subscribe();

    manager
        .enqueue("Slow", format!("{}/movie/slow.mp4", mock_server.uri()), Some(8))
        .await
        .unwrap();

    wait_for_event(
        &mut events,
        |e| matches!(e, ManagerEvent::Progress { .. }),
        WAIT,
    )
    .await
    .expect("Should report progress");
    let partial = temp_dir.path().join("Slow.mp4");
    assert!(partial.exists(), "Partial file should exist while active");

    assert!(manager.cancel("Slow").await.unwrap());

    // The engine has been joined before the reply
    assert!(!partial.exists(), "Partial file should be deleted");
    let snapshot = manager.snapshot().await.unwrap();
    assert!(snapshot.active.is_none());
    assert_eq!(snapshot.history[0].name, "Slow");
    assert_eq!(snapshot.history[0].status_text, "Cancelled");
    assert_eq!(snapshot.stats.total_downloads, 0);

    manager.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_at_end_of_transfer_never_leaves_file() {
    const BODY_LEN: usize = 256 * 1024;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_media(&mock_server, "/tail.mp4", media_body(BODY_LEN)).await;

    let (manager, _store) = create_test_manager(&temp_dir, 64 * 1024).await;
    let url = format!("{}/tail.mp4", mock_server.uri());
    let mut completed = 0;

    for round in 0..30 {
        let name = format!("Tail {}", round);
        let file = temp_dir.path().join(format!("Tail_{}.mp4", round));
        manager.enqueue(&name, &url, None).await.unwrap();

        // Cancel as soon as every byte is on disk
        tokio::time::timeout(WAIT, async {
            loop {
                let len = std::fs::metadata(&file).map(|m| m.len()).unwrap_or(0);
                if len == BODY_LEN as u64 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("file reaches full size");

        let cancelled = manager.cancel(&name).await.unwrap();
        let history = manager.history().await.unwrap();
        let record = history.iter().find(|r| r.name == name).unwrap();

        if cancelled {
            assert!(!file.exists(), "round {}: cancelled file left on disk", round);
            assert_eq!(record.status_text, "Cancelled");
        } else {
            assert!(file.exists());
            assert!(record.status_text.starts_with("Completed"));
            completed += 1;
        }

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.total_downloads, completed);
    }

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancel_active_dispatches_next() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_media(&mock_server, "/slow.mp4", media_body(64 * 1024)).await;
    mount_media(&mock_server, "/next.mp4", media_body(4096)).await;

    let (manager, _store) = create_test_manager(&temp_dir, 1024).await;
    let mut events = manager.subscribe();

    manager
        .enqueue("Slow", format!("{}/slow.mp4", mock_server.uri()), Some(8))
        .await
        .unwrap();
    manager
        .enqueue("Next", format!("{}/next.mp4", mock_server.uri()), None)
        .await
        .unwrap();

    assert!(manager.cancel("Slow").await.unwrap());

    let finished = wait_for_finish(&mut events, "Next", WAIT).await;
    assert!(matches!(finished, Some(ManagerEvent::Completed { total_bytes: 4096, .. })));

    let history = manager.history().await.unwrap();
    let slow = history.iter().find(|r| r.name == "Slow").unwrap();
    assert_eq!(slow.status_text, "Cancelled");
    assert!(!temp_dir.path().join("Slow.mp4").exists());

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cancel_queued_task() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_media(&mock_server, "/slow.mp4", media_body(64 * 1024)).await;
    mount_media(&mock_server, "/queued.mp4", media_body(1024)).await;

    let (manager, _store) = create_test_manager(&temp_dir, 1024).await;
    manager
        .enqueue("Slow", format!("{}/slow.mp4", mock_server.uri()), Some(8))
        .await
        .unwrap();
    manager
        .enqueue("Queued", format!("{}/queued.mp4", mock_server.uri()), None)
        .await
        .unwrap();

    assert!(manager.cancel("Queued").await.unwrap());
    assert!(!manager.cancel("Queued").await.unwrap());

    let snapshot = manager.snapshot().await.unwrap();
    assert!(snapshot.queued.is_empty());
    assert_eq!(snapshot.active.map(|t| t.name), Some("Slow".to_string()));
    let queued = snapshot.history.iter().find(|r| r.name == "Queued").unwrap();
    assert_eq!(queued.status_text, "Cancelled");

    manager.shutdown().await.unwrap();
}

// =============================================================================
// Pause / Resume Tests
// =============================================================================

#[tokio::test]
async fn test_pause_resume_completes_full_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    let content = media_body(16 * 1024);
    mount_media(&mock_server, "/movie/pause.mp4", content.clone()).await;

    let (manager, _store) = create_test_manager(&temp_dir, 1024).await;
    let mut events = manager.subscribe();

    manager
        .enqueue("Pause Me", format!("{}/movie/pause.mp4", mock_server.uri()), Some(16))
        .await
        .unwrap();
    wait_for_event(
        &mut events,
        |e| matches!(e, ManagerEvent::Progress { .. }),
        WAIT,
    )
    .await
    .expect("Should report progress");

    assert!(manager.pause("Pause Me").await.unwrap());
    // Already paused
    assert!(!manager.pause("Pause Me").await.unwrap());

    tokio::time::sleep(Duration::from_millis(300)).await;
    let before = manager.snapshot().await.unwrap();
    let paused = before.active.expect("Paused task keeps the slot");
    assert_eq!(paused.status, TaskStatus::Paused);
    assert_eq!(before.history[0].status_text, "Paused");

    tokio::time::sleep(Duration::from_millis(400)).await;
    let after = manager.snapshot().await.unwrap();
    assert_eq!(
        after.active.map(|t| t.downloaded_bytes),
        Some(paused.downloaded_bytes),
        "No bytes should be written while paused"
    );

    assert!(manager.resume("Pause Me").await.unwrap());
    assert!(!manager.resume("Pause Me").await.unwrap());

    let finished = wait_for_finish(&mut events, "Pause Me", WAIT).await;
    assert!(matches!(
        finished,
        Some(ManagerEvent::Completed { total_bytes, .. }) if total_bytes == content.len() as u64
    ));

    let written = std::fs::read(temp_dir.path().join("Pause_Me.mp4")).unwrap();
    assert_eq!(written, content);

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_pause_only_affects_active_task() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_media(&mock_server, "/slow.mp4", media_body(64 * 1024)).await;
    mount_media(&mock_server, "/waiting.mp4", media_body(1024)).await;

    let (manager, _store) = create_test_manager(&temp_dir, 1024).await;
    manager
        .enqueue("Slow", format!("{}/slow.mp4", mock_server.uri()), Some(8))
        .await
        .unwrap();
    manager
        .enqueue("Waiting", format!("{}/waiting.mp4", mock_server.uri()), None)
        .await
        .unwrap();

    assert!(!manager.pause("Waiting").await.unwrap());
    assert!(!manager.resume("Slow").await.unwrap());

    let snapshot = manager.snapshot().await.unwrap();
    assert_eq!(snapshot.queued[0].status, TaskStatus::Queued);
    assert_eq!(snapshot.active.map(|t| t.status), Some(TaskStatus::Active));

    manager.shutdown().await.unwrap();
}

// =============================================================================
// Bandwidth Tests
// =============================================================================

#[tokio::test]
async fn test_bandwidth_limit_paces_download() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_media(&mock_server, "/paced.mp4", media_body(32 * 1024)).await;

    let (manager, _store) = create_test_manager(&temp_dir, 4096).await;
    let mut events = manager.subscribe();

    // 32 KiB at 32 KB/s: about one second
    let started = Instant::now();
    manager
        .enqueue("Paced", format!("{}/paced.mp4", mock_server.uri()), Some(32))
        .await
        .unwrap();
    let finished = wait_for_finish(&mut events, "Paced", WAIT).await;
    let elapsed = started.elapsed();

    assert!(matches!(finished, Some(ManagerEvent::Completed { .. })));
    assert!(
        elapsed >= Duration::from_millis(900),
        "Transfer took {:?}, expected at least ~1s",
        elapsed
    );

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_default_bandwidth_limit_applies_to_new_tasks() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_media(&mock_server, "/slow.mp4", media_body(64 * 1024)).await;

    let (manager, _store) = create_test_manager(&temp_dir, 1024).await;
    manager.set_bandwidth_limit(8).await.unwrap();
    manager
        .enqueue("Default", format!("{}/slow.mp4", mock_server.uri()), None)
        .await
        .unwrap();

    let snapshot = manager.snapshot().await.unwrap();
    assert_eq!(
        snapshot.active.and_then(|t| t.bandwidth_limit_kbs),
        Some(8)
    );

    manager.shutdown().await.unwrap();
}

// =============================================================================
// Statistics Tests
// =============================================================================

#[tokio::test]
async fn test_statistics_after_downloads() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    let sizes = [1024usize, 2048, 4096];
    for (i, size) in sizes.iter().enumerate() {
        mount_media(&mock_server, &format!("/{}.mp4", i), media_body(*size)).await;
    }

    let (manager, store) = create_test_manager(&temp_dir, 1024).await;
    let mut events = manager.subscribe();

    for i in 0..sizes.len() {
        manager
            .enqueue(
                format!("Movie {}", i),
                format!("{}/{}.mp4", mock_server.uri(), i),
                None,
            )
            .await
            .unwrap();
    }
    wait_for_finish(&mut events, "Movie 2", WAIT)
        .await
        .expect("Last download should finish");

    let stats = manager.stats().await.unwrap();
    assert_eq!(stats.total_downloads, 3);
    assert_eq!(stats.total_size_bytes, (1024 + 2048 + 4096) as u64);
    assert_eq!(stats.speed_samples.len(), 3);
    let mean = stats.speed_samples.iter().sum::<f64>() / 3.0;
    assert!((stats.average_speed_bps - mean).abs() < 1e-6);

    // Persisted after every completion
    assert_eq!(store.save_count(), 3);
    assert_eq!(store.stored().map(|c| c.stats), Some(stats));

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_statistics_persist_to_json_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_media(&mock_server, "/movie.mp4", media_body(4096)).await;

    let config_path = temp_dir.path().join("config").join("config.json");
    let store = Arc::new(JsonFileStore::new(&config_path));
    store
        .save(
            &ClientConfig::new()
                .playlist_url("http://panel.example/get.php")
                .download_dir(temp_dir.path().join("media")),
        )
        .await
        .unwrap();

    let manager = DownloadManager::load(store.clone()).await.unwrap();
    let mut events = manager.subscribe();
    manager
        .enqueue("Movie", format!("{}/movie.mp4", mock_server.uri()), None)
        .await
        .unwrap();
    wait_for_finish(&mut events, "Movie", WAIT)
        .await
        .expect("Download should finish");
    manager.shutdown().await.unwrap();

    assert!(temp_dir.path().join("media").join("Movie.mp4").exists());

    let reloaded = JsonFileStore::new(&config_path).load().await.unwrap();
    assert_eq!(reloaded.stats.total_downloads, 1);
    assert_eq!(reloaded.stats.total_size_bytes, 4096);
    // Unrelated settings survive the stats update
    assert_eq!(reloaded.playlist_url, "http://panel.example/get.php");
}

// =============================================================================
// Error Recovery Tests
// =============================================================================

#[tokio::test]
async fn test_http_error_recorded_and_queue_continues() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, "/missing.mp4", 404).await;
    mount_media(&mock_server, "/present.mp4", media_body(2048)).await;

    let (manager, _store) = create_test_manager(&temp_dir, 1024).await;
    let mut events = manager.subscribe();

    manager
        .enqueue("Missing", format!("{}/missing.mp4", mock_server.uri()), None)
        .await
        .unwrap();
    manager
        .enqueue("Present", format!("{}/present.mp4", mock_server.uri()), None)
        .await
        .unwrap();

    let failed = wait_for_finish(&mut events, "Missing", WAIT).await;
    assert!(matches!(failed, Some(ManagerEvent::Failed { .. })));
    let finished = wait_for_finish(&mut events, "Present", WAIT).await;
    assert!(matches!(finished, Some(ManagerEvent::Completed { .. })));

    let history = manager.history().await.unwrap();
    let missing = history.iter().find(|r| r.name == "Missing").unwrap();
    assert!(missing.status_text.starts_with("Error: "));
    assert!(missing.status_text.contains("404"));

    let stats = manager.stats().await.unwrap();
    assert_eq!(stats.total_downloads, 1);

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_size_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;
    mount_media(&mock_server, "/empty.mp4", Vec::new()).await;

    let (manager, _store) = create_test_manager(&temp_dir, 1024).await;
    let mut events = manager.subscribe();
    manager
        .enqueue("Empty", format!("{}/empty.mp4", mock_server.uri()), None)
        .await
        .unwrap();

    match wait_for_finish(&mut events, "Empty", WAIT).await {
        Some(ManagerEvent::Failed { error, .. }) => {
            assert_eq!(error, Error::SizeUnknown.to_string());
        }
        other => panic!("Expected failure, got {:?}", other),
    }

    let history = manager.history().await.unwrap();
    assert_eq!(
        history[0].status_text,
        format!("Error: {}", Error::SizeUnknown)
    );
    assert!(manager.snapshot().await.unwrap().active.is_none());

    manager.shutdown().await.unwrap();
}

// =============================================================================
// Playlist Fetch Tests
// =============================================================================

#[tokio::test]
async fn test_fetch_playlist_and_download_entry() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mock_server = MockServer::start().await;

    let playlist_text = PlaylistBuilder::new()
        .entry(
            "Le Fabuleux Destin d'Amélie",
            "Films",
            &format!("{}/movie/u/p/101.mkv", mock_server.uri()),
        )
        .entry(
            "Second Feature",
            "Films",
            &format!("{}/movie/u/p/102.mp4", mock_server.uri()),
        )
        .build();
    Mock::given(method("GET"))
        .and(path("/get.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(playlist_text))
        .mount(&mock_server)
        .await;
    mount_media(&mock_server, "/movie/u/p/101.mkv", media_body(3000)).await;

    let config = ClientConfig::new().download_dir(temp_dir.path());
    let fetcher = PlaylistFetcher::new(&config.http).unwrap();
    let mut handle = fetcher.spawn(format!("{}/get.php", mock_server.uri()));

    let mut phases = Vec::new();
    while let Some(phase) = handle.next_phase().await {
        phases.push(phase);
    }
    assert_eq!(
        phases,
        vec![
            FetchPhase::Connecting,
            FetchPhase::Downloading,
            FetchPhase::Parsing
        ]
    );

    let playlist = handle.join().await.expect("Playlist should parse");
    assert_eq!(playlist.len(), 2);
    assert_eq!(playlist.categories(), vec!["Films".to_string()]);

    let entry = &playlist.entries[0];
    let (manager, _store) = create_test_manager(&temp_dir, 1024).await;
    let mut events = manager.subscribe();
    manager
        .enqueue(&entry.title, &entry.media_url, None)
        .await
        .unwrap();
    let finished = wait_for_finish(&mut events, &entry.title, WAIT).await;
    assert!(matches!(finished, Some(ManagerEvent::Completed { total_bytes: 3000, .. })));

    let expected = temp_dir.path().join("Le_Fabuleux_Destin_dAmelie.mkv");
    assert_eq!(std::fs::read(expected).unwrap(), media_body(3000));

    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_fetch_rejects_non_playlist() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server)
        .await;

    let fetcher = PlaylistFetcher::new(&ClientConfig::default().http).unwrap();
    let err = fetcher
        .fetch(
            &format!("{}/get.php", mock_server.uri()),
            &CancellationToken::new(),
            |_| {},
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Format(FormatErrorKind::InvalidFormat)));
}

#[tokio::test]
async fn test_fetch_forbidden_message() {
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, "/get.php", 403).await;

    let fetcher = PlaylistFetcher::new(&ClientConfig::default().http).unwrap();
    let err = fetcher
        .spawn(format!("{}/get.php", mock_server.uri()))
        .join()
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), Some(403));
    assert!(err.user_message().contains("403 Forbidden"));
}

#[tokio::test]
async fn test_fetch_stop_discards_result() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PlaylistBuilder::new().entry("A", "G", "http://x/a.mp4").build())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;

    let fetcher = PlaylistFetcher::new(&ClientConfig::default().http).unwrap();
    let handle = fetcher.spawn(format!("{}/get.php", mock_server.uri()));
    tokio::time::timeout(WAIT, handle.stop())
        .await
        .expect("Stop should wait for the worker");
}
