mod common;

use std::time::Duration;

use common::{HandlerLog, RecordingTransport};
use guild_stats_dispatcher::{DispatcherBuilder, GenericProvider, WebhookDestination};
use tokio::time::sleep;

fn builder(transport: &RecordingTransport) -> DispatcherBuilder {
    DispatcherBuilder::new()
        .provider(GenericProvider::new(55, || 3))
        .bot_list(WebhookDestination::new("receiver", "https://stats.example.test/{id}"))
        .transport(transport.clone())
        .disable_logging()
}

#[tokio::test(start_paused = true)]
async fn test_auto_start_posts_on_schedule() {
    let transport = RecordingTransport::new();
    let dispatcher = builder(&transport)
        .interval(Duration::from_secs(1))
        .build()
        .unwrap();

    assert!(dispatcher.is_running());

    // Initial delay defaults to the interval: rounds at 1s, 2s, 3s.
    sleep(Duration::from_millis(3_500)).await;
    assert_eq!(transport.count(), 3);
    assert!(dispatcher.last_post().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_initial_delay_overrides_first_tick() {
    let transport = RecordingTransport::new();
    let _dispatcher = builder(&transport)
        .interval(Duration::from_secs(10))
        .initial_delay(Duration::from_secs(2))
        .build()
        .unwrap();

    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(transport.count(), 0);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(transport.count(), 1);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_start_then_stop_never_fires() {
    let transport = RecordingTransport::new();
    let dispatcher = builder(&transport)
        .interval(Duration::from_secs(60))
        .disable_auto_start()
        .build()
        .unwrap();

    assert!(!dispatcher.is_running());
    dispatcher.start_loop();
    assert!(dispatcher.is_running());
    dispatcher.stop_loop();
    assert!(!dispatcher.is_running());

    sleep(Duration::from_secs(600)).await;
    assert_eq!(transport.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let transport = RecordingTransport::new();
    let dispatcher = builder(&transport)
        .interval(Duration::from_secs(1))
        .build()
        .unwrap();

    dispatcher.stop_loop();
    dispatcher.stop_loop();
    assert!(!dispatcher.is_running());

    // Stopping a never-started dispatcher is fine too.
    let idle = builder(&transport)
        .interval(Duration::from_secs(1))
        .disable_auto_start()
        .build()
        .unwrap();
    idle.stop_loop();
    assert!(!idle.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let transport = RecordingTransport::new();
    let dispatcher = builder(&transport)
        .interval(Duration::from_secs(1))
        .build()
        .unwrap();

    // A second timer would double the rounds.
    dispatcher.start_loop();
    dispatcher.start_loop();

    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(transport.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_loop_can_be_restarted() {
    let transport = RecordingTransport::new();
    let dispatcher = builder(&transport)
        .interval(Duration::from_secs(1))
        .build()
        .unwrap();

    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(transport.count(), 1);

    dispatcher.stop_loop();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.count(), 1);

    dispatcher.start_loop();
    assert!(dispatcher.is_running());
    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(transport.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_interval_allows_manual_post_only() {
    let transport = RecordingTransport::new();
    let dispatcher = builder(&transport).interval_millis(-1).build().unwrap();

    assert_eq!(dispatcher.interval(), -1);
    assert!(!dispatcher.is_running());

    dispatcher.start_loop();
    assert!(!dispatcher.is_running());

    sleep(Duration::from_secs(3_600)).await;
    assert_eq!(transport.count(), 0);

    dispatcher.post().await.unwrap();
    assert_eq!(transport.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fixed_rate_tolerates_overlapping_rounds() {
    let log = HandlerLog::new();
    let transport = RecordingTransport::with_delay(Duration::from_millis(2_500));
    let _dispatcher = log
        .attach(builder(&transport))
        .interval(Duration::from_secs(1))
        .build()
        .unwrap();

    // Rounds start at 1s..=5s even though each takes 2.5s.
    sleep(Duration::from_millis(5_500)).await;
    assert_eq!(transport.count(), 5);
    assert!(log.successes().len() >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_does_not_cancel_in_flight_round() {
    let log = HandlerLog::new();
    let transport = RecordingTransport::with_delay(Duration::from_secs(5));
    let dispatcher = log
        .attach(builder(&transport))
        .interval(Duration::from_secs(1))
        .build()
        .unwrap();

    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(transport.count(), 1);

    dispatcher.stop_loop();
    sleep(Duration::from_secs(10)).await;

    assert_eq!(transport.count(), 1);
    assert_eq!(log.successes(), vec!["receiver".to_string()]);
    assert!(dispatcher.last_post().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_dispatcher_cancels_loop() {
    let transport = RecordingTransport::new();
    let dispatcher = builder(&transport)
        .interval(Duration::from_secs(1))
        .build()
        .unwrap();

    drop(dispatcher);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(transport.count(), 0);
}
