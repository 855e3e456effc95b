//! End-to-end scenarios against an in-memory SQLite executor, covering the
//! invariants and scenarios this crate is built to satisfy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pgq::{Config, Event, Manager, PublishOptions, QueueError, SqliteExecutor, SubscribeOptions};

async fn manager(schema: &str) -> Manager<SqliteExecutor> {
    let executor = SqliteExecutor::connect("sqlite::memory:", schema)
        .await
        .expect("connect");
    executor.migrate().await.expect("migrate");
    Manager::new(executor, Config::default())
}

#[tokio::test]
async fn publish_fetch_complete_then_second_complete_fails() {
    let manager = manager("scenario_1").await;

    let id = manager
        .publish(
            "email",
            serde_json::json!({"to": "a"}),
            PublishOptions::default(),
        )
        .await
        .unwrap()
        .expect("first publish inserts a row");

    let job = manager
        .fetch("email")
        .await
        .unwrap()
        .expect("job is fetchable");
    assert_eq!(job.id, id);
    assert_eq!(job.data, serde_json::json!({"to": "a"}));

    manager.complete(id).await.unwrap();

    let second = manager.complete(id).await;
    assert!(matches!(second, Err(QueueError::NotFound { id: not_found }) if not_found == id));
}

#[tokio::test]
async fn team_of_workers_dispatches_every_published_job_with_no_errors() {
    let manager = manager("scenario_2").await;

    for i in 0..3 {
        manager
            .publish("work", serde_json::json!({"i": i}), PublishOptions::default())
            .await
            .unwrap();
    }

    let mut events = manager.events();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_for_cb = seen.clone();

    manager
        .subscribe_with_options(
            "work",
            SubscribeOptions {
                team_size: Some(3),
                new_job_check_interval_ms: Some(25),
                ..Default::default()
            },
            Arc::new(move |job, handle| {
                let seen = seen_for_cb.clone();
                Box::pin(async move {
                    seen.lock().unwrap().push(job.id);
                    handle.complete().await?;
                    Ok(())
                })
            }),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    manager.stop();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    let distinct: std::collections::HashSet<_> = seen.iter().collect();
    assert_eq!(distinct.len(), 3);

    let mut error_count = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, Event::Error(_)) {
            error_count += 1;
        }
    }
    assert_eq!(error_count, 0);
}

#[tokio::test]
async fn singleton_publish_in_same_bucket_is_suppressed() {
    let manager = manager("scenario_3").await;

    let options = PublishOptions {
        singleton_key: Some("k".to_string()),
        singleton_seconds: Some(60),
        ..Default::default()
    };

    let first = manager
        .publish("tick", serde_json::json!({}), options.clone())
        .await
        .unwrap();
    assert!(first.is_some());

    let second = manager
        .publish("tick", serde_json::json!({}), options)
        .await
        .unwrap();
    assert!(second.is_none());
}

#[tokio::test]
async fn singleton_next_slot_places_duplicate_in_the_next_bucket() {
    let manager = manager("scenario_4").await;

    let options = PublishOptions {
        singleton_key: Some("k".to_string()),
        singleton_seconds: Some(60),
        ..Default::default()
    };

    let first = manager
        .publish("tick", serde_json::json!({}), options.clone())
        .await
        .unwrap();
    assert!(first.is_some());

    let retry_options = PublishOptions {
        singleton_next_slot: true,
        ..options
    };
    let second = manager
        .publish("tick", serde_json::json!({}), retry_options)
        .await
        .unwrap();
    assert!(second.is_some(), "next-slot publish should still insert a row");
    assert_ne!(second, first);

    // Not fetchable yet: its startAfter is ~60s in the future.
    assert_eq!(manager.fetch("tick").await.unwrap(), None);
}

#[tokio::test]
async fn expired_active_job_is_refetchable_after_visibility_window_elapses() {
    let executor = SqliteExecutor::connect("sqlite::memory:", "scenario_5")
        .await
        .unwrap();
    executor.migrate().await.unwrap();
    let config = Config::builder()
        .expire_check_interval(Duration::from_millis(100))
        .build();
    let manager = Manager::new(executor, config);
    manager.monitor().await.unwrap();

    let options = PublishOptions {
        expire_in: Some(pgq::Interval::Seconds(1)),
        ..Default::default()
    };
    let id = manager
        .publish("slow", serde_json::json!({}), options)
        .await
        .unwrap()
        .expect("publish succeeds");

    let job = manager.fetch("slow").await.unwrap().expect("fetchable");
    assert_eq!(job.id, id);

    let mut events = manager.events();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let mut saw_expired = false;
    while let Ok(event) = events.try_recv() {
        if let Event::Expired { count } = event {
            assert!(count >= 1);
            saw_expired = true;
        }
    }
    assert!(saw_expired, "expiration sweep should have emitted Expired");

    let refetched = manager
        .fetch("slow")
        .await
        .unwrap()
        .expect("expired job is re-fetchable");
    assert_eq!(refetched.id, id);

    manager.stop();
}

#[tokio::test]
async fn callback_panic_surfaces_as_error_event_and_worker_keeps_running() {
    let manager = manager("scenario_6").await;

    manager
        .publish("flaky", serde_json::json!({}), PublishOptions::default())
        .await
        .unwrap();
    manager
        .publish("flaky", serde_json::json!({}), PublishOptions::default())
        .await
        .unwrap();

    let mut events = manager.events();
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_cb = attempts.clone();

    manager
        .subscribe_with_options(
            "flaky",
            SubscribeOptions {
                new_job_check_interval_ms: Some(25),
                ..Default::default()
            },
            Arc::new(move |_job, _handle| {
                attempts_for_cb.fetch_add(1, Ordering::AcqRel);
                Box::pin(async move {
                    Err(QueueError::InvalidArgument("synthetic failure".to_string()))
                })
            }),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    manager.stop();

    assert_eq!(attempts.load(Ordering::Acquire), 2);

    let mut error_events = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, Event::Error(_)) {
            error_events += 1;
        }
    }
    assert_eq!(error_events, 2);
}

#[tokio::test]
async fn stop_is_idempotent_and_disarms_the_monitor() {
    let manager = manager("scenario_7").await;
    manager.monitor().await.unwrap();
    manager.stop();
    manager.stop();
}
