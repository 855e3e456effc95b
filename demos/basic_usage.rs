//! Publish, subscribe, and let the expiration monitor run, against an
//! in-memory SQLite database.

use std::time::Duration;

use pgq::{Config, Manager, PublishOptions, SqliteExecutor, SubscribeOptions};

#[tokio::main]
async fn main() -> pgq::QueueResult<()> {
    tracing_subscriber::fmt::init();

    let executor = SqliteExecutor::connect("sqlite::memory:", "pgq_demo").await?;
    executor.migrate().await?;

    let manager = Manager::new(executor, Config::default());
    manager.monitor().await?;

    manager
        .publish(
            "email",
            serde_json::json!({"to": "ferris@example.com"}),
            PublishOptions::default(),
        )
        .await?;

    manager.subscribe_with_options(
        "email",
        SubscribeOptions {
            team_size: Some(2),
            ..Default::default()
        },
        std::sync::Arc::new(|job, handle| {
            Box::pin(async move {
                tracing::info!(data = ?job.data, "handling job");
                handle.complete().await?;
                Ok(())
            })
        }),
    )?;

    tokio::time::sleep(Duration::from_secs(1)).await;
    manager.stop();
    Ok(())
}
