//! Order service on top of a resilient store client
//!
//! This demo walks an order service through the situations a store client
//! has to survive, against the in-memory driver:
//! - Transient driver errors retried with backoff
//! - A multi-document transaction restarted after a write conflict
//! - The circuit breaker opening during an outage and recovering
//! - Pool statistics and threshold alerts
//! - Graceful shutdown with in-flight draining
//!
//! Run with: cargo run --example order_service
//! Set RUST_LOG=storeguard=debug to see every attempt.

use futures::FutureExt;
use std::time::Duration;
use storeguard::memory::{MemoryDriver, MemorySession};
use storeguard::{
    step, CallScope, OperationOptions, ResilienceConfig, ShutdownSignal, StoreClient, StoreError,
    TransactionStep,
};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
environment = "development"
retry_base_delay = 50
retry_max_delay = 400
circuit_breaker_threshold = 3
circuit_breaker_cooldown = 1000
reconnect_delay = 200
shutdown_drain_timeout = 2000

[endpoint]
host = "orders-db.internal"
port = 27017
database = "shop"

[alerts]
memory_threshold_mb = 512
"#;

fn place_order(order: &'static str, sku: &'static str) -> Vec<TransactionStep<MemorySession, String>> {
    vec![
        step(move |session: &mut MemorySession| {
            async move {
                session.insert("orders", order, "placed").await?;
                Ok::<_, StoreError>(format!("order {order}"))
            }
            .boxed()
        }),
        step(move |session: &mut MemorySession| {
            async move {
                session.put("inventory", sku, "reserved").await?;
                Ok::<_, StoreError>(format!("reserved {sku}"))
            }
            .boxed()
        }),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storeguard=info")),
        )
        .init();

    let config = ResilienceConfig::from_toml_str(CONFIG)?;
    let driver = MemoryDriver::with_pool_size(20);
    let client = StoreClient::builder(driver.clone(), config)
        .name("orders")
        .on_retry_event(|event| println!("[retry] {event:?}"))
        .on_stats_alert(|alert| println!("[alert] {alert}"))
        .build()?;

    println!("=== Connecting ===");
    client.connect().await?;
    println!("{:?}\n", client.connection_status());

    println!("=== Transient errors are retried ===");
    driver.fail_next(StoreError::driver(189, "primary stepped down"));
    driver.fail_next(StoreError::connection("connection reset by peer"));
    let outcome = client
        .execute_with_retry(
            |connection| async move {
                connection.put("orders", "o-100", "placed").await?;
                connection.count("orders").await
            },
            &OperationOptions::new(),
        )
        .await;
    println!("outcome: {outcome:?}\n");

    println!("=== Validation errors are not ===");
    let outcome = client
        .execute_with_retry(
            |connection| async move { connection.insert("orders", "o-100", "duplicate").await },
            &OperationOptions::new(),
        )
        .await;
    println!("outcome: {outcome:?} (HTTP {})\n", outcome.http_status());
    client.force_circuit_breaker_reset();

    println!("=== Transaction restarted after a write conflict ===");
    driver.fail_next_commit(
        StoreError::driver(112, "write conflict").with_label("TransientTransactionError"),
    );
    let outcome = client
        .execute_with_transaction(
            &place_order("o-101", "sku-7"),
            client.transaction_options(),
            &CallScope::new(),
        )
        .await;
    println!("outcome: {outcome:?}");
    println!("orders: {:?}\n", driver.documents("orders"));

    println!("=== Outage trips the circuit breaker ===");
    driver.set_reachable(false);
    for _ in 0..4 {
        let outcome = client
            .execute_with_retry(
                |connection| async move { connection.count("orders").await },
                &OperationOptions::new(),
            )
            .await;
        println!(
            "outcome: {outcome:?}, circuit: {}",
            client.circuit_breaker_status().state
        );
    }
    let health = client.health_check().await;
    println!("health: {} (HTTP {})", health.status, health.http_status());

    driver.set_reachable(true);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let health = client.health_check().await;
    println!(
        "after cooldown: health {}, circuit {}\n",
        health.status,
        client.circuit_breaker_status().state
    );

    println!("=== Statistics ===");
    driver.set_resident_memory_mb(900);
    let stats = client.collect_stats().await?;
    println!(
        "pool {}/{} in use ({:.1}%), {} MB resident, alerts {:?}\n",
        stats.active, stats.total, stats.utilization_percent, stats.resident_memory_mb, stats.alerts
    );

    println!("=== Graceful shutdown ===");
    driver.set_latency(Duration::from_millis(300));
    let options = OperationOptions::new();
    let slow = client.execute_with_retry(
        |connection| async move { connection.count("orders").await },
        &options,
    );
    let shutdown = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.graceful_shutdown(ShutdownSignal::Requested).await
    };
    let (outcome, report) = tokio::join!(slow, shutdown);
    println!("in-flight outcome: {outcome:?}");
    println!("shutdown: {report:?}");
    println!("readiness: {:?}", client.readiness());

    Ok(())
}
