use super::{client_with, connected_client, fast_config};
use futures::FutureExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use storeguard::circuitbreaker::CircuitState;
use storeguard::memory::{MemoryDriver, MemorySession};
use storeguard::transaction::TransactionEvent;
use storeguard::{
    step, CallScope, OperationOutcome, ResilienceConfig, StoreClient, StoreError,
    TransactionBreakerMode, TransactionStep,
};

fn put(collection: &'static str, id: &'static str, body: &'static str) -> TransactionStep<MemorySession, String> {
    step(move |session: &mut MemorySession| {
        async move {
            session.put(collection, id, body).await?;
            Ok::<_, StoreError>(id.to_string())
        }
        .boxed()
    })
}

fn failing(error: StoreError) -> TransactionStep<MemorySession, String> {
    step(move |_session: &mut MemorySession| {
        let error = error.clone();
        async move { Err(error) }.boxed()
    })
}

#[tokio::test(start_paused = true)]
async fn steps_commit_together_in_order() {
    let (driver, client) = connected_client().await;
    let steps = vec![
        put("orders", "o-1", "placed"),
        put("inventory", "sku-9", "reserved"),
        put("payments", "p-1", "captured"),
    ];

    let outcome = client
        .execute_with_transaction(&steps, client.transaction_options(), &CallScope::new())
        .await;

    assert_eq!(
        outcome,
        OperationOutcome::Success(vec![
            "o-1".to_string(),
            "sku-9".to_string(),
            "p-1".to_string()
        ])
    );
    assert_eq!(driver.documents("orders").len(), 1);
    assert_eq!(driver.documents("inventory").len(), 1);
    assert_eq!(driver.documents("payments").len(), 1);
    assert_eq!(driver.open_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn failing_middle_step_leaves_no_side_effects() {
    let (driver, client) = connected_client().await;
    let steps = vec![
        put("orders", "o-1", "placed"),
        failing(StoreError::validation("insufficient stock")),
        put("payments", "p-1", "captured"),
    ];

    let outcome = client
        .execute_with_transaction(&steps, client.transaction_options(), &CallScope::new())
        .await;

    assert_eq!(
        outcome,
        OperationOutcome::FatalFailure(StoreError::validation("insufficient stock"))
    );
    assert!(driver.documents("orders").is_empty());
    assert!(driver.documents("payments").is_empty());
    assert_eq!(driver.open_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn transient_commit_failure_restarts_from_the_first_step() {
    let driver = MemoryDriver::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    let client = StoreClient::builder(driver.clone(), fast_config())
        .name("shop")
        .on_transaction_event(move |event| recorded.lock().unwrap().push(event.clone()))
        .build()
        .unwrap();
    client.connect().await.unwrap();

    driver.fail_next_commit(
        StoreError::driver(112, "write conflict").with_label("TransientTransactionError"),
    );

    let runs = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&runs);
    let steps: Vec<TransactionStep<MemorySession, String>> = vec![
        step(move |session: &mut MemorySession| {
            counted.fetch_add(1, Ordering::SeqCst);
            async move {
                session.put("orders", "o-1", "placed").await?;
                Ok::<_, StoreError>("o-1".to_string())
            }
            .boxed()
        }),
        put("payments", "p-1", "captured"),
    ];

    let outcome = client
        .execute_with_transaction(&steps, client.transaction_options(), &CallScope::new())
        .await;

    assert!(outcome.is_success());
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(driver.documents("orders").len(), 1);
    assert_eq!(driver.open_sessions(), 0);

    let events = events.lock().unwrap();
    assert!(events.iter().any(|event| matches!(event, TransactionEvent::RolledBack { attempt: 1, .. })));
    assert!(events.iter().any(|event| matches!(
        event,
        TransactionEvent::Committed { steps: 2, attempts: 2, .. }
    )));
}

#[tokio::test(start_paused = true)]
async fn dedicated_breaker_keeps_single_operations_flowing() {
    let driver = MemoryDriver::new();
    let config = ResilienceConfig {
        transaction_breaker: TransactionBreakerMode::Dedicated,
        transaction_breaker_threshold: 1,
        ..fast_config()
    };
    let client = client_with(&driver, config);
    client.connect().await.unwrap();

    let steps = vec![failing(StoreError::validation("bad order"))];
    let first = client
        .execute_with_transaction(&steps, client.transaction_options(), &CallScope::new())
        .await;
    assert!(first.is_fatal());

    let second = client
        .execute_with_transaction(&steps, client.transaction_options(), &CallScope::new())
        .await;
    assert!(second.is_circuit_open());

    assert_eq!(client.circuit_breaker_status().state, CircuitState::Closed);
    assert_eq!(client.circuit_breaker_status().failure_count, 0);
}

#[tokio::test(start_paused = true)]
async fn shared_breaker_counts_transaction_failures() {
    let (_driver, client) = connected_client().await;
    let steps = vec![failing(StoreError::validation("bad order"))];

    for _ in 0..3 {
        let outcome = client
            .execute_with_transaction(&steps, client.transaction_options(), &CallScope::new())
            .await;
        assert!(outcome.is_fatal());
    }

    assert_eq!(client.circuit_breaker_status().state, CircuitState::Open);
}
