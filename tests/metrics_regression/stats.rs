//! Stats collector metrics regression tests

use super::helpers::*;
use serial_test::serial;
use storeguard::memory::MemoryDriver;
use storeguard::{OperationOptions, ResilienceConfig, StoreClient};

#[tokio::test(start_paused = true)]
#[serial]
async fn stats_metrics_exist() {
    init_recorder();

    let driver = MemoryDriver::with_pool_size(10);
    let client = StoreClient::builder(driver.clone(), ResilienceConfig::default())
        .name("metrics")
        .build()
        .unwrap();
    client.connect().await.unwrap();
    client
        .execute_with_retry(
            |connection| async move { connection.put("orders", "o-1", "placed").await },
            &OperationOptions::new(),
        )
        .await
        .into_result()
        .unwrap();
    driver.set_resident_memory_mb(4096);

    let stats = client.collect_stats().await.unwrap();
    assert!(!stats.alerts.is_empty());

    assert_gauge_exists("store_pool_connections");
    assert_metric_has_label("store_pool_connections", "collector", "metrics-stats");
    assert_metric_has_label("store_pool_connections", "state", "active");
    assert_metric_has_label("store_pool_connections", "state", "available");

    assert_gauge_exists("store_pool_utilization_percent");
    assert_gauge_exists("store_resident_memory_megabytes");
    assert_gauge_exists("store_storage_ratio");

    assert_counter_exists("store_stats_alerts_total");
    assert_metric_has_label("store_stats_alerts_total", "alert", "memory_usage_high");
}
