//! File-backed configuration for a [`StoreClient`](crate::StoreClient).
//!
//! Every duration is a number of milliseconds. Missing keys take their
//! defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use storeguard_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder};
use storeguard_connection::{ConnectionConfigBuilder, Endpoint, ExhaustionMode};
use storeguard_healthcheck::HealthMonitorConfigBuilder;
use storeguard_retry::RetryPolicy;
use storeguard_stats::{AlertThresholds, StatsCollectorConfigBuilder};
use storeguard_transaction::{TransactionBreaker, TransactionOptions};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has wrongly typed keys.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values are inconsistent.
    #[error("invalid configuration: {}", .0.join(", "))]
    Validation(Vec<String>),
}

/// Deployment environment. Decides what happens when the store stays
/// unreachable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Keep running degraded and reconnect in the background.
    #[default]
    Production,
    /// Fail fast so the developer notices.
    Development,
}

impl Environment {
    /// The matching connection exhaustion behaviour.
    pub fn exhaustion_mode(&self) -> ExhaustionMode {
        match self {
            Environment::Production => ExhaustionMode::Degrade,
            Environment::Development => ExhaustionMode::FailFast,
        }
    }
}

/// Whether transactions share the single-operation circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionBreakerMode {
    /// One breaker for everything.
    #[default]
    Shared,
    /// A separate breaker for transactions.
    Dedicated,
}

/// Store location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Database name.
    pub database: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        let endpoint = Endpoint::default();
        Self {
            host: endpoint.host,
            port: endpoint.port,
            database: endpoint.database,
        }
    }
}

/// Thresholds for statistics alerts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Pool utilization in percent.
    pub pool_utilization_percent: f64,
    /// Resident memory in megabytes.
    pub memory_threshold_mb: u64,
    /// Storage-to-data ratio.
    pub storage_ratio: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        let thresholds = AlertThresholds::default();
        Self {
            pool_utilization_percent: thresholds.pool_utilization_percent,
            memory_threshold_mb: thresholds.memory_mb,
            storage_ratio: thresholds.storage_ratio,
        }
    }
}

/// Tunables for every resilience component.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Connection attempts per connect cycle.
    pub max_retries: u32,
    /// First backoff delay, for connecting and for operations.
    pub retry_base_delay: u64,
    /// Backoff cap; also the degraded-mode recovery interval.
    pub retry_max_delay: u64,
    /// Upper bound of the jitter added to operation backoff.
    pub retry_jitter_max: u64,
    /// Attempts per operation, including the first.
    pub operation_max_attempts: u32,
    /// Terminal failures that open the breaker.
    pub circuit_breaker_threshold: u32,
    /// Time the breaker stays open.
    pub circuit_breaker_cooldown: u64,
    /// Time between health probes.
    pub health_check_interval: u64,
    /// Upper bound on one health probe.
    pub health_check_timeout: u64,
    /// Probe latency logged as slow.
    pub slow_probe_threshold: u64,
    /// Upper bound on one connection attempt.
    pub connect_timeout: u64,
    /// Pause before reconnecting a lost connection.
    pub reconnect_delay: u64,
    /// Upper bound on one operation attempt.
    pub per_operation_timeout: u64,
    /// Upper bound on a transaction commit.
    pub transaction_max_commit_time: u64,
    /// Longest graceful shutdown waits for in-flight operations.
    pub shutdown_drain_timeout: u64,
    /// Deployment environment.
    pub environment: Environment,
    /// Breaker used by transactions.
    pub transaction_breaker: TransactionBreakerMode,
    /// Threshold of the dedicated transaction breaker.
    pub transaction_breaker_threshold: u32,
    /// Cooldown of the dedicated transaction breaker.
    pub transaction_breaker_cooldown: u64,
    /// Statistics alert thresholds.
    pub alerts: AlertConfig,
    /// Store location.
    pub endpoint: EndpointConfig,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_base_delay: 1_000,
            retry_max_delay: 30_000,
            retry_jitter_max: 250,
            operation_max_attempts: 3,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown: 60_000,
            health_check_interval: 30_000,
            health_check_timeout: 5_000,
            slow_probe_threshold: 1_000,
            connect_timeout: 10_000,
            reconnect_delay: 5_000,
            per_operation_timeout: 10_000,
            transaction_max_commit_time: 30_000,
            shutdown_drain_timeout: 10_000,
            environment: Environment::Production,
            transaction_breaker: TransactionBreakerMode::Shared,
            transaction_breaker_threshold: 5,
            transaction_breaker_cooldown: 60_000,
            alerts: AlertConfig::default(),
            endpoint: EndpointConfig::default(),
        }
    }
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

impl ResilienceConfig {
    /// Parses and validates TOML.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks that the values are usable together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.max_retries == 0 {
            errors.push("max_retries must be at least 1".to_string());
        }
        if self.operation_max_attempts == 0 {
            errors.push("operation_max_attempts must be at least 1".to_string());
        }
        if self.circuit_breaker_threshold == 0 {
            errors.push("circuit_breaker_threshold must be at least 1".to_string());
        }
        if self.transaction_breaker == TransactionBreakerMode::Dedicated
            && self.transaction_breaker_threshold == 0
        {
            errors.push("transaction_breaker_threshold must be at least 1".to_string());
        }
        if self.retry_base_delay > self.retry_max_delay {
            errors.push(format!(
                "retry_base_delay ({}) exceeds retry_max_delay ({})",
                self.retry_base_delay, self.retry_max_delay
            ));
        }
        for (key, value) in [
            ("health_check_interval", self.health_check_interval),
            ("health_check_timeout", self.health_check_timeout),
            ("connect_timeout", self.connect_timeout),
            ("per_operation_timeout", self.per_operation_timeout),
            ("transaction_max_commit_time", self.transaction_max_commit_time),
        ] {
            if value == 0 {
                errors.push(format!("{key} must be greater than 0"));
            }
        }
        if self.endpoint.host.trim().is_empty() {
            errors.push("endpoint.host must not be empty".to_string());
        }
        if self.endpoint.port == 0 {
            errors.push("endpoint.port must not be 0".to_string());
        }
        if !(self.alerts.pool_utilization_percent > 0.0
            && self.alerts.pool_utilization_percent <= 100.0)
        {
            errors.push("alerts.pool_utilization_percent must be in (0, 100]".to_string());
        }
        if self.alerts.storage_ratio <= 0.0 {
            errors.push("alerts.storage_ratio must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(
            self.endpoint.host.clone(),
            self.endpoint.port,
            self.endpoint.database.clone(),
        )
    }

    /// Default retry policy for single operations.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.operation_max_attempts)
            .with_base_delay(ms(self.retry_base_delay))
            .with_max_delay(ms(self.retry_max_delay))
            .with_jitter_max(ms(self.retry_jitter_max))
            .with_per_attempt_timeout(ms(self.per_operation_timeout))
    }

    /// Default options for transactions.
    pub fn transaction_options(&self) -> TransactionOptions {
        let max_commit_time = ms(self.transaction_max_commit_time);
        TransactionOptions::default()
            .with_max_commit_time(max_commit_time)
            .with_retry(
                self.retry_policy()
                    .with_per_attempt_timeout(ms(self.per_operation_timeout) + max_commit_time),
            )
    }

    /// Builder for the shared circuit breaker.
    pub fn circuit_breaker(&self) -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfig::builder()
            .failure_threshold(self.circuit_breaker_threshold)
            .cooldown(ms(self.circuit_breaker_cooldown))
    }

    /// Breaker policy for transactions.
    pub fn transaction_breaker(&self, name: &str) -> TransactionBreaker {
        match self.transaction_breaker {
            TransactionBreakerMode::Shared => TransactionBreaker::Shared,
            TransactionBreakerMode::Dedicated => TransactionBreaker::Dedicated(CircuitBreaker::new(
                CircuitBreakerConfig::builder()
                    .name(format!("{name}-transactions"))
                    .failure_threshold(self.transaction_breaker_threshold)
                    .cooldown(ms(self.transaction_breaker_cooldown))
                    .build_config(),
            )),
        }
    }

    /// Builder for the connection manager.
    pub fn connection(&self) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new()
            .endpoint(self.endpoint())
            .max_retries(self.max_retries)
            .base_delay(ms(self.retry_base_delay))
            .max_delay(ms(self.retry_max_delay))
            .connect_timeout(ms(self.connect_timeout))
            .reconnect_delay(ms(self.reconnect_delay))
            .drain_timeout(ms(self.shutdown_drain_timeout))
            .exhaustion_mode(self.environment.exhaustion_mode())
    }

    /// Builder for the health monitor.
    pub fn health_monitor(&self) -> HealthMonitorConfigBuilder {
        HealthMonitorConfigBuilder::new()
            .interval(ms(self.health_check_interval))
            .probe_timeout(ms(self.health_check_timeout))
            .slow_threshold(ms(self.slow_probe_threshold))
    }

    /// Builder for the stats collector.
    pub fn stats(&self) -> StatsCollectorConfigBuilder {
        StatsCollectorConfigBuilder::new().thresholds(AlertThresholds {
            pool_utilization_percent: self.alerts.pool_utilization_percent,
            memory_mb: self.alerts.memory_threshold_mb,
            storage_ratio: self.alerts.storage_ratio,
        })
    }
}
