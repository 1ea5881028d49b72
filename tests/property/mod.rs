//! Property-based tests for storeguard.
//!
//! Run with: cargo test --test property_tests

pub mod backoff;
pub mod circuit_breaker;
pub mod retry;

/// A current-thread runtime with a paused clock.
pub(crate) fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}
