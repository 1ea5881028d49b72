//! Stress tests for storeguard
//!
//! ## What We Test
//!
//! - **High volume**: hundreds of thousands of breaker decisions
//! - **High concurrency**: thousands of concurrent store operations
//! - **State consistency**: breaker and drain accounting under load

pub mod circuitbreaker;
pub mod client;

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts operations in progress and remembers the highest count seen.
#[derive(Default)]
pub struct ConcurrencyTracker {
    running: AtomicUsize,
    high_water: AtomicUsize,
}

impl ConcurrencyTracker {
    pub fn enter(&self) {
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(running, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}
