//! Core infrastructure for storeguard.
//!
//! This crate provides what every storeguard component shares:
//! - Event system for observability
//! - The [`StoreError`] taxonomy
//! - [`OperationOutcome`], the tagged result of a guarded call
//! - [`CallScope`], caller cancellation and deadlines

pub mod error;
pub mod events;
pub mod outcome;
pub mod scope;

pub use error::StoreError;
pub use events::{EventListener, EventListeners, FnListener, StoreEvent};
pub use outcome::OperationOutcome;
pub use scope::CallScope;
