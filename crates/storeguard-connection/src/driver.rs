//! The seam between the resilience layer and a concrete store driver.

use std::fmt;
use std::future::Future;
use storeguard_core::StoreError;
use tokio::sync::mpsc;

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Database name.
    pub database: String,
}

impl Endpoint {
    /// Creates an endpoint.
    pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("localhost", 27017, "app")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Lifecycle notifications a driver pushes to its connection manager.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// The driver (re)established its connection on its own.
    Connected,
    /// The connection was lost or closed by the server.
    Disconnected {
        /// Driver-supplied description.
        reason: String,
    },
    /// The driver observed an error that did not necessarily drop the
    /// connection.
    Error(StoreError),
}

/// Channel handle drivers use to report [`DriverEvent`]s.
///
/// Sending never blocks and never fails from the driver's point of view;
/// events sent after the manager is gone are discarded.
#[derive(Debug, Clone)]
pub struct DriverEventSender {
    tx: mpsc::UnboundedSender<DriverEvent>,
}

impl DriverEventSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<DriverEvent>) -> Self {
        Self { tx }
    }

    /// Reports an event.
    pub fn send(&self, event: DriverEvent) {
        let _ = self.tx.send(event);
    }

    /// Reports that the connection is up.
    pub fn connected(&self) {
        self.send(DriverEvent::Connected);
    }

    /// Reports that the connection dropped.
    pub fn disconnected(&self, reason: impl Into<String>) {
        self.send(DriverEvent::Disconnected {
            reason: reason.into(),
        });
    }

    /// Reports a driver error.
    pub fn error(&self, error: StoreError) {
        self.send(DriverEvent::Error(error));
    }
}

/// A document-store driver.
///
/// Implementations own the wire protocol; the resilience layer only needs to
/// open, probe and close a connection handle. `Connection` is expected to be
/// a cheap, shareable handle (typically an `Arc` around a pooled client).
pub trait Driver: Send + Sync + 'static {
    /// Shared connection handle.
    type Connection: Clone + Send + Sync + 'static;

    /// Opens a connection. The driver keeps `events` to report later
    /// disconnects and errors.
    fn connect(
        &self,
        endpoint: &Endpoint,
        events: DriverEventSender,
    ) -> impl Future<Output = Result<Self::Connection, StoreError>> + Send;

    /// Performs a lightweight round trip.
    fn ping(&self, connection: &Self::Connection)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Closes a connection.
    fn close(&self, connection: Self::Connection)
        -> impl Future<Output = Result<(), StoreError>> + Send;
}
