use std::future::Future;
use storeguard_connection::Driver;
use storeguard_core::StoreError;

/// Raw figures reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerStats {
    /// Pool connections currently checked out.
    pub active_connections: u64,
    /// Pool connections idle and ready.
    pub available_connections: u64,
    /// Resident memory of the server process, in megabytes.
    pub resident_memory_mb: u64,
    /// Logical size of stored documents, in bytes.
    pub data_size_bytes: u64,
    /// Size allocated on disk, in bytes.
    pub storage_size_bytes: u64,
}

/// A driver that can report server statistics.
pub trait StatsProvider: Driver {
    /// Reads the current figures over `connection`.
    fn server_stats(
        &self,
        connection: &Self::Connection,
    ) -> impl Future<Output = Result<ServerStats, StoreError>> + Send;
}
