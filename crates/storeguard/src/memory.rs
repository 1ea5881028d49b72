//! An in-process document store with fault injection.
//!
//! [`MemoryDriver`] implements every driver trait the resilience layer
//! needs, so clients, tests and demos can run without a server. Faults are
//! injected at runtime:
//!
//! - [`set_reachable`](MemoryDriver::set_reachable) makes connects, pings and
//!   operations fail with a connection error.
//! - [`fail_next`](MemoryDriver::fail_next) queues errors returned by the
//!   next operations, in order.
//! - [`fail_next_commit`](MemoryDriver::fail_next_commit) does the same for
//!   transaction commits.
//! - [`set_error_rate`](MemoryDriver::set_error_rate) fails a random share of
//!   operations, reproducibly when seeded.
//! - [`set_latency`](MemoryDriver::set_latency) delays every call.
//! - [`drop_connection`](MemoryDriver::drop_connection) reports a lost
//!   connection to the connection manager.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use storeguard_connection::{Driver, DriverEventSender, Endpoint};
use storeguard_core::StoreError;
use storeguard_stats::{ServerStats, StatsProvider};
use storeguard_transaction::{TransactionOptions, TransactionalDriver};

type Collections = HashMap<String, BTreeMap<String, String>>;

struct Faults {
    reachable: bool,
    latency: Duration,
    pending: VecDeque<StoreError>,
    pending_commits: VecDeque<StoreError>,
    error_rate: f64,
    rng: StdRng,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            reachable: true,
            latency: Duration::ZERO,
            pending: VecDeque::new(),
            pending_commits: VecDeque::new(),
            error_rate: 0.0,
            rng: StdRng::from_os_rng(),
        }
    }
}

struct Store {
    collections: Mutex<Collections>,
    faults: Mutex<Faults>,
    events: Mutex<Option<DriverEventSender>>,
    pool_size: u64,
    resident_memory_mb: AtomicU64,
    storage_overhead_percent: AtomicU64,
    busy: AtomicUsize,
    open_sessions: AtomicUsize,
    connects: AtomicUsize,
    operations: AtomicUsize,
    next_connection: AtomicU64,
}

impl Store {
    fn collections(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unreachable() -> StoreError {
        StoreError::connection("memory store unreachable")
    }

    /// Applies latency, then reachability.
    async fn gate(&self) -> Result<(), StoreError> {
        let latency = self.faults().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.faults().reachable {
            Ok(())
        } else {
            Err(Self::unreachable())
        }
    }

    /// Gate for data operations: also consumes queued and random faults.
    async fn operation(&self) -> Result<(), StoreError> {
        self.gate().await?;
        self.operations.fetch_add(1, Ordering::Relaxed);

        let mut faults = self.faults();
        if let Some(error) = faults.pending.pop_front() {
            return Err(error);
        }
        if faults.error_rate > 0.0 {
            let rate = faults.error_rate;
            if faults.rng.random_bool(rate) {
                return Err(StoreError::driver(6, "injected host unreachable"));
            }
        }
        Ok(())
    }
}

/// Marks the pool connection busy for the lifetime of an operation.
struct Busy<'a>(&'a Store);

impl<'a> Busy<'a> {
    fn enter(store: &'a Store) -> Self {
        store.busy.fetch_add(1, Ordering::AcqRel);
        Self(store)
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.busy.fetch_sub(1, Ordering::AcqRel);
    }
}

/// In-memory store driver. Clones share the same data and faults.
#[derive(Clone)]
pub struct MemoryDriver {
    store: Arc<Store>,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    /// A reachable, empty store with a pool of 100 connections.
    pub fn new() -> Self {
        Self::with_pool_size(100)
    }

    /// A reachable, empty store reporting a pool of `pool_size` connections.
    pub fn with_pool_size(pool_size: u64) -> Self {
        Self {
            store: Arc::new(Store {
                collections: Mutex::new(HashMap::new()),
                faults: Mutex::new(Faults::default()),
                events: Mutex::new(None),
                pool_size: pool_size.max(1),
                resident_memory_mb: AtomicU64::new(256),
                storage_overhead_percent: AtomicU64::new(150),
                busy: AtomicUsize::new(0),
                open_sessions: AtomicUsize::new(0),
                connects: AtomicUsize::new(0),
                operations: AtomicUsize::new(0),
                next_connection: AtomicU64::new(1),
            }),
        }
    }

    /// Makes the store reachable or not.
    pub fn set_reachable(&self, reachable: bool) {
        self.store.faults().reachable = reachable;
    }

    /// Delays every driver call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.store.faults().latency = latency;
    }

    /// Queues `error` for the next data operation.
    pub fn fail_next(&self, error: StoreError) {
        self.store.faults().pending.push_back(error);
    }

    /// Queues `error` for the next transaction commit.
    pub fn fail_next_commit(&self, error: StoreError) {
        self.store.faults().pending_commits.push_back(error);
    }

    /// Fails `rate` (0.0 to 1.0) of data operations with a transient driver
    /// error. A seed makes the sequence reproducible.
    pub fn set_error_rate(&self, rate: f64, seed: Option<u64>) {
        let mut faults = self.store.faults();
        faults.error_rate = rate.clamp(0.0, 1.0);
        faults.rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
    }

    /// Clears every injected fault.
    pub fn heal(&self) {
        let mut faults = self.store.faults();
        faults.reachable = true;
        faults.latency = Duration::ZERO;
        faults.pending.clear();
        faults.pending_commits.clear();
        faults.error_rate = 0.0;
    }

    /// Reports a lost connection to whoever connected last.
    pub fn drop_connection(&self, reason: impl Into<String>) {
        let sender = self
            .store
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(sender) = sender {
            sender.disconnected(reason);
        }
    }

    /// Sets the resident memory reported in server statistics.
    pub fn set_resident_memory_mb(&self, megabytes: u64) {
        self.store
            .resident_memory_mb
            .store(megabytes, Ordering::Relaxed);
    }

    /// Sets the storage-to-data ratio reported in server statistics.
    pub fn set_storage_overhead(&self, ratio: f64) {
        let percent = (ratio.max(0.0) * 100.0).round() as u64;
        self.store
            .storage_overhead_percent
            .store(percent, Ordering::Relaxed);
    }

    /// Successful connects so far.
    pub fn connect_count(&self) -> usize {
        self.store.connects.load(Ordering::Relaxed)
    }

    /// Data operations that passed the reachability check.
    pub fn operation_count(&self) -> usize {
        self.store.operations.load(Ordering::Relaxed)
    }

    /// Sessions started and not yet ended.
    pub fn open_sessions(&self) -> usize {
        self.store.open_sessions.load(Ordering::Acquire)
    }

    /// Committed documents of `collection`, ordered by id.
    pub fn documents(&self, collection: &str) -> Vec<(String, String)> {
        self.store
            .collections()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, body)| (id.clone(), body.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A connection handle to a [`MemoryDriver`] store.
#[derive(Clone)]
pub struct MemoryConnection {
    id: u64,
    store: Arc<Store>,
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("id", &self.id)
            .finish()
    }
}

impl MemoryConnection {
    /// Identifies the connect call that produced this handle.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Inserts or replaces a document.
    pub async fn put(
        &self,
        collection: &str,
        id: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<(), StoreError> {
        let _busy = Busy::enter(&self.store);
        self.store.operation().await?;
        self.store
            .collections()
            .entry(collection.to_string())
            .or_default()
            .insert(id.into(), body.into());
        Ok(())
    }

    /// Inserts a document, failing with a duplicate-key error if the id is
    /// taken.
    pub async fn insert(
        &self,
        collection: &str,
        id: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<(), StoreError> {
        let _busy = Busy::enter(&self.store);
        self.store.operation().await?;
        let id = id.into();
        let mut collections = self.store.collections();
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(duplicate_key(collection, &id));
        }
        docs.insert(id, body.into());
        Ok(())
    }

    /// Reads a document.
    pub async fn find(&self, collection: &str, id: &str) -> Result<Option<String>, StoreError> {
        let _busy = Busy::enter(&self.store);
        self.store.operation().await?;
        Ok(self
            .store
            .collections()
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    /// Removes a document, returning whether it existed.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let _busy = Busy::enter(&self.store);
        self.store.operation().await?;
        Ok(self
            .store
            .collections()
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let _busy = Busy::enter(&self.store);
        self.store.operation().await?;
        Ok(self
            .store
            .collections()
            .get(collection)
            .map_or(0, BTreeMap::len))
    }
}

fn duplicate_key(collection: &str, id: &str) -> StoreError {
    StoreError::driver(11000, format!("duplicate key {collection}/{id}"))
}

enum Write {
    Put { id: String, body: String },
    Delete { id: String },
}

/// A session on a [`MemoryDriver`] store.
///
/// Writes made inside a transaction are staged and become visible to other
/// connections only when the transaction commits.
pub struct MemorySession {
    connection: MemoryConnection,
    staged: Vec<(String, Write)>,
    in_transaction: bool,
}

impl MemorySession {
    fn staged_view(&self, collection: &str, id: &str) -> Option<Option<String>> {
        self.staged
            .iter()
            .rev()
            .find_map(|(staged_collection, write)| match write {
                Write::Put { id: key, body } if staged_collection == collection && key == id => {
                    Some(Some(body.clone()))
                }
                Write::Delete { id: key } if staged_collection == collection && key == id => {
                    Some(None)
                }
                _ => None,
            })
    }

    fn require_transaction(&self) -> Result<(), StoreError> {
        if self.in_transaction {
            Ok(())
        } else {
            Err(StoreError::validation("no transaction in progress"))
        }
    }

    /// Stages an insert or replacement.
    pub async fn put(
        &mut self,
        collection: &str,
        id: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.require_transaction()?;
        self.connection.store.operation().await?;
        self.staged.push((
            collection.to_string(),
            Write::Put {
                id: id.into(),
                body: body.into(),
            },
        ));
        Ok(())
    }

    /// Stages an insert that fails on an existing id.
    pub async fn insert(
        &mut self,
        collection: &str,
        id: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<(), StoreError> {
        let id = id.into();
        if self.find(collection, &id).await?.is_some() {
            return Err(duplicate_key(collection, &id));
        }
        self.put(collection, id, body).await
    }

    /// Reads a document as this transaction sees it.
    pub async fn find(&mut self, collection: &str, id: &str) -> Result<Option<String>, StoreError> {
        self.require_transaction()?;
        self.connection.store.operation().await?;
        if let Some(staged) = self.staged_view(collection, id) {
            return Ok(staged);
        }
        Ok(self
            .connection
            .store
            .collections()
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    /// Stages a removal.
    pub async fn delete(&mut self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.require_transaction()?;
        self.connection.store.operation().await?;
        self.staged.push((collection.to_string(), Write::Delete { id: id.to_string() }));
        Ok(())
    }
}

impl Driver for MemoryDriver {
    type Connection = MemoryConnection;

    async fn connect(
        &self,
        _endpoint: &Endpoint,
        events: DriverEventSender,
    ) -> Result<MemoryConnection, StoreError> {
        self.store.gate().await?;
        *self
            .store
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(events);
        self.store.connects.fetch_add(1, Ordering::Relaxed);
        Ok(MemoryConnection {
            id: self.store.next_connection.fetch_add(1, Ordering::Relaxed),
            store: Arc::clone(&self.store),
        })
    }

    async fn ping(&self, _connection: &MemoryConnection) -> Result<(), StoreError> {
        self.store.gate().await
    }

    async fn close(&self, _connection: MemoryConnection) -> Result<(), StoreError> {
        Ok(())
    }
}

impl TransactionalDriver for MemoryDriver {
    type Session = MemorySession;

    async fn start_session(
        &self,
        connection: &MemoryConnection,
    ) -> Result<MemorySession, StoreError> {
        self.store.gate().await?;
        self.store.open_sessions.fetch_add(1, Ordering::AcqRel);
        Ok(MemorySession {
            connection: connection.clone(),
            staged: Vec::new(),
            in_transaction: false,
        })
    }

    fn start_transaction(
        &self,
        session: &mut MemorySession,
        _options: &TransactionOptions,
    ) -> Result<(), StoreError> {
        if session.in_transaction {
            return Err(StoreError::validation("transaction already in progress"));
        }
        session.staged.clear();
        session.in_transaction = true;
        Ok(())
    }

    async fn commit_transaction(&self, session: &mut MemorySession) -> Result<(), StoreError> {
        session.require_transaction()?;
        self.store.gate().await?;
        if let Some(error) = self.store.faults().pending_commits.pop_front() {
            return Err(error);
        }

        let mut collections = self.store.collections();
        for (collection, write) in session.staged.drain(..) {
            let docs = collections.entry(collection).or_default();
            match write {
                Write::Put { id, body } => {
                    docs.insert(id, body);
                }
                Write::Delete { id } => {
                    docs.remove(&id);
                }
            }
        }
        session.in_transaction = false;
        Ok(())
    }

    async fn abort_transaction(&self, session: &mut MemorySession) -> Result<(), StoreError> {
        session.staged.clear();
        session.in_transaction = false;
        Ok(())
    }

    async fn end_session(&self, session: MemorySession) {
        drop(session);
        self.store.open_sessions.fetch_sub(1, Ordering::AcqRel);
    }
}

impl StatsProvider for MemoryDriver {
    async fn server_stats(&self, _connection: &MemoryConnection) -> Result<ServerStats, StoreError> {
        self.store.gate().await?;

        let data_size_bytes: u64 = self
            .store
            .collections()
            .values()
            .flat_map(|docs| docs.iter())
            .map(|(id, body)| (id.len() + body.len()) as u64)
            .sum();
        let overhead = self.store.storage_overhead_percent.load(Ordering::Relaxed);
        let active = (self.store.busy.load(Ordering::Acquire)
            + self.store.open_sessions.load(Ordering::Acquire)) as u64;
        let active = active.min(self.store.pool_size);

        Ok(ServerStats {
            active_connections: active,
            available_connections: self.store.pool_size - active,
            resident_memory_mb: self.store.resident_memory_mb.load(Ordering::Relaxed),
            data_size_bytes,
            storage_size_bytes: data_size_bytes * overhead / 100,
        })
    }
}
