use std::fmt;
use std::time::Duration;
use storeguard_retry::RetryPolicy;

/// Isolation a transaction reads at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReadConcern {
    /// Most recent data on the node, possibly rolled back later.
    Local,
    /// Data acknowledged by a majority of nodes.
    Majority,
    /// A consistent point-in-time view across the transaction.
    #[default]
    Snapshot,
}

impl ReadConcern {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadConcern::Local => "local",
            ReadConcern::Majority => "majority",
            ReadConcern::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for ReadConcern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgement a commit waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriteConcern {
    /// Acknowledged by this many nodes.
    Nodes(u32),
    /// Acknowledged by a majority of nodes.
    #[default]
    Majority,
}

impl fmt::Display for WriteConcern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteConcern::Nodes(n) => write!(f, "w:{n}"),
            WriteConcern::Majority => f.write_str("w:majority"),
        }
    }
}

/// Per-call transaction settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Read isolation.
    pub read_concern: ReadConcern,
    /// Commit acknowledgement.
    pub write_concern: WriteConcern,
    /// Upper bound on the commit itself.
    pub max_commit_time: Duration,
    /// Retry policy for whole-transaction attempts. Its per-attempt timeout
    /// covers every step plus the commit.
    pub retry: RetryPolicy,
}

impl TransactionOptions {
    /// Options with snapshot reads, majority writes, a 30 second commit
    /// bound and three attempts of at most 60 seconds each.
    pub fn new() -> Self {
        Self {
            read_concern: ReadConcern::Snapshot,
            write_concern: WriteConcern::Majority,
            max_commit_time: Duration::from_secs(30),
            retry: RetryPolicy::default().with_per_attempt_timeout(Duration::from_secs(60)),
        }
    }

    /// Sets the read concern.
    pub fn with_read_concern(mut self, concern: ReadConcern) -> Self {
        self.read_concern = concern;
        self
    }

    /// Sets the write concern.
    pub fn with_write_concern(mut self, concern: WriteConcern) -> Self {
        self.write_concern = concern;
        self
    }

    /// Sets the commit time bound.
    pub fn with_max_commit_time(mut self, max: Duration) -> Self {
        self.max_commit_time = max;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self::new()
    }
}
