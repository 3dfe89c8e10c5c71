//! # Configuration
//!
//! [`Config`] carries presentation flags collected by the command line.
//! [`ResolveOptions`] describes one resolution attempt and is frozen once the
//! attempt starts.

use std::time::Duration;

/// Longest label a DNS name may carry.
pub const MAX_LABEL_LEN: usize = 63;

const DEFAULT_SCAN_TIME: Duration = Duration::from_secs(2);
const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

pub struct Config {
    /// Reduces the amount of console output, `0` prints everything.
    pub quiet: u8,
    /// Raises the log level, `0` only shows warnings.
    pub verbose: u8,
}

/// Which record types a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryKind {
    /// Strict PTR questions.
    #[default]
    Ptr,
    /// Wildcard questions (QTYPE `*`).
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Service types to query, e.g. `_ipp._tcp.local.`.
    pub protocols: Vec<String>,
    pub query_kind: QueryKind,
    /// How long each send listens for replies.
    pub scan_time: Duration,
    /// Additional sends inside the scan window while nobody has answered.
    pub retries: u32,
    pub retry_delay: Duration,
    /// Restricts the resolution to the adapter with this name.
    pub adapter: Option<String>,
    /// Skips the process-wide single-flight lock.
    pub allow_overlapped_queries: bool,
}

impl ResolveOptions {
    pub fn new<I, S>(protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protocols: protocols.into_iter().map(Into::into).collect(),
            query_kind: QueryKind::default(),
            scan_time: DEFAULT_SCAN_TIME,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            adapter: None,
            allow_overlapped_queries: false,
        }
    }

    pub fn with_query_kind(mut self, query_kind: QueryKind) -> Self {
        self.query_kind = query_kind;
        self
    }

    pub fn with_scan_time(mut self, scan_time: Duration) -> Self {
        self.scan_time = scan_time;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    pub fn with_overlap(mut self, allow: bool) -> Self {
        self.allow_overlapped_queries = allow;
        self
    }

    /// Checks the options before any network work is attempted.
    pub fn validate(&self) -> Result<(), String> {
        if self.protocols.is_empty() {
            return Err("at least one protocol is required".to_string());
        }

        for protocol in &self.protocols {
            let trimmed: &str = protocol.trim_end_matches('.');
            if trimmed.trim().is_empty() {
                return Err(format!("invalid protocol name: {protocol:?}"));
            }
            if let Some(label) = trimmed.split('.').find(|label| label.len() >= MAX_LABEL_LEN) {
                return Err(format!("label '{label}' must be shorter than {MAX_LABEL_LEN} bytes"));
            }
            if trimmed.split('.').any(str::is_empty) {
                return Err(format!("empty label in {protocol:?}"));
            }
        }

        if self.scan_time.is_zero() {
            return Err("scan time must be greater than zero".to_string());
        }

        Ok(())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
