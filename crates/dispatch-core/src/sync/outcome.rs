use std::fmt;

/// Result of one drain attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain holds the lease; nothing was touched
    Skipped,
    /// Nothing was pending
    Idle,
    /// Every pending item was delivered and cleared
    Completed { delivered: usize },
    /// The batch stopped early; nothing was cleared
    Failed {
        delivered: usize,
        failure: DrainFailure,
    },
}

impl DrainOutcome {
    /// `true` when the store holds no undelivered work from this batch
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Idle | Self::Completed { .. })
    }

    pub const fn delivered(&self) -> usize {
        match self {
            Self::Skipped | Self::Idle => 0,
            Self::Completed { delivered } | Self::Failed { delivered, .. } => *delivered,
        }
    }
}

impl fmt::Display for DrainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped: another drain is in progress"),
            Self::Idle => write!(f, "nothing to deliver"),
            Self::Completed { delivered } => write!(f, "delivered {delivered} report(s)"),
            Self::Failed { delivered, failure } => {
                write!(f, "failed after {delivered} delivered report(s): {failure}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainFailure {
    Lease(String),
    Read(String),
    Delivery { sequence: i64, message: String },
    Clear(String),
    /// The lease expired and another drain took it over
    LeaseLost,
    /// The drain ran past its time budget and was cancelled
    TimedOut,
}

impl fmt::Display for DrainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lease(message) => write!(f, "lease unavailable: {message}"),
            Self::Read(message) => write!(f, "could not read pending reports: {message}"),
            Self::Delivery { sequence, message } => {
                write!(f, "delivery of #{sequence} failed: {message}")
            }
            Self::Clear(message) => write!(f, "could not clear delivered reports: {message}"),
            Self::LeaseLost => write!(f, "lease lost to another drain"),
            Self::TimedOut => write!(f, "time budget exhausted"),
        }
    }
}
