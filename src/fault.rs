use thiserror::Error;

/// Failure of a single network round trip, classified so callers can pick
/// retry, rebuild or restart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// Connection refused/reset, DNS failure, non-200 status, no session.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out: {0}")]
    Timeout(String),
    /// Body arrived but is not the JSON we expect.
    #[error("bad response: {0}")]
    Format(String),
    /// Allocation failed while handling the response.
    #[error("out of memory: {0}")]
    OutOfMemory(String),
}

impl Fault {
    /// Out-of-memory leaves the heap in an unknown state; nothing short of a
    /// device restart is safe.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Fault::OutOfMemory(_))
    }

    /// The message without the kind prefix.
    pub fn detail(&self) -> &str {
        match self {
            Fault::Transport(m) | Fault::Timeout(m) | Fault::Format(m) | Fault::OutOfMemory(m) => m,
        }
    }

    /// Short label for on-screen error rows.
    pub fn label(&self) -> &'static str {
        match self {
            Fault::Transport(_) => "net",
            Fault::Timeout(_) => "timeout",
            Fault::Format(_) => "data",
            Fault::OutOfMemory(_) => "oom",
        }
    }
}

impl From<serde_json::Error> for Fault {
    fn from(e: serde_json::Error) -> Self {
        Fault::Format(e.to_string())
    }
}

/// Why the firmware is about to restart the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartReason {
    OutOfMemory(String),
    RebuildLimit { rebuilds: u32 },
}

impl core::fmt::Display for RestartReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RestartReason::OutOfMemory(msg) => write!(f, "out of memory ({})", msg),
            RestartReason::RebuildLimit { rebuilds } => {
                write!(f, "{} consecutive network rebuilds", rebuilds)
            }
        }
    }
}
