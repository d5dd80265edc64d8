use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Externally observable supervisor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Idle,
    Running,
    RestartPending,
    Stopping,
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorState::Idle => write!(f, "idle"),
            SupervisorState::Running => write!(f, "running"),
            SupervisorState::RestartPending => write!(f, "restart-pending"),
            SupervisorState::Stopping => write!(f, "stopping"),
        }
    }
}

/// The child currently tracked by the supervisor
///
/// tokio `Child` handles carry no identity of their own, so each launch gets a
/// generation number; exit events for any other generation are stale and
/// ignored. The exit waiter sets `exited` when the OS reports termination, and
/// the escalation timer re-checks it before force-killing.
#[derive(Debug)]
pub(crate) struct ActiveChild {
    pub pid: u32,
    pub generation: u64,
    pub exited: Arc<AtomicBool>,
}

/// Mutable supervision state
///
/// The three fields form one atomic unit: they are only ever read or written
/// behind the supervisor's single mutex, never individually.
#[derive(Debug, Default)]
pub(crate) struct SupervisionState {
    /// Child currently attached, if any
    pub active: Option<ActiveChild>,
    /// Armed one-shot restart timer, if any
    pub pending_restart: Option<JoinHandle<()>>,
    /// Deliberate shutdown in progress; suppresses auto-restart
    pub stopping: bool,
    /// Monotonic launch counter backing stale-exit detection
    pub generation: u64,
}
