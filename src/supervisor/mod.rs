//! Supervision state machine for the single proxy child process.

pub mod spawner;
pub mod state;

pub use spawner::{SpawnedChild, ENV_HOST, ENV_PORT};
pub use state::SupervisorState;

use crate::config::SupervisorConfig;
use crate::error::{Result, SupervisorError};
use crate::logging::{LogSink, TracingSink};
use crate::supervisor::spawner::spawn_command;
use crate::supervisor::state::{ActiveChild, SupervisionState};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::sleep;
use tracing::debug;

/// Stable tag prefixed to every line handed to the log sink
pub const LOG_TAG: &str = "proxywarden";

/// Grace period between SIGTERM and SIGKILL when stopping the child
const KILL_ESCALATION: Duration = Duration::from_millis(2000);

/// Supervisor owning the lifecycle of exactly one child process
///
/// `start` and `stop` are non-blocking and idempotent, safe to call in any
/// order any number of times. All outcomes (launch success or failure, output
/// lines, exits, restarts) are reported through the [`LogSink`] passed to
/// `start`; nothing propagates to the caller. Handles are cheap to clone and
/// share one supervision slot.
///
/// Must be used inside a tokio runtime: stream forwarding, exit detection and
/// both timers run as spawned tasks.
#[derive(Clone)]
pub struct ProxySupervisor {
    inner: Arc<Inner>,
}

struct Inner {
    /// Single lock serializing every mutation of the state triple
    state: Mutex<SupervisionState>,
    /// Sink installed by the most recent `start`; `stop` logs through it
    sink: Mutex<Arc<dyn LogSink>>,
}

impl ProxySupervisor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SupervisionState::default()),
                sink: Mutex::new(Arc::new(TracingSink)),
            }),
        }
    }

    /// Start supervising the process described by an untyped config object
    ///
    /// The raw value is normalized first, so any shape is accepted. Returns
    /// immediately; launch outcome arrives through the sink.
    pub fn start(&self, raw: &Value, sink: Arc<dyn LogSink>) {
        self.start_with_config(SupervisorConfig::normalize(raw), sink);
    }

    /// Start supervising with an already-built configuration
    pub fn start_with_config(&self, config: SupervisorConfig, sink: Arc<dyn LogSink>) {
        *self.inner.sink.lock().unwrap() = sink.clone();

        if !config.auto_start {
            sink.info(&tagged("auto-start disabled, not launching proxy"));
            return;
        }

        let pending = {
            let mut st = self.inner.state.lock().unwrap();
            if st.active.is_some() {
                drop(st);
                sink.info(&tagged("proxy already running, ignoring start"));
                return;
            }
            st.stopping = false;
            st.pending_restart.take()
        };
        if let Some(handle) = pending {
            handle.abort();
        }

        Arc::clone(&self.inner).launch(Arc::new(config), sink);
    }

    /// Stop the supervised process and cancel any pending restart
    ///
    /// Sets the stopping intent (suppressing auto-restart for any in-flight
    /// exit), requests graceful termination, and arms the escalation timer
    /// that force-kills the child if it has not exited within the grace
    /// period. Returns immediately without waiting for the child to exit;
    /// calling it again, or while idle, is a no-op beyond flag bookkeeping.
    pub fn stop(&self) {
        let sink = self.inner.current_sink();

        let (active, pending) = {
            let mut st = self.inner.state.lock().unwrap();
            st.stopping = true;
            (st.active.take(), st.pending_restart.take())
        };

        if let Some(handle) = pending {
            handle.abort();
            sink.info(&tagged("cancelled pending restart"));
        }

        let Some(active) = active else {
            debug!("stop called with no active process");
            return;
        };

        sink.info(&tagged(&format!("stopping proxy (pid {})", active.pid)));
        if let Err(e) = send_signal(active.pid, TermSignal::Term) {
            sink.warn(&tagged(&format!(
                "failed to signal pid {}: {}",
                active.pid, e
            )));
        }

        // Best-effort escalation; the exit waiter confirms termination by
        // setting the flag, at which point this fires as a no-op.
        let pid = active.pid;
        let exited = active.exited;
        let escalation_sink = sink.clone();
        tokio::spawn(async move {
            sleep(KILL_ESCALATION).await;
            if !exited.load(Ordering::SeqCst) {
                escalation_sink.warn(&tagged(&format!(
                    "pid {} did not exit within {}ms, force killing",
                    pid,
                    KILL_ESCALATION.as_millis()
                )));
                let _ = send_signal(pid, TermSignal::Kill);
            }
        });
    }

    /// Current state of the supervision slot
    pub fn current_state(&self) -> SupervisorState {
        let st = self.inner.state.lock().unwrap();
        if st.stopping {
            SupervisorState::Stopping
        } else if st.active.is_some() {
            SupervisorState::Running
        } else if st.pending_restart.is_some() {
            SupervisorState::RestartPending
        } else {
            SupervisorState::Idle
        }
    }

    /// Pid of the tracked child, if one is attached
    pub fn active_pid(&self) -> Option<u32> {
        self.inner
            .state
            .lock()
            .unwrap()
            .active
            .as_ref()
            .map(|active| active.pid)
    }
}

impl Default for ProxySupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn current_sink(&self) -> Arc<dyn LogSink> {
        self.sink.lock().unwrap().clone()
    }

    /// Launch the configured command and wire up stream, exit and restart
    /// handling
    ///
    /// Failures are terminal at the sink: an empty command or a spawn error
    /// is logged and leaves the supervisor idle, scheduling nothing.
    fn launch(self: Arc<Self>, config: Arc<SupervisorConfig>, sink: Arc<dyn LogSink>) {
        let program = config
            .command
            .first()
            .map(|token| token.trim())
            .unwrap_or("");
        if program.is_empty() {
            sink.error(&tagged("cannot start proxy: resolved command is empty"));
            return;
        }

        // Spawning is synchronous, so holding the lock across it makes the
        // occupancy check and the registration one atomic step.
        let mut st = self.state.lock().unwrap();
        if st.stopping {
            debug!("launch aborted, stop in progress");
            return;
        }
        if st.active.is_some() {
            debug!("launch aborted, a child is already attached");
            return;
        }

        let spawned = match spawn_command(&config) {
            Ok(spawned) => spawned,
            Err(e) => {
                drop(st);
                sink.error(&tagged(&format!("failed to launch proxy: {}", e)));
                return;
            }
        };

        let mut child = spawned.child;
        let pid = spawned.pid;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let exited = Arc::new(AtomicBool::new(false));
        st.generation += 1;
        let generation = st.generation;
        st.active = Some(ActiveChild {
            pid,
            generation,
            exited: exited.clone(),
        });
        drop(st);

        sink.info(&tagged(&format!(
            "started `{}` (pid {}) for {}:{}",
            config.command.join(" "),
            pid,
            config.host,
            config.port
        )));

        if let Some(stream) = stdout {
            let out_sink = sink.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stream).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let line = line.trim();
                    if !line.is_empty() {
                        out_sink.info(&tagged(line));
                    }
                }
            });
        }

        if let Some(stream) = stderr {
            let err_sink = sink.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stream).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let line = line.trim();
                    if !line.is_empty() {
                        err_sink.warn(&tagged(line));
                    }
                }
            });
        }

        let inner = Arc::clone(&self);
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    exited.store(true, Ordering::SeqCst);
                    inner.handle_exit(&config, &sink, generation, status.code(), exit_signal(&status));
                }
                Err(e) => {
                    exited.store(true, Ordering::SeqCst);
                    sink.error(&tagged(&format!("error waiting on pid {}: {}", pid, e)));
                    inner.handle_exit(&config, &sink, generation, None, None);
                }
            }
        });
    }

    /// React to the tracked child terminating
    ///
    /// Exit events for a generation other than the tracked one are stale and
    /// ignored. The stopping intent is checked before the restart decision,
    /// so `stop` always wins a race against an exit-triggered restart.
    fn handle_exit(
        self: Arc<Self>,
        config: &Arc<SupervisorConfig>,
        sink: &Arc<dyn LogSink>,
        generation: u64,
        code: Option<i32>,
        signal: Option<i32>,
    ) {
        let mut st = self.state.lock().unwrap();

        match st.active.take() {
            Some(active) if active.generation == generation => {}
            Some(active) => {
                // Exit of a process we no longer track
                debug!(generation, "ignoring stale exit event");
                st.active = Some(active);
                return;
            }
            None => {
                // A stop already detached the child; fall through so the
                // stopping intent can claim this exit. Anything else here is
                // a duplicate event.
                if !st.stopping {
                    debug!(generation, "ignoring exit with no tracked process");
                    return;
                }
            }
        }

        if st.stopping {
            drop(st);
            sink.info(&tagged("proxy stopped"));
            return;
        }

        let stray = st.pending_restart.take();

        if !config.auto_restart {
            drop(st);
            if let Some(handle) = stray {
                handle.abort();
            }
            sink.warn(&tagged(&format!(
                "proxy exited (code {}, signal {}), auto-restart disabled",
                fmt_exit(code),
                fmt_exit(signal)
            )));
            return;
        }

        let delay = Duration::from_millis(config.restart_delay_ms);
        let inner = Arc::clone(&self);
        let timer_config = Arc::clone(config);
        let timer_sink = Arc::clone(sink);
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            {
                let mut st = inner.state.lock().unwrap();
                st.pending_restart = None;
                if st.stopping {
                    return;
                }
            }
            inner.launch(timer_config, timer_sink);
        });
        st.pending_restart = Some(handle);
        drop(st);

        if let Some(handle) = stray {
            handle.abort();
        }
        sink.warn(&tagged(&format!(
            "proxy exited (code {}, signal {})",
            fmt_exit(code),
            fmt_exit(signal)
        )));
        sink.info(&tagged(&format!(
            "restarting proxy in {}ms",
            config.restart_delay_ms
        )));
    }
}

/// Prefix a message with the component tag
fn tagged(message: &str) -> String {
    format!("[{}] {}", LOG_TAG, message)
}

/// Render an exit code or signal, substituting "null" when absent
fn fmt_exit(value: Option<i32>) -> String {
    value
        .map(|n| n.to_string())
        .unwrap_or_else(|| "null".to_string())
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[derive(Debug, Clone, Copy)]
enum TermSignal {
    Term,
    Kill,
}

#[cfg(unix)]
fn send_signal(pid: u32, term: TermSignal) -> Result<()> {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let signal = match term {
        TermSignal::Term => Signal::SIGTERM,
        TermSignal::Kill => Signal::SIGKILL,
    };

    signal::kill(Pid::from_raw(pid as i32), signal)
        .map_err(|e| SupervisorError::SignalError(format!("{}: {}", signal, e)))
}

#[cfg(not(unix))]
fn send_signal(_pid: u32, _term: TermSignal) -> Result<()> {
    Err(SupervisorError::SignalError(
        "process signalling is not supported on this platform".to_string(),
    ))
}
