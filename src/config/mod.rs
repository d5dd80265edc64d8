use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default loopback address the proxy binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port the proxy listens on
pub const DEFAULT_PORT: u16 = 3456;

/// Default command launched when none (or an empty one) is configured
pub const DEFAULT_COMMAND: [&str; 2] = ["copilot-api", "start"];

/// Default delay before an automatic relaunch (in milliseconds)
pub const DEFAULT_RESTART_DELAY_MS: u64 = 3000;

/// Lower bound for the restart delay; smaller configured values are clamped up
pub const MIN_RESTART_DELAY_MS: u64 = 1000;

/// Configuration for a supervised proxy process
///
/// Immutable per run: built once by [`SupervisorConfig::normalize`] and reused
/// unchanged for every restart until the next `start` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Command to launch: executable followed by its arguments
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Host the proxy binds to (passed to the child via environment)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the proxy listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether `start` actually launches the process
    #[serde(default = "default_enabled", alias = "autoStart")]
    pub auto_start: bool,

    /// Whether an unexpected exit schedules a relaunch
    #[serde(default = "default_enabled", alias = "autoRestart")]
    pub auto_restart: bool,

    /// Delay before an automatic relaunch (in milliseconds)
    #[serde(default = "default_restart_delay", alias = "restartDelayMs")]
    pub restart_delay_ms: u64,
}

// Default value functions for serde
fn default_command() -> Vec<String> {
    DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_enabled() -> bool {
    true
}

fn default_restart_delay() -> u64 {
    DEFAULT_RESTART_DELAY_MS
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            host: default_host(),
            port: DEFAULT_PORT,
            auto_start: true,
            auto_restart: true,
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
        }
    }
}

impl SupervisorConfig {
    /// Build a fully-populated configuration from an arbitrary JSON value
    ///
    /// Pure and total: every malformed or missing field falls back to its
    /// default, so this never fails regardless of input shape. Keys are
    /// accepted in both snake_case and camelCase (the raw object typically
    /// arrives from the plugin host unvalidated).
    ///
    /// # Arguments
    /// * `raw` - Untyped configuration object (any JSON value is accepted)
    pub fn normalize(raw: &Value) -> Self {
        let host = field(raw, &["host"])
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|h| is_valid_host(h))
            .unwrap_or(DEFAULT_HOST)
            .to_string();

        let port = field(raw, &["port"])
            .and_then(coerce_integer)
            .filter(|&p| is_valid_port(p))
            .map(|p| p as u16)
            .unwrap_or(DEFAULT_PORT);

        let command = field(raw, &["command"])
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|token| !token.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|tokens| !tokens.is_empty())
            .unwrap_or_else(default_command);

        let restart_delay_ms = field(raw, &["restart_delay_ms", "restartDelayMs"])
            .and_then(coerce_integer)
            .map(|n| (n.max(0) as u64).max(MIN_RESTART_DELAY_MS))
            .unwrap_or(DEFAULT_RESTART_DELAY_MS);

        // Default-on, opt-out: only the literal `false` disables these.
        let auto_start = opt_out_flag(field(raw, &["auto_start", "autoStart"]));
        let auto_restart = opt_out_flag(field(raw, &["auto_restart", "autoRestart"]));

        Self {
            command,
            host,
            port,
            auto_start,
            auto_restart,
            restart_delay_ms,
        }
    }

    /// Base URL the host application registers its provider under
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Look a field up under any of the accepted key spellings
fn field<'a>(raw: &'a Value, names: &[&str]) -> Option<&'a Value> {
    let map = raw.as_object()?;
    names.iter().find_map(|name| map.get(*name))
}

/// Coerce a JSON value to an integer, accepting numeric strings and
/// fraction-free floats
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn opt_out_flag(value: Option<&Value>) -> bool {
    !matches!(value, Some(Value::Bool(false)))
}

/// Whether `port` is a valid TCP port for the proxy
pub fn is_valid_port(port: i64) -> bool {
    (1..=65535).contains(&port)
}

/// Whether `host` is usable as a bind address (non-blank after trimming)
///
/// Shared with the host application's credential-collection prompts, which
/// validate their answers the same way the normalizer does.
pub fn is_valid_host(host: &str) -> bool {
    !host.trim().is_empty()
}
