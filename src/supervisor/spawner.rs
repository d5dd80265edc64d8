use crate::config::SupervisorConfig;
use crate::error::{Result, SupervisorError};
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Environment variable carrying the configured host to the child
pub const ENV_HOST: &str = "PROXY_HOST";

/// Environment variable carrying the configured port to the child
pub const ENV_PORT: &str = "PROXY_PORT";

/// Handle returned when spawning the proxy process
#[derive(Debug)]
pub struct SpawnedChild {
    /// The child process handle
    pub child: Child,

    /// Process ID assigned by the OS
    pub pid: u32,
}

/// Spawn the proxy process described by the configuration
///
/// The first command token is the executable, the rest are arguments. The
/// child inherits the ambient environment extended with [`ENV_HOST`] and
/// [`ENV_PORT`]; stdin is suppressed and stdout/stderr are captured as pipes
/// so the supervisor can forward them to the log sink.
///
/// # Returns
/// * `Ok(SpawnedChild)` - Successfully spawned process with its pid
/// * `Err(SupervisorError)` - Empty command or OS-level spawn failure
pub fn spawn_command(config: &SupervisorConfig) -> Result<SpawnedChild> {
    let program = config
        .command
        .first()
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .ok_or(SupervisorError::EmptyCommand)?;

    let mut command = Command::new(program);
    command.args(&config.command[1..]);
    command.env(ENV_HOST, &config.host);
    command.env(ENV_PORT, config.port.to_string());
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let child = command.spawn().map_err(|e| {
        SupervisorError::SpawnError(format!("failed to spawn `{}`: {}", program, e))
    })?;

    let pid = child
        .id()
        .ok_or_else(|| SupervisorError::SpawnError(format!("no pid for `{}`", program)))?;

    Ok(SpawnedChild { child, pid })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(command: &[&str]) -> SupervisorConfig {
        SupervisorConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            ..SupervisorConfig::default()
        }
    }

    #[tokio::test]
    async fn test_spawn_simple_process() {
        let result = spawn_command(&config_for(&["/bin/echo", "hello"]));
        assert!(result.is_ok());

        let mut spawned = result.unwrap();
        assert!(spawned.pid > 0);
        let _ = spawned.child.wait().await;
    }

    #[tokio::test]
    async fn test_spawn_captures_stdout_stderr() {
        let mut spawned = spawn_command(&config_for(&["/bin/echo"])).unwrap();

        assert!(spawned.child.stdout.is_some());
        assert!(spawned.child.stderr.is_some());
        let _ = spawned.child.wait().await;
    }

    #[tokio::test]
    async fn test_spawn_empty_command() {
        let result = spawn_command(&config_for(&[]));
        assert!(matches!(result, Err(SupervisorError::EmptyCommand)));

        let result = spawn_command(&config_for(&["   "]));
        assert!(matches!(result, Err(SupervisorError::EmptyCommand)));
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let result = spawn_command(&config_for(&["/nonexistent/proxy-binary"]));
        match result {
            Err(SupervisorError::SpawnError(msg)) => {
                assert!(msg.contains("/nonexistent/proxy-binary"));
            }
            other => panic!("expected SpawnError, got {:?}", other.map(|s| s.pid)),
        }
    }

    #[tokio::test]
    async fn test_spawn_injects_host_and_port() {
        let mut config = config_for(&["/bin/sh", "-c", "echo $PROXY_HOST:$PROXY_PORT"]);
        config.host = "127.0.0.1".to_string();
        config.port = 4099;

        let spawned = spawn_command(&config).unwrap();
        let output = spawned
            .child
            .wait_with_output()
            .await
            .expect("child output");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.trim(), "127.0.0.1:4099");
    }
}
