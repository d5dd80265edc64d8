use proxywarden::{ProxySupervisor, SupervisorConfig, TracingSink};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Graceful Shutdown Demo ===\n");

    let supervisor = ProxySupervisor::new();

    // A stubborn child that ignores SIGTERM, forcing the supervisor through
    // its escalation window before the SIGKILL lands.
    let config = SupervisorConfig {
        command: vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            "trap '' TERM; echo stubborn proxy running; sleep 60".to_string(),
        ],
        auto_restart: false,
        ..SupervisorConfig::default()
    };
    supervisor.start_with_config(config, Arc::new(TracingSink));

    tokio::time::sleep(Duration::from_secs(1)).await;
    println!(
        "Child pid: {:?}, state: {}",
        supervisor.active_pid(),
        supervisor.current_state()
    );

    println!("Requesting stop (SIGTERM, then SIGKILL after 2s)...");
    supervisor.stop();

    tokio::time::sleep(Duration::from_secs(3)).await;
    println!("Final state: {}", supervisor.current_state());

    println!("\nDemo complete!");
    Ok(())
}
