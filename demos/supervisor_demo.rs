use proxywarden::{MemorySink, ProxySupervisor};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("=== Proxy Supervisor Demo ===\n");

    let supervisor = ProxySupervisor::new();
    let sink = Arc::new(MemorySink::new());

    // A stand-in proxy that crashes after a second; the supervisor keeps
    // relaunching it with the configured delay.
    supervisor.start(
        &json!({
            "command": ["/bin/sh", "-c", "echo proxy up on $PROXY_HOST:$PROXY_PORT; sleep 1; exit 1"],
            "port": 4123,
            "restartDelayMs": 1000,
        }),
        sink.clone(),
    );

    println!("Supervising for 6 seconds...");
    tokio::time::sleep(Duration::from_secs(6)).await;

    println!("State before stop: {}", supervisor.current_state());
    supervisor.stop();

    println!("\n=== Captured log ===");
    for (level, line) in sink.lines() {
        println!("{:>5}: {}", level.to_string(), line);
    }

    println!("\nDemo complete!");
    Ok(())
}
