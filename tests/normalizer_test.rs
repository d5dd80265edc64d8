use proxywarden::config::{
    is_valid_host, is_valid_port, SupervisorConfig, DEFAULT_COMMAND, DEFAULT_PORT,
    MIN_RESTART_DELAY_MS,
};
use serde_json::{json, Value};

fn default_command() -> Vec<String> {
    DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect()
}

/// Every config the normalizer produces satisfies the invariants, no matter
/// how malformed the input is.
fn assert_well_formed(config: &SupervisorConfig) {
    assert!(is_valid_port(config.port as i64));
    assert!(config.restart_delay_ms >= MIN_RESTART_DELAY_MS);
    assert!(!config.command.is_empty());
    assert!(config.command.iter().all(|token| !token.trim().is_empty()));
    assert!(is_valid_host(&config.host));
}

#[test]
fn malformed_inputs_always_yield_well_formed_configs() {
    let cases: Vec<Value> = vec![
        Value::Null,
        json!({}),
        json!([]),
        json!("garbage"),
        json!(17),
        json!({"host": 42, "port": "nope", "command": "ls", "restartDelayMs": true}),
        json!({"host": "", "port": -3, "command": [], "restartDelayMs": -100}),
        json!({"host": "   ", "port": 99999, "command": [""], "restartDelayMs": 0}),
        json!({"command": [null, 3.5, {"a": 1}], "autoStart": "maybe"}),
        json!({"port": 65536, "restartDelayMs": "soon"}),
    ];

    for raw in &cases {
        let config = SupervisorConfig::normalize(raw);
        assert_well_formed(&config);
    }
}

#[test]
fn scenario_empty_command_array_uses_default() {
    let config = SupervisorConfig::normalize(&json!({"command": [], "autoStart": true}));
    assert_eq!(config.command, default_command());
    assert!(config.auto_start);
}

#[test]
fn scenario_out_of_range_port_uses_default() {
    let config = SupervisorConfig::normalize(&json!({"port": 99999}));
    assert_eq!(config.port, DEFAULT_PORT);
}

#[test]
fn scenario_whitespace_only_token_is_dropped_before_the_empty_check() {
    // "  " normalizes away, so the command falls back to the default rather
    // than being rejected as empty
    let config = SupervisorConfig::normalize(&json!({"command": ["  "]}));
    assert_eq!(config.command, default_command());
    assert_well_formed(&config);
}

#[test]
fn valid_input_passes_through_unchanged() {
    let config = SupervisorConfig::normalize(&json!({
        "host": "0.0.0.0",
        "port": 8787,
        "command": ["my-proxy", "--listen"],
        "autoStart": false,
        "autoRestart": false,
        "restartDelayMs": 2000,
    }));

    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 8787);
    assert_eq!(config.command, vec!["my-proxy", "--listen"]);
    assert!(!config.auto_start);
    assert!(!config.auto_restart);
    assert_eq!(config.restart_delay_ms, 2000);
    assert_eq!(config.base_url(), "http://0.0.0.0:8787");
}
