// guard-ctl / guard-console 실행 파일 테스트 (백엔드 없이)

use std::process::Command;

const CTL: &str = env!("CARGO_BIN_EXE_guard-ctl");
const CONSOLE: &str = env!("CARGO_BIN_EXE_guard-console");

#[test]
fn test_invalid_address_is_rejected_before_any_request() {
    let output = Command::new(CTL)
        .env("RUST_LOG", "info")
        .args(["--api-url", "http://127.0.0.1:1", "ip", "add", "blacklist", "not-an-ip"])
        .output()
        .expect("Failed to execute guard-ctl");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid IP address"));
}

#[test]
fn test_unreachable_backend_exits_with_error() {
    let output = Command::new(CTL)
        .env("RUST_LOG", "info")
        .args(["--api-url", "http://127.0.0.1:1", "stats"])
        .output()
        .expect("Failed to execute guard-ctl");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to fetch traffic stats"));
}

#[test]
fn test_out_of_range_simulation_is_rejected() {
    let output = Command::new(CTL)
        .env("RUST_LOG", "info")
        .args(["--api-url", "http://127.0.0.1:1", "simulate", "ddos", "--bots", "5000"])
        .output()
        .expect("Failed to execute guard-ctl");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("bots must be between 1 and 1000"));
}

#[test]
fn test_init_config_writes_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("console.yaml");

    let output = Command::new(CONSOLE)
        .arg("--init-config")
        .arg(&path)
        .output()
        .expect("Failed to execute guard-console");

    assert!(output.status.success());
    let config = guard_console::config::load_config(&path).unwrap();
    assert_eq!(config, guard_console::config::create_example_config());
}
