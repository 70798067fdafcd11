// 폴링 뷰와 폼, 시뮬레이터의 상태 동기화 시나리오

use guard_console::config::PollingConfig;
use guard_console::rules::RulesForm;
use guard_console::simulator::SimulatorController;
use guard_console::testing::ScriptedTransport;
use guard_console::traffic::TrafficStatsView;
use guard_console::types::{FloodMode, RuleField, SimulationError, TrafficSnapshot};
use reqwest::Method;
use serde_json::json;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_stats_scenario_exposes_latest_and_history() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::GET,
        "/admin/traffic/stats",
        json!({
            "success": true,
            "latest": {"total_requests": 120, "blocked_requests": 4, "avg_latency": 8.0},
            "history": [{"timestamp": "2024-05-01T10:00:00", "total_requests": 120}]
        }),
    );

    let mut view = TrafficStatsView::new(transport.api(), &PollingConfig::default());
    view.mount();
    view.next_update().await.unwrap();

    assert_eq!(view.latest().total_requests, 120);
    assert_eq!(view.history().len(), 1);
    assert_eq!(view.history()[0].total_requests, 120);
}

#[tokio::test(start_paused = true)]
async fn test_newest_first_history_is_exposed_oldest_first() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::GET,
        "/admin/traffic/stats",
        json!({
            "success": true,
            "history": [
                {"timestamp": "2024-05-01T10:29:00Z", "requests_per_minute": 3},
                {"timestamp": "2024-05-01T10:15:00Z", "requests_per_minute": 2},
                {"timestamp": "2024-05-01T10:00:00Z", "requests_per_minute": 1},
            ]
        }),
    );

    let mut view = TrafficStatsView::new(transport.api(), &PollingConfig::default());
    view.mount();
    view.next_update().await.unwrap();

    let stamps: Vec<_> = view.history().iter().map(|s| s.timestamp).collect();
    let mut sorted = stamps.clone();
    sorted.sort();
    assert_eq!(stamps, sorted);
    assert_eq!(view.history()[2].total_requests, 3);
}

#[tokio::test(start_paused = true)]
async fn test_unmount_discards_in_flight_response() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::GET,
        "/admin/traffic/stats",
        json!({"success": true, "latest": {"total_requests": 999}}),
    );
    let gate = transport.gate(Method::GET, "/admin/traffic/stats");

    let mut view = TrafficStatsView::new(transport.api(), &PollingConfig::default());
    view.mount();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.request_count(Method::GET, "/admin/traffic/stats"), 1);

    view.unmount();
    gate.open();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(!view.sync());
    assert_eq!(view.latest(), TrafficSnapshot::default());
    assert_eq!(transport.request_count(Method::GET, "/admin/traffic/stats"), 1);
}

#[tokio::test]
async fn test_rules_reload_never_overwrites_pending_edit() {
    let transport = ScriptedTransport::new();
    let rules = |per_min: u64| {
        json!({"success": true, "rules": {
            "max_req_per_sec": 10,
            "max_req_per_min": per_min,
            "block_duration": 300,
            "anomaly_threshold": 5000
        }})
    };
    transport.respond_once(Method::GET, "/admin/rules", rules(100));
    transport.respond(Method::GET, "/admin/rules", rules(250));
    transport.fail_once(
        Method::POST,
        "/admin/update_rules",
        guard_console::ApiError::Transport("connection reset".to_string()),
    );
    transport.respond(Method::POST, "/admin/update_rules", json!({"success": true}));

    let mut form = RulesForm::new(transport.api());
    form.load().await.unwrap();
    form.set_field(RuleField::MaxReqPerMin, "120").unwrap();
    assert!(form.set_field(RuleField::MaxReqPerMin, "lots").is_err());

    // 저장 실패 후 백그라운드 재조회
    assert!(form.save().await.is_err());
    form.load().await.unwrap();
    assert_eq!(form.value(RuleField::MaxReqPerMin), 120);
    assert_eq!(form.confirmed().map(|r| r.max_req_per_min), Some(250));

    form.save().await.unwrap();
    assert!(!form.is_dirty());
    let posts: Vec<_> = transport
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::POST)
        .collect();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].body.as_ref().unwrap()["max_req_per_min"], 120);
}

#[tokio::test]
async fn test_concurrent_simulations_are_mutually_exclusive() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::GET,
        "/simulate/ddos-attack",
        json!({"success": true, "total_requests": 100, "blocked_count": 80}),
    );
    transport.respond(Method::GET, "/simulate/high-traffic", json!({"success": true}));
    let gate = transport.gate(Method::GET, "/simulate/ddos-attack");

    let controller = SimulatorController::new(transport.api());
    let ddos = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run_ddos(10, 10).await }
    });
    tokio::task::yield_now().await;

    let second = controller.run_flood(500, FloodMode::Auto).await;
    assert_eq!(second, Err(SimulationError::Busy));
    assert_eq!(transport.request_count(Method::GET, "/simulate/high-traffic"), 0);

    gate.open();
    assert!(ddos.await.unwrap().is_ok());

    // 끝난 뒤에는 다시 실행할 수 있다
    assert!(controller.run_flood(500, FloodMode::Auto).await.is_ok());
    assert_eq!(
        transport.requests().last().map(|r| r.path.clone()),
        Some("/simulate/high-traffic?count=500&ip=auto".to_string())
    );
}
