// IP 레지스트리 탭 전환과 추가/삭제 흐름

use guard_console::config::PollingConfig;
use guard_console::registry::{RegistryView, EMPTY_MESSAGE};
use guard_console::testing::ScriptedTransport;
use guard_console::types::{Registry, RegistryError};
use reqwest::Method;
use serde_json::json;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_tab_switch_never_mixes_registries() {
    let transport = ScriptedTransport::new();
    transport.respond(
        Method::GET,
        "/admin/blocked_ips",
        json!({"success": true, "blocked_ips": [{"ip": "203.0.113.9", "unblock_time": 1700000300}]}),
    );
    transport.respond(
        Method::GET,
        "/admin/blacklist",
        json!({"success": true, "blacklist": [{"ip": "198.51.100.1", "reason": "scanner"}]}),
    );
    let gate = transport.gate(Method::GET, "/admin/blocked_ips");

    let mut view = RegistryView::new(transport.api(), &PollingConfig::default());
    view.mount();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // 차단 목록 응답이 오기 전에 탭을 바꾼다
    view.select(Registry::Blacklist);
    gate.open();
    view.next_update().await.unwrap();

    tokio::time::sleep(Duration::from_secs(20)).await;
    view.sync();

    let ips: Vec<&str> = view.entries().iter().map(|r| r.ip.as_str()).collect();
    assert_eq!(ips, vec!["198.51.100.1"]);
    assert_eq!(view.active(), Registry::Blacklist);
    assert_eq!(transport.request_count(Method::GET, "/admin/blocked_ips"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_switching_clears_previous_entries_immediately() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::GET, "/admin/blocked_ips", json!({"success": true, "blocked_ips": ["10.9.9.9"]}));
    transport.respond(Method::GET, "/admin/whitelist", json!({"success": true, "whitelist": ["10.1.1.1"]}));

    let mut view = RegistryView::new(transport.api(), &PollingConfig::default());
    view.mount();
    view.next_update().await.unwrap();
    assert_eq!(view.entries().len(), 1);

    view.select(Registry::Whitelist);
    assert!(view.entries().is_empty());
    assert!(view.is_loading());

    view.next_update().await.unwrap();
    assert_eq!(view.entries()[0].ip, "10.1.1.1");
}

#[tokio::test(start_paused = true)]
async fn test_empty_address_issues_no_request() {
    let transport = ScriptedTransport::new();
    let mut view = RegistryView::new(transport.api(), &PollingConfig::default());
    view.select(Registry::Blacklist);
    view.set_ip_input("   ");
    view.set_reason_input("abuse");

    assert_eq!(view.add().await, Ok(false));
    assert!(transport.requests().is_empty());
    assert_eq!(view.reason_input(), "abuse");
    assert!(view.action_error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_blacklist_add_then_remove() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::POST, "/admin/add_to_blacklist", json!({"success": true}));
    transport.respond(Method::POST, "/admin/remove_ip", json!({"success": true}));
    transport.respond_once(Method::GET, "/admin/blacklist", json!({"success": true, "blacklist": []}));
    transport.respond_once(
        Method::GET,
        "/admin/blacklist",
        json!({"success": true, "blacklist": [{"ip": "10.0.0.5", "reason": "abuse"}]}),
    );
    transport.respond(Method::GET, "/admin/blacklist", json!({"success": true, "blacklist": []}));

    let mut view = RegistryView::new(transport.api(), &PollingConfig::default());
    view.select(Registry::Blacklist);
    view.mount();
    view.next_update().await.unwrap();
    assert!(view.is_empty());
    view.set_ip_input("10.0.0.5");
    view.set_reason_input("abuse");

    assert!(view.add().await.unwrap());
    view.next_update().await.unwrap();
    assert_eq!(view.entries()[0].reason.as_deref(), Some("abuse"));
    assert_eq!(
        transport.requests()[1].body,
        Some(json!({"ip": "10.0.0.5", "reason": "abuse"}))
    );

    let request = view.prepare_remove("10.0.0.5");
    assert!(request.prompt().contains("10.0.0.5"));
    view.remove(request).await.unwrap();
    view.next_update().await.unwrap();

    assert!(view.is_empty());
    assert_eq!(EMPTY_MESSAGE, "No entries found");
}

#[tokio::test(start_paused = true)]
async fn test_failed_remove_keeps_entries_and_reports() {
    let transport = ScriptedTransport::new();
    transport.respond(Method::GET, "/admin/blocked_ips", json!({"success": true, "blocked_ips": ["10.2.2.2"]}));
    transport.respond(
        Method::POST,
        "/admin/unblock_ip",
        json!({"success": false, "message": "IP not blocked"}),
    );

    let mut view = RegistryView::new(transport.api(), &PollingConfig::default());
    view.mount();
    view.next_update().await.unwrap();

    let err = view.remove(view.prepare_remove("10.2.2.2")).await.unwrap_err();
    assert!(matches!(err, RegistryError::Api(_)));
    assert_eq!(view.entries().len(), 1);
    assert!(view.action_error().is_some());
}
