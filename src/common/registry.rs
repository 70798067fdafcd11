//! IP 레지스트리 뷰 모델
//!
//! 차단/블랙리스트/화이트리스트 탭 중 하나만 활성화되며, 활성 탭의 폴러만 살아 있다.
//! 차단 목록만 주기적으로 갱신하고, 나머지는 탭을 열 때 한 번 조회한다.
//! 추가/삭제가 성공하면 낙관적 반영 없이 곧바로 다시 조회한다.

use log::{info, warn};
use std::time::Duration;

use crate::client::AdminApi;
use crate::config::PollingConfig;
use crate::poller::Poller;
use crate::types::{ApiError, IpRecord, Registry, RegistryError};

/// 목록이 비었을 때 보여 줄 문구
pub const EMPTY_MESSAGE: &str = "No entries found";

/// 블랙리스트 사유를 비워 두었을 때 쓰는 값
pub const DEFAULT_REASON: &str = "Manual add";

/// 운영자 확인을 거친 삭제 요청
///
/// 발급된 탭에서만 유효하다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalRequest {
    registry: Registry,
    ip: String,
}

impl RemovalRequest {
    pub fn registry(&self) -> Registry {
        self.registry
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// 확인 문구
    pub fn prompt(&self) -> String {
        match self.registry {
            Registry::Blocked => format!("Unblock {}?", self.ip),
            registry => format!("Are you sure you want to remove {} from the {}?", self.ip, registry),
        }
    }
}

/// IP 레지스트리 뷰 모델
#[derive(Debug)]
pub struct RegistryView {
    api: AdminApi,
    active: Registry,
    blocked_every: Duration,
    mounted: bool,
    poller: Poller<Vec<IpRecord>>,
    ip_input: String,
    reason_input: String,
    action_error: Option<RegistryError>,
}

impl RegistryView {
    pub fn new(api: AdminApi, polling: &PollingConfig) -> Self {
        Self {
            api,
            active: Registry::default(),
            blocked_every: polling.blocked_interval(),
            mounted: false,
            poller: Poller::new("ip registry"),
            ip_input: String::new(),
            reason_input: String::new(),
            action_error: None,
        }
    }

    /// 활성 탭 조회 시작
    pub fn mount(&mut self) {
        self.mounted = true;
        self.reload();
    }

    pub fn unmount(&mut self) {
        self.poller.stop();
        self.mounted = false;
    }

    /// 탭 전환
    ///
    /// 이전 탭의 항목은 즉시 비우고, 이전 탭에서 늦게 도착한 응답은 버려진다.
    pub fn select(&mut self, registry: Registry) {
        if registry == self.active {
            return;
        }
        info!("Switching registry view from {} to {}", self.active, registry);

        self.poller.reset();
        self.active = registry;
        self.action_error = None;
        self.refresh_if_mounted();
    }

    pub fn active(&self) -> Registry {
        self.active
    }

    /// 활성 탭을 다시 조회 (차단 목록이면 주기도 다시 시작)
    pub fn reload(&mut self) {
        let registry = self.active;
        let api = self.api.clone();

        if registry.auto_refresh() {
            self.poller.start(self.blocked_every, move || {
                let api = api.clone();
                async move { api.list(registry).await }
            });
        } else {
            self.poller.fetch_once(async move { api.list(registry).await });
        }
    }

    /// 언마운트된 뷰는 다시 조회하지 않는다
    fn refresh_if_mounted(&mut self) {
        if self.mounted {
            self.reload();
        }
    }

    /// 다음 갱신까지 대기
    pub async fn next_update(&mut self) -> Result<(), ApiError> {
        self.poller.recv().await.map(|_| ())
    }

    /// 이미 도착한 갱신을 반영 (대기하지 않음)
    pub fn sync(&mut self) -> bool {
        let mut updated = false;
        while let Some(outcome) = self.poller.try_recv() {
            updated |= outcome.is_ok();
        }
        updated
    }

    pub fn entries(&self) -> &[IpRecord] {
        self.poller.latest().map(Vec::as_slice).unwrap_or(&[])
    }

    /// 조회를 마쳤고 항목이 없는 상태
    pub fn is_empty(&self) -> bool {
        self.poller.latest().is_some_and(Vec::is_empty)
    }

    pub fn is_loading(&self) -> bool {
        self.mounted && self.poller.latest().is_none() && self.poller.last_error().is_none()
    }

    /// 마지막 조회 실패
    pub fn fetch_error(&self) -> Option<&ApiError> {
        self.poller.last_error()
    }

    /// 마지막 추가/삭제 실패
    pub fn action_error(&self) -> Option<&RegistryError> {
        self.action_error.as_ref()
    }

    pub fn set_ip_input(&mut self, ip: &str) {
        self.ip_input = ip.to_string();
    }

    pub fn set_reason_input(&mut self, reason: &str) {
        self.reason_input = reason.to_string();
    }

    pub fn ip_input(&self) -> &str {
        &self.ip_input
    }

    pub fn reason_input(&self) -> &str {
        &self.reason_input
    }

    /// 입력된 주소를 활성 탭에 추가
    ///
    /// 주소가 비어 있으면 요청 없이 `Ok(false)`. 실패해도 입력값은 남는다.
    pub async fn add(&mut self) -> Result<bool, RegistryError> {
        let registry = self.active;
        let ip = self.ip_input.trim().to_string();

        let result = match registry {
            Registry::Blocked => return Err(RegistryError::ReadOnly(registry)),
            _ if ip.is_empty() => return Ok(false),
            Registry::Blacklist => {
                let reason = match self.reason_input.trim() {
                    "" => DEFAULT_REASON,
                    reason => reason,
                };
                self.api.add_to_blacklist(&ip, reason).await
            }
            Registry::Whitelist => self.api.add_to_whitelist(&ip).await,
        };

        match result {
            Ok(()) => {
                info!("Added {} to the {}", ip, registry);
                self.ip_input.clear();
                self.reason_input.clear();
                self.action_error = None;
                self.refresh_if_mounted();
                Ok(true)
            }
            Err(e) => {
                warn!("Failed to add {} to the {}: {}", ip, registry, e);
                let err = RegistryError::from(e);
                self.action_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// 삭제 확인 요청 발급
    pub fn prepare_remove(&self, ip: &str) -> RemovalRequest {
        RemovalRequest {
            registry: self.active,
            ip: ip.trim().to_string(),
        }
    }

    /// 확인된 삭제 실행
    ///
    /// 확인 이후 탭이 바뀌었으면 요청하지 않는다.
    pub async fn remove(&mut self, request: RemovalRequest) -> Result<(), RegistryError> {
        if request.registry != self.active {
            return Err(RegistryError::StaleConfirmation {
                issued: request.registry,
                active: self.active,
            });
        }

        let result = match request.registry {
            Registry::Blocked => self.api.unblock_ip(&request.ip).await,
            Registry::Blacklist | Registry::Whitelist => self.api.remove_ip(&request.ip).await,
        };

        match result {
            Ok(()) => {
                info!("Removed {} from the {}", request.ip, request.registry);
                self.action_error = None;
                self.refresh_if_mounted();
                Ok(())
            }
            Err(e) => {
                warn!("Failed to remove {} from the {}: {}", request.ip, request.registry, e);
                let err = RegistryError::from(e);
                self.action_error = Some(err.clone());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn view(transport: &Arc<ScriptedTransport>) -> RegistryView {
        RegistryView::new(transport.api(), &PollingConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_blocked_tab_auto_refreshes() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::GET, "/admin/blocked_ips", json!({"success": true, "blocked_ips": []}));
        transport.respond(Method::GET, "/admin/blacklist", json!({"success": true, "blacklist": []}));

        let mut view = view(&transport);
        view.mount();
        view.next_update().await.unwrap();
        view.next_update().await.unwrap();
        assert_eq!(transport.request_count(Method::GET, "/admin/blocked_ips"), 2);

        view.select(Registry::Blacklist);
        view.next_update().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        view.sync();

        assert_eq!(transport.request_count(Method::GET, "/admin/blacklist"), 1);
        assert_eq!(transport.request_count(Method::GET, "/admin/blocked_ips"), 2);
        assert!(view.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_in_blocked_tab_is_rejected() {
        let transport = ScriptedTransport::new();
        let mut view = view(&transport);
        view.set_ip_input("10.0.0.1");

        let err = view.add().await.unwrap_err();
        assert_eq!(err, RegistryError::ReadOnly(Registry::Blocked));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blacklist_add_uses_default_reason_and_clears_inputs() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::POST, "/admin/add_to_blacklist", json!({"success": true}));
        transport.respond(Method::GET, "/admin/blacklist", json!({"success": true, "blacklist": []}));

        let mut view = view(&transport);
        view.select(Registry::Blacklist);
        view.mount();
        view.next_update().await.unwrap();
        view.set_ip_input(" 10.0.0.5 ");

        assert!(view.add().await.unwrap());
        let post = &transport.requests()[1];
        assert_eq!(post.body, Some(json!({"ip": "10.0.0.5", "reason": "Manual add"})));
        assert_eq!(view.ip_input(), "");

        // 성공하면 곧바로 다시 조회한다
        view.next_update().await.unwrap();
        assert_eq!(transport.request_count(Method::GET, "/admin/blacklist"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_add_keeps_inputs() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::POST,
            "/admin/add_to_whitelist",
            json!({"success": false, "message": "already listed"}),
        );

        let mut view = view(&transport);
        view.select(Registry::Whitelist);
        view.set_ip_input("10.0.0.7");

        let err = view.add().await.unwrap_err();
        assert_eq!(err, RegistryError::Api(ApiError::Rejected("already listed".to_string())));
        assert_eq!(view.ip_input(), "10.0.0.7");
        assert!(view.action_error().is_some());
        assert_eq!(transport.request_count(Method::GET, "/admin/whitelist"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_is_bound_to_its_tab() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::GET, "/admin/blacklist", json!({"success": true, "blacklist": []}));

        let mut view = view(&transport);
        let request = view.prepare_remove("10.0.0.1");
        assert_eq!(request.prompt(), "Unblock 10.0.0.1?");

        view.select(Registry::Blacklist);
        let err = view.remove(request).await.unwrap_err();
        assert_eq!(
            err,
            RegistryError::StaleConfirmation {
                issued: Registry::Blocked,
                active: Registry::Blacklist
            }
        );
        assert_eq!(transport.request_count(Method::POST, "/admin/unblock_ip"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_uses_mode_endpoint() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::POST, "/admin/unblock_ip", json!({"success": true}));
        transport.respond(Method::POST, "/admin/remove_ip", json!({"success": true}));
        transport.respond(Method::GET, "/admin/blocked_ips", json!({"success": true, "blocked_ips": []}));
        transport.respond(Method::GET, "/admin/whitelist", json!({"success": true, "whitelist": []}));

        let mut view = view(&transport);
        view.remove(view.prepare_remove("10.0.0.1")).await.unwrap();
        view.select(Registry::Whitelist);
        view.remove(view.prepare_remove("10.0.0.2")).await.unwrap();

        assert_eq!(transport.request_count(Method::POST, "/admin/unblock_ip"), 1);
        assert_eq!(transport.request_count(Method::POST, "/admin/remove_ip"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmounted_view_stays_idle_after_mutation() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::GET, "/admin/blocked_ips", json!({"success": true, "blocked_ips": ["10.0.0.1"]}));
        transport.respond(Method::POST, "/admin/unblock_ip", json!({"success": true}));
        transport.respond(Method::POST, "/admin/add_to_whitelist", json!({"success": true}));

        let mut view = view(&transport);
        view.mount();
        view.next_update().await.unwrap();
        view.unmount();

        view.remove(view.prepare_remove("10.0.0.1")).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.request_count(Method::GET, "/admin/blocked_ips"), 1);

        view.select(Registry::Whitelist);
        view.set_ip_input("10.0.0.9");
        assert!(view.add().await.unwrap());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.request_count(Method::GET, "/admin/whitelist"), 0);
        assert!(!view.sync());
    }
}
