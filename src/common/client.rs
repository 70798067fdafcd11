//! API 클라이언트 모듈
//! 백엔드와 통신하는 HTTP 클라이언트와 엔드포인트별 호출

use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::api::{
    self, AddressRequest, BlacklistRequest, DdosResponse, FloodResponse, LogsResponse,
    StatsResponse,
};
use crate::config::ApiConfig;
use crate::traffic::TrafficReport;
use crate::types::{ApiError, FloodMode, IpRecord, LogEntry, Registry, RuleConfig, SimulationResult};

/// 요청 하나를 보내고 2xx JSON 본문을 돌려주는 전송 계층
///
/// 캐시, 재시도, 상태를 두지 않는다.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError>;
}

/// reqwest 기반 HTTP 전송
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// 새로운 API 클라이언트 생성
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        debug!("{} {}{}", method, self.base_url, path);

        let mut request = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(classify)?;

        interpret(status, &text)
    }
}

fn classify(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(err.to_string())
    } else if err.is_decode() {
        ApiError::Malformed(err.to_string())
    } else {
        ApiError::Transport(err.to_string())
    }
}

/// HTTP 상태와 본문 해석
pub(crate) fn interpret(status: u16, text: &str) -> Result<Value, ApiError> {
    let parsed = serde_json::from_str::<Value>(text);

    if !(200..300).contains(&status) {
        let message = parsed
            .ok()
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| {
                let text = text.trim();
                if text.is_empty() {
                    "no response body".to_string()
                } else {
                    text.chars().take(200).collect()
                }
            });
        return Err(ApiError::Status { status, message });
    }

    parsed.map_err(|e| ApiError::Malformed(format!("invalid JSON: {}", e)))
}

/// `success` 필드로 응답을 판정
pub(crate) fn check_envelope(body: Value) -> Result<Value, ApiError> {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => Ok(body),
        Some(false) => Err(ApiError::Rejected(
            error_message(&body).unwrap_or_else(|| "the server reported a failure".to_string()),
        )),
        None => Err(ApiError::Malformed("response has no `success` flag".to_string())),
    }
}

/// 에러 본문에서 사람이 읽을 메시지 추출 (`detail`, `message`, `error`)
fn error_message(body: &Value) -> Option<String> {
    match body.get("detail") {
        Some(Value::String(s)) => return Some(s.clone()),
        Some(Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }

    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Malformed(e.to_string()))
}

/// 관리 API 엔드포인트
///
/// 모든 뷰 모델이 공유하는 호출 표면. 응답은 여기서 한 번만 도메인 타입으로 변환한다.
#[derive(Clone)]
pub struct AdminApi {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for AdminApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminApi").finish_non_exhaustive()
    }
}

impl AdminApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// 설정의 주소로 HTTP 클라이언트를 만들어 연결
    pub fn connect(config: &ApiConfig) -> Result<Self, ApiError> {
        Ok(Self::new(Arc::new(ApiClient::from_config(config)?)))
    }

    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let body = self.transport.request(method, path, body).await?;
        check_envelope(body)
    }

    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.call(Method::GET, path, None).await
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Malformed(format!("failed to encode request: {}", e)))?;
        self.call(Method::POST, path, Some(body)).await
    }

    /// 트래픽 통계 조회
    pub async fn traffic_stats(&self, minutes: u32) -> Result<TrafficReport, ApiError> {
        let body = self.get(&format!("/admin/traffic/stats?minutes={}", minutes)).await?;
        Ok(TrafficReport::from_wire(decode::<StatsResponse>(body)?))
    }

    /// 최근 로그 조회
    pub async fn recent_logs(&self, limit: u32) -> Result<Vec<LogEntry>, ApiError> {
        let body = self.get(&format!("/admin/logs/recent?limit={}", limit)).await?;
        let logs = decode::<LogsResponse>(body)?.logs.unwrap_or_default();
        Ok(logs.into_iter().map(LogEntry::from).collect())
    }

    /// 현재 규칙 조회
    pub async fn rules(&self) -> Result<RuleConfig, ApiError> {
        let mut body = self.get("/admin/rules").await?;
        match body.get_mut("rules").map(Value::take) {
            Some(rules) if rules.is_object() => decode(rules),
            _ => Err(ApiError::Malformed("response has no `rules` object".to_string())),
        }
    }

    /// 규칙 전체 갱신
    pub async fn update_rules(&self, rules: &RuleConfig) -> Result<(), ApiError> {
        self.post("/admin/update_rules", rules).await.map(|_| ())
    }

    /// 레지스트리 목록 조회
    pub async fn list(&self, registry: Registry) -> Result<Vec<IpRecord>, ApiError> {
        let body = self.get(registry.list_path()).await?;
        Ok(api::normalize_registry(registry, &body))
    }

    pub async fn add_to_blacklist(&self, ip: &str, reason: &str) -> Result<(), ApiError> {
        self.post("/admin/add_to_blacklist", &BlacklistRequest { ip, reason })
            .await
            .map(|_| ())
    }

    pub async fn add_to_whitelist(&self, ip: &str) -> Result<(), ApiError> {
        self.post("/admin/add_to_whitelist", &AddressRequest { ip })
            .await
            .map(|_| ())
    }

    /// 일시 차단 해제
    pub async fn unblock_ip(&self, ip: &str) -> Result<(), ApiError> {
        self.post("/admin/unblock_ip", &AddressRequest { ip })
            .await
            .map(|_| ())
    }

    /// 블랙리스트/화이트리스트에서 삭제
    pub async fn remove_ip(&self, ip: &str) -> Result<(), ApiError> {
        self.post("/admin/remove_ip", &AddressRequest { ip })
            .await
            .map(|_| ())
    }

    /// 요청 플러드 시뮬레이션
    pub async fn simulate_flood(&self, count: u32, mode: FloodMode) -> Result<SimulationResult, ApiError> {
        let body = self
            .get(&format!("/simulate/high-traffic?count={}&ip={}", count, mode))
            .await?;
        let resp: FloodResponse = decode(body)?;

        Ok(SimulationResult::Flood {
            requests: count,
            mode: resp
                .mode
                .as_deref()
                .and_then(|m| m.parse().ok())
                .unwrap_or(mode),
            message: resp.message,
            sample_ips: resp.simulated_ips.unwrap_or_default(),
        })
    }

    /// 봇넷(DDoS) 시뮬레이션
    pub async fn simulate_ddos(&self, bots: u32, requests_per_bot: u32) -> Result<SimulationResult, ApiError> {
        let body = self
            .get(&format!(
                "/simulate/ddos-attack?target_ips={}&requests_per_ip={}",
                bots, requests_per_bot
            ))
            .await?;
        let resp: DdosResponse = decode(body)?;

        Ok(SimulationResult::Ddos {
            total_requests: api::count(resp.total_requests),
            blocked_count: api::count(resp.blocked_count),
            attacking_ips: match resp.attacking_ips_count {
                Some(_) => api::count(resp.attacking_ips_count),
                None => u64::from(bots),
            },
            sample_ips: resp.sample_attacking_ips.unwrap_or_default(),
        })
    }
}
