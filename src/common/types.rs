//! 공통 타입 정의
//! 뷰 모델이 노출하는 도메인 타입과 에러 타입

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// API 호출 에러
///
/// 전송 실패, HTTP 상태 오류, 애플리케이션 거부(`success:false`),
/// 잘못된 응답 본문을 하나의 타입으로 정규화한다.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// 전송 계층 실패 여부 (타임아웃 포함)
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Timeout(_))
    }
}

/// IP 레지스트리 작업 에러
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("the {0} list cannot be edited directly")]
    ReadOnly(Registry),

    #[error("confirmation was issued for the {issued} list but {active} is active")]
    StaleConfirmation { issued: Registry, active: Registry },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// 규칙 폼 에러
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RulesError {
    #[error("{field} must be a non-negative integer, got {input:?}")]
    InvalidNumber { field: RuleField, input: String },

    #[error("rules have not been loaded yet")]
    NotLoaded,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// 공격 시뮬레이션 에러
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("another simulation is already running")]
    Busy,

    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// 설정 에러
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// 트래픽 스냅샷 (한 시점의 측정값)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficSnapshot {
    pub timestamp: Option<DateTime<Utc>>,
    pub total_requests: u64,
    pub blocked_requests: u64,
    pub suspicious_requests: u64,
    /// 평균 지연 (ms)
    pub avg_latency: f64,
}

/// 요청 로그 항목
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogEntry {
    /// 한 번의 조회 안에서만 유일하다
    pub id: Option<u64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub ip: String,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub process_time_ms: Option<f64>,
    /// 백엔드 판정 (allowed, blocked, suspicious)
    pub verdict: Option<String>,
    pub reason: Option<String>,
}

impl LogEntry {
    /// 조회 간에도 안정적인 렌더링 키
    ///
    /// 서버의 `id`는 조회마다 바뀔 수 있으므로 사용하지 않는다.
    pub fn render_key(&self) -> String {
        let ts = self
            .timestamp
            .map(|t| t.timestamp_micros().to_string())
            .unwrap_or_default();
        format!("{}|{}|{}|{}", ts, self.ip, self.method, self.path)
    }

    /// 필터 문자열 포함 여부 (ip, path, method 중 하나라도)
    pub fn matches(&self, needle: &str) -> bool {
        self.ip.contains(needle) || self.path.contains(needle) || self.method.contains(needle)
    }
}

/// IP 레지스트리 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Registry {
    #[default]
    Blocked,
    Blacklist,
    Whitelist,
}

impl Registry {
    pub const ALL: [Registry; 3] = [Registry::Blocked, Registry::Blacklist, Registry::Whitelist];

    /// 목록 조회 엔드포인트
    pub fn list_path(self) -> &'static str {
        match self {
            Registry::Blocked => "/admin/blocked_ips",
            Registry::Blacklist => "/admin/blacklist",
            Registry::Whitelist => "/admin/whitelist",
        }
    }

    /// 응답 본문에서 목록이 담긴 키
    pub fn response_key(self) -> &'static str {
        match self {
            Registry::Blocked => "blocked_ips",
            Registry::Blacklist => "blacklist",
            Registry::Whitelist => "whitelist",
        }
    }

    /// 운영자가 직접 항목을 추가할 수 있는지
    pub fn accepts_additions(self) -> bool {
        !matches!(self, Registry::Blocked)
    }

    /// 자동 갱신 대상인지 (차단 목록은 시간이 지나면 만료된다)
    pub fn auto_refresh(self) -> bool {
        matches!(self, Registry::Blocked)
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Registry::Blocked => "blocked",
            Registry::Blacklist => "blacklist",
            Registry::Whitelist => "whitelist",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Registry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blocked" => Ok(Registry::Blocked),
            "blacklist" => Ok(Registry::Blacklist),
            "whitelist" => Ok(Registry::Whitelist),
            _ => Err(format!("unknown list: {}", s)),
        }
    }
}

/// 정규화된 IP 레코드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpRecord {
    pub ip: String,
    pub reason: Option<String>,
    /// 차단 해제 시각 (epoch 초)
    pub unblock_time: Option<i64>,
}

/// 완화 규칙 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub max_req_per_sec: u64,
    pub max_req_per_min: u64,
    /// 차단 유지 시간 (초)
    pub block_duration: u64,
    pub anomaly_threshold: u64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            max_req_per_sec: 10,
            max_req_per_min: 100,
            block_duration: 300,
            anomaly_threshold: 5000,
        }
    }
}

impl RuleConfig {
    pub fn get(&self, field: RuleField) -> u64 {
        match field {
            RuleField::MaxReqPerSec => self.max_req_per_sec,
            RuleField::MaxReqPerMin => self.max_req_per_min,
            RuleField::BlockDuration => self.block_duration,
            RuleField::AnomalyThreshold => self.anomaly_threshold,
        }
    }

    pub fn set(&mut self, field: RuleField, value: u64) {
        match field {
            RuleField::MaxReqPerSec => self.max_req_per_sec = value,
            RuleField::MaxReqPerMin => self.max_req_per_min = value,
            RuleField::BlockDuration => self.block_duration = value,
            RuleField::AnomalyThreshold => self.anomaly_threshold = value,
        }
    }
}

/// 규칙 필드 식별자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleField {
    MaxReqPerSec,
    MaxReqPerMin,
    BlockDuration,
    AnomalyThreshold,
}

impl RuleField {
    pub const ALL: [RuleField; 4] = [
        RuleField::MaxReqPerSec,
        RuleField::MaxReqPerMin,
        RuleField::BlockDuration,
        RuleField::AnomalyThreshold,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RuleField::MaxReqPerSec => "max_req_per_sec",
            RuleField::MaxReqPerMin => "max_req_per_min",
            RuleField::BlockDuration => "block_duration",
            RuleField::AnomalyThreshold => "anomaly_threshold",
        }
    }
}

impl fmt::Display for RuleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for RuleField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleField::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| format!("unknown rule field: {}", s))
    }
}

/// 플러드 시뮬레이션 출발지 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloodMode {
    /// 요청마다 임의의 출발지
    #[default]
    Random,
    /// 단일 출발지 (DoS)
    Auto,
}

impl FloodMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FloodMode::Random => "random",
            FloodMode::Auto => "auto",
        }
    }
}

impl fmt::Display for FloodMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FloodMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(FloodMode::Random),
            "auto" => Ok(FloodMode::Auto),
            _ => Err(format!("unknown flood mode: {}", s)),
        }
    }
}

/// 시뮬레이션 결과
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationResult {
    Flood {
        requests: u32,
        mode: FloodMode,
        message: Option<String>,
        sample_ips: Vec<String>,
    },
    Ddos {
        total_requests: u64,
        blocked_count: u64,
        attacking_ips: u64,
        sample_ips: Vec<String>,
    },
}
