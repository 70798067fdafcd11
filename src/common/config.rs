//! 구성 모듈
//! 콘솔 구성 로드 및 관리

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::ConfigError;

/// 콘솔 구성
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ConsoleConfig {
    /// 백엔드 API 구성
    pub api: ApiConfig,
    /// 폴링 구성
    pub polling: PollingConfig,
}

/// 백엔드 API 구성
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 기본 주소 (예: http://127.0.0.1:8000)
    pub base_url: String,
    /// 요청 타임아웃 (초). 시뮬레이션 요청도 같은 값을 쓴다.
    pub timeout_secs: u64,
}

/// 폴링 구성
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// 통계 갱신 간격 (ms)
    pub stats_interval_ms: u64,
    /// 통계 조회 범위 (분)
    pub stats_window_minutes: u32,
    /// 로그 갱신 간격 (ms)
    pub logs_interval_ms: u64,
    /// 한 번에 가져올 로그 수
    pub log_limit: u32,
    /// 차단 목록 갱신 간격 (ms)
    pub blocked_interval_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            stats_interval_ms: 2000,
            stats_window_minutes: 30,
            logs_interval_ms: 5000,
            log_limit: 200,
            blocked_interval_ms: 5000,
        }
    }
}

impl PollingConfig {
    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    pub fn logs_interval(&self) -> Duration {
        Duration::from_millis(self.logs_interval_ms)
    }

    pub fn blocked_interval(&self) -> Duration {
        Duration::from_millis(self.blocked_interval_ms)
    }
}

impl ConsoleConfig {
    /// 설정값 검증
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api.base_url must start with http:// or https://, got {:?}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid("api.timeout_secs must be positive".to_string()));
        }

        let p = &self.polling;
        for (name, value) in [
            ("polling.stats_interval_ms", p.stats_interval_ms),
            ("polling.logs_interval_ms", p.logs_interval_ms),
            ("polling.blocked_interval_ms", p.blocked_interval_ms),
            ("polling.stats_window_minutes", u64::from(p.stats_window_minutes)),
            ("polling.log_limit", u64::from(p.log_limit)),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be positive", name)));
            }
        }

        Ok(())
    }
}

/// 구성 파일 로드
///
/// 파일이 없으면 기본 구성을 쓴다.
pub fn load_config(path: &Path) -> Result<ConsoleConfig, ConfigError> {
    if !path.exists() {
        warn!("Config file not found at {}, using default config", path.display());
        return Ok(ConsoleConfig::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let config: ConsoleConfig = serde_yaml::from_str(&contents)?;
    config.validate()?;

    info!("Config loaded from {}", path.display());

    Ok(config)
}

/// 구성 파일 저장
pub fn save_config(config: &ConsoleConfig, path: &Path) -> Result<(), ConfigError> {
    let yaml = serde_yaml::to_string(config)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, yaml)?;

    info!("Config saved to {}", path.display());

    Ok(())
}

/// 구성 예시 생성
pub fn create_example_config() -> ConsoleConfig {
    let mut config = ConsoleConfig::default();

    config.api.timeout_secs = 120;
    config.polling.log_limit = 100;

    config
}
