// guard-console wire API
// 백엔드 응답/요청 본문 정의와 API 경계에서의 정규화

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::types::{IpRecord, LogEntry, Registry, TrafficSnapshot};
use crate::utils;

/// 트래픽 통계 응답
#[derive(Debug, Default, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub latest: Option<WireSnapshot>,
    #[serde(default)]
    pub history: Option<Vec<WireSnapshot>>,
}

/// 통계 행
///
/// 필드 이름이 백엔드 버전마다 달라서 양쪽 이름을 모두 받는다.
#[derive(Debug, Default, Deserialize)]
pub struct WireSnapshot {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub total_requests: Option<f64>,
    #[serde(default)]
    pub requests_per_minute: Option<f64>,
    #[serde(default)]
    pub blocked_requests: Option<f64>,
    #[serde(default)]
    pub blocked_count: Option<f64>,
    #[serde(default)]
    pub suspicious_count: Option<f64>,
    #[serde(default)]
    pub avg_latency: Option<f64>,
}

impl From<WireSnapshot> for TrafficSnapshot {
    fn from(wire: WireSnapshot) -> Self {
        TrafficSnapshot {
            timestamp: wire.timestamp.as_ref().and_then(timestamp_from_value),
            total_requests: count(wire.total_requests.or(wire.requests_per_minute)),
            blocked_requests: count(wire.blocked_requests.or(wire.blocked_count)),
            suspicious_requests: count(wire.suspicious_count),
            avg_latency: wire.avg_latency.filter(|v| v.is_finite()).unwrap_or(0.0),
        }
    }
}

/// 최근 로그 응답
#[derive(Debug, Default, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Option<Vec<WireLogEntry>>,
}

/// 로그 행
#[derive(Debug, Default, Deserialize)]
pub struct WireLogEntry {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub status_code: Option<f64>,
    #[serde(default)]
    pub process_time_ms: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<WireLogEntry> for LogEntry {
    fn from(wire: WireLogEntry) -> Self {
        LogEntry {
            id: wire.id.as_ref().and_then(Value::as_u64),
            timestamp: wire.timestamp.as_ref().and_then(timestamp_from_value),
            ip: wire.ip.unwrap_or_default(),
            method: wire.method.unwrap_or_default(),
            path: wire.path.or(wire.endpoint).unwrap_or_default(),
            status_code: count(wire.status_code).min(u16::MAX as u64) as u16,
            process_time_ms: wire.process_time_ms.filter(|v| v.is_finite()),
            verdict: wire.status,
            reason: wire.reason,
        }
    }
}

/// 레지스트리 항목의 원시 형태 (문자열 또는 객체)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawEntry {
    Address(String),
    Record(RawRecord),
}

/// 객체 형태의 레지스트리 항목
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub unblock_time: Option<f64>,
    #[serde(default)]
    pub blocked_until: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

impl RawEntry {
    fn address(&self) -> Option<&str> {
        let addr = match self {
            RawEntry::Address(addr) => Some(addr.as_str()),
            RawEntry::Record(rec) => rec
                .ip
                .as_deref()
                .or(rec.address.as_deref())
                .or(rec.ip_address.as_deref()),
        };
        addr.map(str::trim).filter(|a| !a.is_empty())
    }

    fn record(&self) -> Option<&RawRecord> {
        match self {
            RawEntry::Record(rec) => Some(rec),
            RawEntry::Address(_) => None,
        }
    }
}

fn blocked_record(raw: &RawEntry) -> Option<IpRecord> {
    let ip = raw.address()?.to_string();
    let rec = raw.record();
    let unblock_time = rec.and_then(|r| {
        r.unblock_time
            .filter(|t| t.is_finite())
            .map(|t| t as i64)
            .or_else(|| {
                r.blocked_until
                    .as_deref()
                    .or(r.expires_at.as_deref())
                    .and_then(utils::parse_timestamp)
                    .map(|ts| ts.timestamp())
            })
    });
    Some(IpRecord {
        ip,
        reason: rec.and_then(|r| r.reason.clone()),
        unblock_time,
    })
}

fn blacklist_record(raw: &RawEntry) -> Option<IpRecord> {
    Some(IpRecord {
        ip: raw.address()?.to_string(),
        reason: raw.record().and_then(|r| r.reason.clone()),
        unblock_time: None,
    })
}

fn whitelist_record(raw: &RawEntry) -> Option<IpRecord> {
    Some(IpRecord {
        ip: raw.address()?.to_string(),
        reason: None,
        unblock_time: None,
    })
}

/// 레지스트리 응답 본문을 정규화된 레코드 목록으로 변환
///
/// 주소가 없거나 형태를 알 수 없는 항목은 버리고, 같은 주소는 처음 것만 남긴다.
pub fn normalize_registry(registry: Registry, body: &Value) -> Vec<IpRecord> {
    let items: &[Value] = match body.get(registry.response_key()) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    };

    let convert: fn(&RawEntry) -> Option<IpRecord> = match registry {
        Registry::Blocked => blocked_record,
        Registry::Blacklist => blacklist_record,
        Registry::Whitelist => whitelist_record,
    };

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let raw = match RawEntry::deserialize(item) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Dropping unrecognised {} entry {}: {}", registry, item, e);
                continue;
            }
        };
        match convert(&raw) {
            Some(record) => {
                if seen.insert(record.ip.clone()) {
                    records.push(record);
                } else {
                    warn!("Dropping duplicate {} entry for {}", registry, record.ip);
                }
            }
            None => warn!("Dropping {} entry without an address: {}", registry, item),
        }
    }
    records
}

/// 블랙리스트 추가 요청
#[derive(Debug, Serialize)]
pub struct BlacklistRequest<'a> {
    pub ip: &'a str,
    pub reason: &'a str,
}

/// 주소 하나만 담는 요청 (화이트리스트 추가, 차단 해제, 삭제)
#[derive(Debug, Serialize)]
pub struct AddressRequest<'a> {
    pub ip: &'a str,
}

/// 플러드 시뮬레이션 응답
#[derive(Debug, Default, Deserialize)]
pub struct FloodResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub simulated_ips: Option<Vec<String>>,
}

/// 봇넷 시뮬레이션 응답
#[derive(Debug, Default, Deserialize)]
pub struct DdosResponse {
    #[serde(default)]
    pub total_requests: Option<f64>,
    #[serde(default)]
    pub blocked_count: Option<f64>,
    #[serde(default)]
    pub attacking_ips_count: Option<f64>,
    #[serde(default)]
    pub sample_attacking_ips: Option<Vec<String>>,
}

/// 누락되었거나 음수인 수치는 0으로 취급
pub(crate) fn count(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v as u64,
        _ => 0,
    }
}

fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => utils::parse_timestamp(s),
        Value::Number(n) => n
            .as_f64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0)),
        _ => None,
    }
}
