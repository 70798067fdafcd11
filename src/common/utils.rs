// guard-console common utilities
// 타임스탬프 파싱과 출력 형식 변환

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// 백엔드 타임스탬프 문자열 파싱
///
/// RFC 3339 형식과 시간대가 없는 ISO 8601 형식(UTC로 간주)을 모두 받는다.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// 현재 시간을 Unix 타임스탬프로 반환 (초 단위)
pub fn current_time_secs() -> i64 {
    Utc::now().timestamp()
}

/// epoch 초를 로컬 시각 문자열로 변환
pub fn format_epoch(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}

/// 타임스탬프를 로컬 시:분:초로 변환
pub fn format_clock(ts: Option<DateTime<Utc>>) -> String {
    match ts {
        Some(ts) => ts.with_timezone(&Local).format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    }
}

/// 남은 차단 시간 문자열 (예: "4m 10s")
pub fn format_remaining(unblock_time: i64, now: i64) -> String {
    let left = unblock_time - now;
    if left <= 0 {
        return "expired".to_string();
    }

    let (h, m, s) = (left / 3600, (left % 3600) / 60, left % 60);
    if h > 0 {
        format!("{}h {}m", h, m)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
