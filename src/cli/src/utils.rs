//! 유틸리티 모듈
//! 입력 검증과 출력 형식 변환

use anyhow::{anyhow, Result};
use ipnet::IpNet;
use std::io::{BufRead, Write};
use std::net::IpAddr;

use guard_console::types::{IpRecord, LogEntry, Registry, SimulationResult, TrafficSnapshot};
use guard_console::utils::{format_clock, format_epoch, format_remaining};

/// 주소 문자열 검증 (예: "10.0.0.5" 또는 "10.0.0.5/32")
///
/// 단일 호스트만 받는다. 범위(CIDR)는 백엔드가 다루지 않는다.
pub fn parse_address(s: &str) -> Result<String> {
    let s = s.trim();

    if let Ok(addr) = s.parse::<IpAddr>() {
        return Ok(addr.to_string());
    }

    match s.parse::<IpNet>() {
        Ok(net) if net.prefix_len() == net.max_prefix_len() => Ok(net.addr().to_string()),
        Ok(net) => Err(anyhow!("Address ranges are not supported: {}", net)),
        Err(_) => Err(anyhow!("Invalid IP address: {}", s)),
    }
}

/// 예/아니오 확인
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<bool> {
    write!(output, "{} [y/N] ", prompt)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// 트래픽 스냅샷 요약
pub fn snapshot_lines(snap: &TrafficSnapshot, samples: usize, minutes: u32) -> Vec<String> {
    vec![
        format!("Timestamp: {}", format_clock(snap.timestamp)),
        format!("Total requests: {}", snap.total_requests),
        format!("Blocked requests: {}", snap.blocked_requests),
        format!("Suspicious requests: {}", snap.suspicious_requests),
        format!("Avg latency: {:.2} ms", snap.avg_latency),
        format!("History: {} samples over the last {} minutes", samples, minutes),
    ]
}

/// 로그 한 줄
pub fn log_line(entry: &LogEntry) -> String {
    let latency = entry
        .process_time_ms
        .map(|ms| format!("{:.1}ms", ms))
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{} {:<15} {:<6} {:<30} {:>3} {:>8}",
        format_clock(entry.timestamp),
        entry.ip,
        entry.method,
        entry.path,
        entry.status_code,
        latency
    );
    if let Some(verdict) = &entry.verdict {
        line.push_str(&format!("  [{}]", verdict));
    }
    line
}

/// 레지스트리 표
pub fn registry_lines(registry: Registry, records: &[IpRecord], now: i64) -> Vec<String> {
    let mut lines = Vec::with_capacity(records.len() + 2);

    match registry {
        Registry::Blocked => {
            lines.push(format!("{:<40} {:<20} {:<10}", "IP", "UNBLOCK AT", "REMAINING"));
            lines.push("-".repeat(72));
            for record in records {
                let (at, left) = match record.unblock_time {
                    Some(t) => (format_epoch(t), format_remaining(t, now)),
                    None => ("-".to_string(), "-".to_string()),
                };
                lines.push(format!("{:<40} {:<20} {:<10}", record.ip, at, left));
            }
        }
        Registry::Blacklist => {
            lines.push(format!("{:<40} {}", "IP", "REASON"));
            lines.push("-".repeat(72));
            for record in records {
                lines.push(format!("{:<40} {}", record.ip, record.reason.as_deref().unwrap_or("-")));
            }
        }
        Registry::Whitelist => {
            lines.push("IP".to_string());
            lines.push("-".repeat(40));
            for record in records {
                lines.push(record.ip.clone());
            }
        }
    }

    lines
}

/// 시뮬레이션 결과 요약
pub fn simulation_lines(result: &SimulationResult) -> Vec<String> {
    let mut lines = Vec::new();

    match result {
        SimulationResult::Flood {
            requests,
            mode,
            message,
            sample_ips,
        } => {
            lines.push("Traffic Simulation Complete".to_string());
            lines.push(format!("Requests: {} ({})", requests, mode));
            if let Some(message) = message {
                lines.push(message.clone());
            }
            if !sample_ips.is_empty() {
                lines.push(format!("Sample sources: {}", sample_ips.join(", ")));
            }
        }
        SimulationResult::Ddos {
            total_requests,
            blocked_count,
            attacking_ips,
            sample_ips,
        } => {
            let rate = if *total_requests > 0 {
                *blocked_count as f64 * 100.0 / *total_requests as f64
            } else {
                0.0
            };
            lines.push("DDoS Simulation Report".to_string());
            lines.push(format!("Attacking IPs: {}", attacking_ips));
            lines.push(format!("Total requests: {}", total_requests));
            lines.push(format!("Blocked: {} ({:.1}%)", blocked_count, rate));
            if !sample_ips.is_empty() {
                lines.push(format!("Sample sources: {}", sample_ips.join(", ")));
            }
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("192.168.1.1").unwrap(), "192.168.1.1");
        assert_eq!(parse_address(" 10.0.0.5/32 ").unwrap(), "10.0.0.5");
        assert_eq!(parse_address("2001:db8::1").unwrap(), "2001:db8::1");
        assert!(parse_address("10.0.0.0/8").is_err());
        assert!(parse_address("256.168.1.1").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn test_confirm() {
        let mut out = Vec::new();
        assert!(confirm(&mut Cursor::new("y\n"), &mut out, "Remove?").unwrap());
        assert!(confirm(&mut Cursor::new("YES\n"), &mut out, "Remove?").unwrap());
        assert!(!confirm(&mut Cursor::new("\n"), &mut out, "Remove?").unwrap());
        assert!(!confirm(&mut Cursor::new(""), &mut out, "Remove?").unwrap());
        assert!(String::from_utf8(out).unwrap().starts_with("Remove? [y/N]"));
    }

    #[test]
    fn test_registry_lines() {
        let records = vec![IpRecord {
            ip: "10.0.0.5".to_string(),
            reason: Some("abuse".to_string()),
            unblock_time: None,
        }];
        let lines = registry_lines(Registry::Blacklist, &records, 0);
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with("abuse"));

        let blocked = vec![IpRecord {
            ip: "10.0.0.6".to_string(),
            reason: None,
            unblock_time: Some(1_000),
        }];
        let lines = registry_lines(Registry::Blocked, &blocked, 940);
        assert!(lines[2].contains("1m 0s"));
    }

    #[test]
    fn test_ddos_block_rate() {
        let lines = simulation_lines(&SimulationResult::Ddos {
            total_requests: 200,
            blocked_count: 150,
            attacking_ips: 4,
            sample_ips: vec![],
        });
        assert!(lines.contains(&"Blocked: 150 (75.0%)".to_string()));
    }
}
