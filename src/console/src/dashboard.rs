//! 대시보드 모듈
//! 통계, 로그, 차단 목록 뷰를 함께 돌리며 갱신될 때마다 요약을 출력

use log::{debug, warn};
use std::collections::HashSet;
use std::future::Future;

use guard_console::config::ConsoleConfig;
use guard_console::logs::LogStreamView;
use guard_console::registry::{RegistryView, EMPTY_MESSAGE};
use guard_console::traffic::TrafficStatsView;
use guard_console::types::{ApiError, LogEntry};
use guard_console::utils::{current_time_secs, format_clock, format_remaining};
use guard_console::AdminApi;

/// 라이브 대시보드
pub struct Dashboard {
    traffic: TrafficStatsView,
    logs: LogStreamView,
    blocked: RegistryView,
    /// 화면에 보여 줄 최근 로그 수
    log_tail: usize,
    /// 직전 갱신의 로그 렌더링 키
    seen_logs: HashSet<String>,
    new_logs: usize,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("log_tail", &self.log_tail)
            .finish()
    }
}

/// 어느 뷰가 갱신되었는지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Panel {
    Traffic,
    Logs,
    Blocked,
}

impl Dashboard {
    pub fn new(api: AdminApi, config: &ConsoleConfig, filter: Option<&str>, log_tail: usize) -> Self {
        let mut logs = LogStreamView::new(api.clone(), &config.polling);
        if let Some(filter) = filter {
            logs.set_filter(filter);
        }

        Self {
            traffic: TrafficStatsView::new(api.clone(), &config.polling),
            logs,
            blocked: RegistryView::new(api, &config.polling),
            log_tail,
            seen_logs: HashSet::new(),
            new_logs: 0,
        }
    }

    pub fn mount(&mut self) {
        self.traffic.mount();
        self.logs.mount();
        self.blocked.mount();
    }

    /// 모든 폴러 중지
    pub fn unmount(&mut self) {
        self.traffic.unmount();
        self.logs.unmount();
        self.blocked.unmount();
    }

    /// 종료 신호가 올 때까지 갱신을 출력
    pub async fn run_until<F: Future>(&mut self, shutdown: F) {
        tokio::pin!(shutdown);

        loop {
            let (panel, update) = tokio::select! {
                _ = &mut shutdown => break,
                update = self.traffic.next_update() => (Panel::Traffic, update),
                update = self.logs.next_update() => (Panel::Logs, update),
                update = self.blocked.next_update() => (Panel::Blocked, update),
            };

            match update {
                Ok(()) => {
                    debug!("{:?} panel refreshed", panel);
                    if panel == Panel::Logs {
                        self.track_new_logs();
                    }
                    self.print(panel);
                }
                Err(e) => self.report(panel, &e),
            }
        }
    }

    /// 버퍼는 매번 통째로 바뀌므로 렌더링 키로 새 항목 수를 센다
    fn track_new_logs(&mut self) {
        let keys: HashSet<String> = self.logs.entries().iter().map(LogEntry::render_key).collect();
        self.new_logs = keys.difference(&self.seen_logs).count();
        self.seen_logs = keys;
    }

    fn report(&self, panel: Panel, err: &ApiError) {
        // 폴러는 다음 주기에 다시 시도한다
        warn!("{:?} panel refresh failed: {}", panel, err);
        if err.is_transport() {
            println!("[{:?}] backend unreachable, retrying", panel);
        }
    }

    fn print(&self, panel: Panel) {
        for line in self.render(panel) {
            println!("{}", line);
        }
    }

    fn render(&self, panel: Panel) -> Vec<String> {
        match panel {
            Panel::Traffic => {
                let snap = self.traffic.latest();
                vec![format!(
                    "[traffic {}] total {} | blocked {} | suspicious {} | latency {:.1} ms | {} samples",
                    format_clock(snap.timestamp),
                    snap.total_requests,
                    snap.blocked_requests,
                    snap.suspicious_requests,
                    snap.avg_latency,
                    self.traffic.history().len()
                )]
            }
            Panel::Logs => {
                let entries = self.logs.filtered();
                let mut lines = vec![format!(
                    "[logs] {} entries, {} new ({} shown after filter)",
                    self.logs.entries().len(),
                    self.new_logs,
                    entries.len()
                )];
                lines.extend(entries.iter().take(self.log_tail).map(|entry| {
                    format!(
                        "  {} {} {} {} -> {}",
                        format_clock(entry.timestamp),
                        entry.ip,
                        entry.method,
                        entry.path,
                        entry.status_code
                    )
                }));
                lines
            }
            Panel::Blocked => {
                if self.blocked.is_empty() {
                    return vec![format!("[blocked] {}", EMPTY_MESSAGE)];
                }
                let now = current_time_secs();
                let mut lines = vec![format!("[blocked] {} addresses", self.blocked.entries().len())];
                lines.extend(self.blocked.entries().iter().map(|record| match record.unblock_time {
                    Some(t) => format!("  {} ({} left)", record.ip, format_remaining(t, now)),
                    None => format!("  {}", record.ip),
                }));
                lines
            }
        }
    }
}
