//! 로그 스트림 뷰 모델
//! 최근 요청 로그를 주기적으로 통째로 교체하고, 클라이언트 쪽에서 필터링

use log::debug;
use std::time::Duration;

use crate::client::AdminApi;
use crate::config::PollingConfig;
use crate::poller::Poller;
use crate::types::{ApiError, LogEntry};

/// 로그 스트림 뷰 모델
#[derive(Debug)]
pub struct LogStreamView {
    api: AdminApi,
    limit: u32,
    every: Duration,
    filter: String,
    poller: Poller<Vec<LogEntry>>,
}

impl LogStreamView {
    pub fn new(api: AdminApi, polling: &PollingConfig) -> Self {
        Self {
            api,
            limit: polling.log_limit,
            every: polling.logs_interval(),
            filter: String::new(),
            poller: Poller::new("recent logs"),
        }
    }

    /// 폴링 시작
    pub fn mount(&mut self) {
        let api = self.api.clone();
        let limit = self.limit;
        self.poller.start(self.every, move || {
            let api = api.clone();
            async move { api.recent_logs(limit).await }
        });
    }

    pub fn unmount(&mut self) {
        self.poller.stop();
    }

    /// 수동 새로고침 (주기를 처음부터 다시 시작)
    pub fn refresh(&mut self) {
        self.mount();
    }

    /// 다음 갱신까지 대기
    pub async fn next_update(&mut self) -> Result<(), ApiError> {
        let logs = self.poller.recv().await?;
        debug!("Log buffer replaced with {} entries", logs.len());
        Ok(())
    }

    /// 이미 도착한 갱신을 반영 (대기하지 않음)
    pub fn sync(&mut self) -> bool {
        let mut updated = false;
        while let Some(outcome) = self.poller.try_recv() {
            updated |= outcome.is_ok();
        }
        updated
    }

    /// 필터 문자열 설정. 네트워크 요청은 일어나지 않는다.
    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// 마지막으로 받은 전체 버퍼
    pub fn entries(&self) -> &[LogEntry] {
        self.poller.latest().map(Vec::as_slice).unwrap_or(&[])
    }

    /// 필터를 통과한 항목
    pub fn filtered(&self) -> Vec<&LogEntry> {
        self.entries()
            .iter()
            .filter(|entry| entry.matches(&self.filter))
            .collect()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.poller.last_error()
    }
}
