//! 트래픽 통계 뷰 모델
//! 차트용 시계열과 최신 스냅샷을 주기적으로 갱신

use log::{debug, info};
use std::time::Duration;

use crate::api::StatsResponse;
use crate::client::AdminApi;
use crate::config::PollingConfig;
use crate::poller::Poller;
use crate::types::{ApiError, TrafficSnapshot};

/// 한 번의 통계 조회 결과
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficReport {
    pub latest: TrafficSnapshot,
    /// 오래된 것부터 정렬
    pub history: Vec<TrafficSnapshot>,
}

impl TrafficReport {
    /// 응답 본문을 정규화
    ///
    /// 백엔드는 최신순으로 주므로 시간 오름차순으로 다시 정렬한다.
    /// 타임스탬프가 없는 행은 맨 앞에 둔다.
    pub fn from_wire(wire: StatsResponse) -> Self {
        let mut history: Vec<TrafficSnapshot> = wire
            .history
            .unwrap_or_default()
            .into_iter()
            .map(TrafficSnapshot::from)
            .collect();
        history.sort_by_key(|snap| snap.timestamp);

        Self {
            latest: wire.latest.map(TrafficSnapshot::from).unwrap_or_default(),
            history,
        }
    }
}

/// 트래픽 통계 뷰 모델
#[derive(Debug)]
pub struct TrafficStatsView {
    api: AdminApi,
    window_minutes: u32,
    every: Duration,
    mounted: bool,
    poller: Poller<TrafficReport>,
}

impl TrafficStatsView {
    pub fn new(api: AdminApi, polling: &PollingConfig) -> Self {
        Self {
            api,
            window_minutes: polling.stats_window_minutes,
            every: polling.stats_interval(),
            mounted: false,
            poller: Poller::new("traffic stats"),
        }
    }

    /// 폴링 시작
    pub fn mount(&mut self) {
        let api = self.api.clone();
        let minutes = self.window_minutes;
        self.poller.start(self.every, move || {
            let api = api.clone();
            async move { api.traffic_stats(minutes).await }
        });
        self.mounted = true;
    }

    /// 폴링 중지. 진행 중인 조회 결과는 반영되지 않는다.
    pub fn unmount(&mut self) {
        self.poller.stop();
        self.mounted = false;
    }

    /// 조회 범위 변경 (마운트 상태면 새 범위로 다시 시작)
    pub fn set_window(&mut self, minutes: u32) {
        if minutes == 0 || minutes == self.window_minutes {
            return;
        }
        info!("Traffic window changed to {} minutes", minutes);
        self.window_minutes = minutes;
        if self.mounted {
            self.mount();
        }
    }

    pub fn window_minutes(&self) -> u32 {
        self.window_minutes
    }

    /// 다음 갱신까지 대기
    pub async fn next_update(&mut self) -> Result<(), ApiError> {
        let report = self.poller.recv().await?;
        debug!(
            "Traffic stats updated: {} requests, {} history rows",
            report.latest.total_requests,
            report.history.len()
        );
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

    /// 최신 스냅샷 (아직 받은 것이 없으면 0)
    pub fn latest(&self) -> TrafficSnapshot {
        self.poller
            .latest()
            .map(|report| report.latest.clone())
            .unwrap_or_default()
    }

    pub fn history(&self) -> &[TrafficSnapshot] {
        self.poller
            .latest()
            .map(|report| report.history.as_slice())
            .unwrap_or(&[])
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.poller.last_error()
    }

    /// 첫 결과를 기다리는 중인지
    pub fn is_loading(&self) -> bool {
        self.mounted && self.poller.latest().is_none() && self.poller.last_error().is_none()
    }
}
