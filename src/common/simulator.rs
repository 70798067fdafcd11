//! 공격 시뮬레이터 컨트롤러
//!
//! 플러드와 봇넷 시뮬레이션은 바쁨 플래그 하나를 공유하므로 동시에 하나만 돈다.
//! 요청은 한 번만 보내고 재시도하지 않는다.

use log::{info, warn};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::AdminApi;
use crate::types::{FloodMode, SimulationError, SimulationResult};

/// 플러드 요청 수 범위
pub const FLOOD_COUNT: RangeInclusive<u32> = 1..=100_000;
/// 봇 수 범위
pub const BOT_COUNT: RangeInclusive<u32> = 1..=1_000;
/// 봇당 요청 수 범위
pub const REQUESTS_PER_BOT: RangeInclusive<u32> = 1..=10_000;

type Outcome = Result<SimulationResult, SimulationError>;

/// 바쁨 플래그 점유. 해제는 drop 시점.
struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// 공격 시뮬레이터 컨트롤러
///
/// 복제본끼리 바쁨 플래그와 마지막 결과를 공유한다.
#[derive(Debug, Clone)]
pub struct SimulatorController {
    api: AdminApi,
    busy: Arc<AtomicBool>,
    last: Arc<Mutex<Option<Outcome>>>,
}

impl SimulatorController {
    pub fn new(api: AdminApi) -> Self {
        Self {
            api,
            busy: Arc::new(AtomicBool::new(false)),
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// 요청 플러드 실행
    pub async fn run_flood(&self, count: u32, mode: FloodMode) -> Outcome {
        check_range("count", count, &FLOOD_COUNT)?;
        let _guard = self.acquire()?;

        info!("Starting flood simulation: {} requests ({})", count, mode);
        let outcome = self.api.simulate_flood(count, mode).await.map_err(SimulationError::from);
        self.finish("flood", outcome)
    }

    /// 봇넷 공격 실행
    pub async fn run_ddos(&self, bots: u32, requests_per_bot: u32) -> Outcome {
        check_range("bots", bots, &BOT_COUNT)?;
        check_range("requests_per_bot", requests_per_bot, &REQUESTS_PER_BOT)?;
        let _guard = self.acquire()?;

        info!(
            "Starting botnet simulation: {} bots x {} requests",
            bots, requests_per_bot
        );
        let outcome = self
            .api
            .simulate_ddos(bots, requests_per_bot)
            .await
            .map_err(SimulationError::from);
        self.finish("botnet", outcome)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// 마지막으로 끝난 시뮬레이션 결과 (실행 중이면 없음)
    pub fn last_result(&self) -> Option<Outcome> {
        self.last().clone()
    }

    fn last(&self) -> MutexGuard<'_, Option<Outcome>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self) -> Result<BusyGuard, SimulationError> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SimulationError::Busy)?;
        *self.last() = None;
        Ok(BusyGuard {
            busy: self.busy.clone(),
        })
    }

    fn finish(&self, kind: &str, outcome: Outcome) -> Outcome {
        match &outcome {
            Ok(_) => info!("{} simulation finished", kind),
            Err(e) => warn!("{} simulation failed: {}", kind, e),
        }
        *self.last() = Some(outcome.clone());
        outcome
    }
}

fn check_range(name: &'static str, value: u32, range: &RangeInclusive<u32>) -> Result<(), SimulationError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(SimulationError::OutOfRange {
            name,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}
