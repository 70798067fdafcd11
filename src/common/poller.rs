//! 리소스 폴러
//!
//! 조회 함수를 즉시 한 번, 이후 주기마다 호출하는 취소 가능한 tokio 작업.
//! 결과는 세대 번호와 함께 용량 1의 채널로 돌아오며, 현재 세대가 아닌
//! 결과는 소비 시점에 버려진다. 이전 조회가 끝나지 않았거나 소비되지 않은
//! 결과가 남아 있으면 그 틱은 건너뛴다.

use log::{debug, info, warn};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::types::ApiError;

/// 세대 번호가 붙은 조회 결과
#[derive(Debug)]
struct Tagged<T> {
    generation: u64,
    outcome: Result<T, ApiError>,
}

/// 실행 중인 폴링 주기
struct Cycle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// 리소스 폴러
pub struct Poller<T> {
    name: &'static str,
    generation: u64,
    tx: mpsc::Sender<Tagged<T>>,
    rx: mpsc::Receiver<Tagged<T>>,
    cycle: Option<Cycle>,
    latest: Option<T>,
    last_error: Option<ApiError>,
}

impl<T> std::fmt::Debug for Poller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("name", &self.name)
            .field("generation", &self.generation)
            .field("running", &self.cycle.is_some())
            .finish()
    }
}

impl<T: Send + 'static> Poller<T> {
    pub fn new(name: &'static str) -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            name,
            generation: 0,
            tx,
            rx,
            cycle: None,
            latest: None,
            last_error: None,
        }
    }

    /// 주기적 폴링 시작
    ///
    /// 실행 중인 주기가 있으면 먼저 멈춘다. 첫 조회는 즉시 일어난다.
    pub fn start<F, Fut>(&mut self, every: Duration, fetch: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        self.stop();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_cycle(
            self.name,
            self.generation,
            every,
            fetch,
            self.tx.clone(),
            cancel.clone(),
        ));
        info!("{} poller started (generation {}, every {:?})", self.name, self.generation, every);

        self.cycle = Some(Cycle { cancel, handle });
    }

    /// 한 번만 조회 (주기 없음)
    ///
    /// 새 세대로 시작하므로 이전 주기의 결과는 더 이상 반영되지 않는다.
    pub fn fetch_once<Fut>(&mut self, fetch: Fut)
    where
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        self.stop();

        let name = self.name;
        let generation = self.generation;
        let tx = self.tx.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                outcome = fetch => outcome,
            };
            if let Err(e) = &outcome {
                warn!("{} fetch failed: {}", name, e);
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tx.send(Tagged { generation, outcome }) => {}
            }
        });
        debug!("{} one-shot fetch issued (generation {})", self.name, generation);

        self.cycle = Some(Cycle { cancel, handle });
    }

    /// 폴링 중지
    ///
    /// 여러 번 호출해도 안전하다. 호출 이후 도착하는 결과는 모두 버려진다.
    pub fn stop(&mut self) {
        self.generation += 1;
        if let Some(cycle) = self.cycle.take() {
            cycle.cancel.cancel();
            info!("{} poller stopped", self.name);
        }
    }

    /// 중지하고 보관 중인 결과도 비운다
    pub fn reset(&mut self) {
        self.stop();
        self.latest = None;
        self.last_error = None;
    }

    /// 다음 현재 세대 결과를 기다린다
    ///
    /// 멈춘 폴러나 이미 결과를 넘겨준 단발 조회에서는 다음 `start`/`fetch_once`
    /// 결과가 올 때까지 대기한다. `select!` 루프에서는 그 뷰가 끼어들지 않을 뿐이다.
    pub async fn recv(&mut self) -> Result<&T, ApiError> {
        loop {
            // 송신측을 폴러가 쥐고 있으므로 채널은 닫히지 않는다
            let Some(tagged) = self.rx.recv().await else {
                return std::future::pending().await;
            };
            if tagged.generation != self.generation {
                self.discard(tagged.generation);
                continue;
            }
            return self.settle(tagged.outcome);
        }
    }

    /// 이미 도착한 현재 세대 결과가 있으면 반영 (대기하지 않음)
    pub fn try_recv(&mut self) -> Option<Result<&T, ApiError>> {
        loop {
            let tagged = self.rx.try_recv().ok()?;
            if tagged.generation != self.generation {
                self.discard(tagged.generation);
                continue;
            }
            return Some(self.settle(tagged.outcome));
        }
    }

    fn discard(&self, stale: u64) {
        debug!(
            "{}: discarding result from generation {} (current {})",
            self.name, stale, self.generation
        );
    }

    fn settle(&mut self, outcome: Result<T, ApiError>) -> Result<&T, ApiError> {
        match outcome {
            Ok(value) => {
                self.last_error = None;
                Ok(&*self.latest.insert(value))
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }
}

impl<T> Poller<T> {
    /// 마지막으로 성공한 결과
    pub fn latest(&self) -> Option<&T> {
        self.latest.as_ref()
    }

    /// 마지막 조회가 실패했다면 그 에러
    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 주기(또는 단발 조회)가 살아 있는지
    pub fn is_running(&self) -> bool {
        self.cycle.as_ref().is_some_and(|c| !c.handle.is_finished())
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        if let Some(cycle) = self.cycle.take() {
            cycle.cancel.cancel();
        }
    }
}

async fn run_cycle<T, F, Fut>(
    name: &'static str,
    generation: u64,
    every: Duration,
    mut fetch: F,
    tx: mpsc::Sender<Tagged<T>>,
    cancel: CancellationToken,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut ticker = time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        debug!("{} poll tick (generation {})", name, generation);

        // 조회가 끝날 때까지 다음 틱을 기다리지 않는다
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = fetch() => outcome,
        };

        if let Err(e) = &outcome {
            warn!("{} poll failed, retrying on next tick: {}", name, e);
        }

        // 소비되지 않은 결과가 있으면 자리가 날 때까지 다음 조회를 미룬다
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = tx.send(Tagged { generation, outcome }) => sent,
        };
        if sent.is_err() {
            break;
        }
    }
}
