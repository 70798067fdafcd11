//! 테스트 유틸리티
//!
//! 네트워크 없이 뷰 모델을 돌려 볼 수 있는 인메모리 전송 계층.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::client::{AdminApi, Transport};
use crate::types::ApiError;

/// 기록된 요청
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    /// 쿼리 문자열 포함
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct Route {
    queued: VecDeque<Result<Value, ApiError>>,
    fallback: Option<Result<Value, ApiError>>,
}

#[derive(Default)]
struct Script {
    routes: HashMap<(Method, String), Route>,
    gates: HashMap<(Method, String), watch::Receiver<bool>>,
    requests: Vec<RecordedRequest>,
}

/// 요청을 막아 두는 관문
///
/// `open()` 전까지 해당 경로의 요청은 응답하지 않는다.
#[derive(Debug)]
pub struct Gate {
    tx: watch::Sender<bool>,
}

impl Gate {
    pub fn open(&self) {
        let _ = self.tx.send(true);
    }
}

/// 경로별로 미리 정해 둔 응답을 돌려주는 전송 계층
///
/// 경로는 쿼리 문자열을 뺀 부분으로 맞춘다. 응답은 요청이 들어온 순서대로
/// 정해지고, 관문이 있으면 그 뒤에 전달된다.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 이 전송 계층을 쓰는 API 핸들
    pub fn api(self: &Arc<Self>) -> AdminApi {
        AdminApi::new(self.clone())
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 이후 모든 요청에 같은 응답
    pub fn respond(&self, method: Method, path: &str, body: Value) {
        let key = (method, path.to_string());
        self.script().routes.entry(key).or_default().fallback = Some(Ok(body));
    }

    /// 다음 요청 한 번에만 쓰는 응답
    pub fn respond_once(&self, method: Method, path: &str, body: Value) {
        let key = (method, path.to_string());
        self.script().routes.entry(key).or_default().queued.push_back(Ok(body));
    }

    /// 이후 모든 요청을 실패시킨다
    pub fn fail(&self, method: Method, path: &str, error: ApiError) {
        let key = (method, path.to_string());
        self.script().routes.entry(key).or_default().fallback = Some(Err(error));
    }

    pub fn fail_once(&self, method: Method, path: &str, error: ApiError) {
        let key = (method, path.to_string());
        self.script().routes.entry(key).or_default().queued.push_back(Err(error));
    }

    /// 경로에 관문 설치
    pub fn gate(&self, method: Method, path: &str) -> Gate {
        let (tx, rx) = watch::channel(false);
        let key = (method, path.to_string());
        self.script().gates.insert(key, rx);
        Gate { tx }
    }

    /// 지금까지 기록된 요청
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script().requests.clone()
    }

    /// 쿼리 문자열을 뺀 경로가 같은 요청 수
    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.script()
            .requests
            .iter()
            .filter(|r| r.method == method && strip_query(&r.path) == path)
            .count()
    }

    pub fn clear_requests(&self) {
        self.script().requests.clear();
    }
}

fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(p, _)| p)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, ApiError> {
        let key = (method.clone(), strip_query(path).to_string());

        let (outcome, gate) = {
            let mut script = self.script();
            script.requests.push(RecordedRequest {
                method,
                path: path.to_string(),
                body,
            });

            let outcome = match script.routes.get_mut(&key) {
                Some(route) => route
                    .queued
                    .pop_front()
                    .or_else(|| route.fallback.clone())
                    .unwrap_or_else(|| Err(unrouted(&key))),
                None => Err(unrouted(&key)),
            };
            (outcome, script.gates.get(&key).cloned())
        };

        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }

        outcome
    }
}

fn unrouted(key: &(Method, String)) -> ApiError {
    ApiError::Status {
        status: 404,
        message: format!("no scripted response for {} {}", key.0, key.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_queued_then_fallback() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::GET, "/admin/rules", json!({"n": 0}));
        transport.respond_once(Method::GET, "/admin/rules", json!({"n": 1}));

        let first = transport.request(Method::GET, "/admin/rules", None).await.unwrap();
        let second = transport.request(Method::GET, "/admin/rules?x=1", None).await.unwrap();
        assert_eq!(first["n"], 1);
        assert_eq!(second["n"], 0);
        assert_eq!(transport.request_count(Method::GET, "/admin/rules"), 2);
        assert_eq!(transport.requests()[1].path, "/admin/rules?x=1");
    }

    #[tokio::test]
    async fn test_unrouted_is_not_found() {
        let transport = ScriptedTransport::new();
        let err = transport.request(Method::POST, "/nowhere", None).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_gate_holds_response_until_opened() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::GET, "/slow", json!({}));
        let gate = transport.gate(Method::GET, "/slow");

        let t = transport.clone();
        let pending = tokio::spawn(async move { t.request(Method::GET, "/slow", None).await });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        gate.open();
        assert!(pending.await.unwrap().is_ok());
    }
}
