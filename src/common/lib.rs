// guard-console common library
// CLI와 라이브 콘솔이 공유하는 API 클라이언트, 폴러, 뷰 모델

pub mod api;
pub mod client;
pub mod config;
pub mod logs;
pub mod poller;
pub mod registry;
pub mod rules;
pub mod simulator;
pub mod testing;
pub mod traffic;
pub mod types;
pub mod utils;

pub use client::{AdminApi, ApiClient, Transport};
pub use config::ConsoleConfig;
pub use types::{ApiError, FloodMode, IpRecord, LogEntry, Registry, RuleConfig, RuleField, SimulationResult};

/// guard-console 버전 정보
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
