//! guard-console
//! 트래픽 통계, 요청 로그, 차단 목록을 주기적으로 갱신해 보여 주는 라이브 콘솔

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use tokio::signal;

mod dashboard;

use guard_console::config;
use guard_console::AdminApi;

use crate::dashboard::Dashboard;

#[derive(Parser, Debug)]
#[clap(name = "guard-console", about = "Live console for the DDoS guard backend", version)]
struct Args {
    /// 구성 파일 경로
    #[clap(short, long, default_value = "/etc/guard-console/console.yaml")]
    config: PathBuf,

    /// 예시 구성 파일을 경로에 쓰고 종료
    #[clap(long, value_name = "PATH")]
    init_config: Option<PathBuf>,

    /// 백엔드 주소 (구성 파일보다 우선)
    #[clap(long)]
    api_url: Option<String>,

    /// 로그 필터 (ip, path, method)
    #[clap(long)]
    filter: Option<String>,

    /// 화면에 보여 줄 최근 로그 수
    #[clap(long, default_value = "10")]
    tail: usize,

    /// 상세 로깅
    #[clap(short, long)]
    verbose: bool,
}

async fn run_console(args: Args) -> Result<()> {
    // 구성 로드
    let mut config = config::load_config(&args.config)
        .context("Failed to load configuration")?;

    if let Some(url) = args.api_url {
        config.api.base_url = url;
    }
    config.validate().context("Invalid configuration")?;

    let api = AdminApi::connect(&config.api)
        .context("Failed to create API client")?;

    info!("Connecting to {}", config.api.base_url);

    let mut dashboard = Dashboard::new(api, &config, args.filter.as_deref(), args.tail);
    dashboard.mount();

    // 종료 신호까지 실행
    dashboard
        .run_until(async {
            match signal::ctrl_c().await {
                Ok(()) => info!("Shutting down gracefully..."),
                Err(err) => error!("Unable to listen for shutdown signal: {}", err),
            }
        })
        .await;

    // 정리
    dashboard.unmount();

    info!("guard-console stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 명령줄 인수 파싱
    let args = Args::parse();

    // 로깅 초기화
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if let Some(path) = &args.init_config {
        config::save_config(&config::create_example_config(), path)
            .with_context(|| format!("Failed to write example config to {}", path.display()))?;
        println!("Example config written to {}", path.display());
        return Ok(());
    }

    if let Err(e) = run_console(args).await {
        error!("Console error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
