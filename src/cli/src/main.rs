//! guard-ctl
//! 보호 규칙, IP 목록, 트래픽 통계, 공격 시뮬레이션을 다루는 CLI 인터페이스

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, error};
use std::io;
use std::path::PathBuf;
use tokio::signal;

mod utils;

use guard_console::config::{self, ConsoleConfig};
use guard_console::logs::LogStreamView;
use guard_console::registry::RegistryView;
use guard_console::rules::{RulesForm, RulesMessage};
use guard_console::simulator::SimulatorController;
use guard_console::traffic::TrafficStatsView;
use guard_console::types::{FloodMode, Registry, RuleField};
use guard_console::utils::current_time_secs;
use guard_console::AdminApi;

use utils::{confirm, log_line, parse_address, registry_lines, simulation_lines, snapshot_lines};

#[derive(Parser, Debug)]
#[clap(name = "guard-ctl", about = "DDoS guard operator tool", version)]
struct Cli {
    /// 백엔드 주소 (구성 파일보다 우선)
    #[clap(long)]
    api_url: Option<String>,

    /// 구성 파일 경로
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// 상세 로깅
    #[clap(short, long)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 트래픽 통계 표시
    Stats {
        /// 조회 범위 (분)
        #[clap(long)]
        minutes: Option<u32>,

        /// Ctrl+C까지 계속 갱신
        #[clap(long)]
        watch: bool,
    },

    /// 최근 요청 로그 표시
    Logs {
        /// 가져올 로그 수
        #[clap(long)]
        limit: Option<u32>,

        /// ip, path, method 중 하나에 포함된 문자열
        #[clap(long)]
        filter: Option<String>,

        /// Ctrl+C까지 계속 갱신
        #[clap(long)]
        follow: bool,
    },

    /// 보호 규칙
    #[clap(subcommand)]
    Rules(RulesCommand),

    /// IP 목록 관리
    #[clap(subcommand)]
    Ip(IpCommand),

    /// 공격 시뮬레이션
    #[clap(subcommand)]
    Simulate(SimulateCommand),
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// 현재 규칙 표시
    Show,

    /// 규칙 변경 (지정한 필드만)
    Set(RuleArgs),
}

#[derive(Args, Debug)]
struct RuleArgs {
    /// 초당 최대 요청 수
    #[clap(long)]
    max_req_per_sec: Option<String>,

    /// 분당 최대 요청 수
    #[clap(long)]
    max_req_per_min: Option<String>,

    /// 차단 유지 시간 (초)
    #[clap(long)]
    block_duration: Option<String>,

    /// 이상 탐지 임계값
    #[clap(long)]
    anomaly_threshold: Option<String>,
}

impl RuleArgs {
    fn inputs(&self) -> Vec<(RuleField, &str)> {
        [
            (RuleField::MaxReqPerSec, &self.max_req_per_sec),
            (RuleField::MaxReqPerMin, &self.max_req_per_min),
            (RuleField::BlockDuration, &self.block_duration),
            (RuleField::AnomalyThreshold, &self.anomaly_threshold),
        ]
        .into_iter()
        .filter_map(|(field, input)| input.as_deref().map(|v| (field, v)))
        .collect()
    }
}

#[derive(Subcommand, Debug)]
enum IpCommand {
    /// 목록 표시 (blocked, blacklist, whitelist)
    List {
        #[clap(default_value = "blocked")]
        list: Registry,
    },

    /// 블랙리스트/화이트리스트에 추가
    Add {
        list: Registry,

        /// IP 주소
        ip: String,

        /// 사유 (블랙리스트만)
        #[clap(long)]
        reason: Option<String>,
    },

    /// 목록에서 삭제 (blocked는 차단 해제)
    Remove {
        list: Registry,

        /// IP 주소
        ip: String,

        /// 확인 생략
        #[clap(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SimulateCommand {
    /// 요청 플러드
    Flood {
        /// 요청 수 (1-100000)
        #[clap(long, default_value = "1000")]
        count: u32,

        /// 출발지 모드 (random, auto)
        #[clap(long, default_value = "random")]
        mode: FloodMode,
    },

    /// 봇넷 공격
    Ddos {
        /// 봇 수 (1-1000)
        #[clap(long, default_value = "50")]
        bots: u32,

        /// 봇당 요청 수 (1-10000)
        #[clap(long, default_value = "200")]
        requests_per_bot: u32,
    },
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn load_config(cli: &Cli) -> Result<ConsoleConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ConsoleConfig::default(),
    };

    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    let api = AdminApi::connect(&config.api).context("Failed to create API client")?;
    debug!("Using backend at {}", config.api.base_url);

    match cli.command {
        Commands::Stats { minutes, watch } => {
            if let Some(minutes) = minutes {
                config.polling.stats_window_minutes = minutes;
            }
            let window = config.polling.stats_window_minutes;

            if !watch {
                let report = api
                    .traffic_stats(window)
                    .await
                    .context("Failed to fetch traffic stats")?;
                print_lines(snapshot_lines(&report.latest, report.history.len(), window));
                return Ok(());
            }

            println!("Watching traffic stats (press Ctrl+C to exit)...");
            let mut view = TrafficStatsView::new(api, &config.polling);
            view.mount();
            loop {
                tokio::select! {
                    _ = signal::ctrl_c() => break,
                    update = view.next_update() => match update {
                        Ok(()) => {
                            print_lines(snapshot_lines(&view.latest(), view.history().len(), window));
                            println!("{}", "-".repeat(40));
                        }
                        Err(e) => eprintln!("Refresh failed: {}", e),
                    },
                }
            }
            view.unmount();
        }

        Commands::Logs { limit, filter, follow } => {
            if let Some(limit) = limit {
                config.polling.log_limit = limit;
            }

            let mut view = LogStreamView::new(api, &config.polling);
            if let Some(filter) = &filter {
                view.set_filter(filter);
            }
            view.mount();

            if !follow {
                view.next_update().await.context("Failed to fetch recent logs")?;
                print_logs(&view);
                return Ok(());
            }

            println!("Following request logs (press Ctrl+C to exit)...");
            loop {
                tokio::select! {
                    _ = signal::ctrl_c() => break,
                    update = view.next_update() => match update {
                        Ok(()) => print_logs(&view),
                        Err(e) => eprintln!("Refresh failed: {}", e),
                    },
                }
            }
            view.unmount();
        }

        Commands::Rules(RulesCommand::Show) => {
            let mut form = RulesForm::new(api);
            form.load().await.context("Failed to fetch rules")?;
            for field in RuleField::ALL {
                println!("{:<20} {}", field, form.value(field));
            }
        }

        Commands::Rules(RulesCommand::Set(args)) => {
            let inputs = args.inputs();
            if inputs.is_empty() {
                bail!("No rule fields given; see `guard-ctl rules set --help`");
            }

            let mut form = RulesForm::new(api);
            form.load().await.context("Failed to fetch rules")?;
            for (field, input) in inputs {
                form.set_field(field, input)?;
            }

            if !form.is_dirty() {
                println!("Rules already match; nothing to save");
                return Ok(());
            }

            let saved = form.save().await;
            if let Some(message) = form.message() {
                match message {
                    RulesMessage::Success(text) => println!("{}", text),
                    RulesMessage::Error(text) => eprintln!("{}", text),
                }
            }
            saved.context("Failed to update rules")?;
        }

        Commands::Ip(command) => run_ip(api, &config, command).await?,

        Commands::Simulate(command) => {
            let controller = SimulatorController::new(api);
            let result = match command {
                SimulateCommand::Flood { count, mode } => {
                    println!("Sending {} requests ({})...", count, mode);
                    controller.run_flood(count, mode).await
                }
                SimulateCommand::Ddos { bots, requests_per_bot } => {
                    println!("Launching {} bots x {} requests...", bots, requests_per_bot);
                    controller.run_ddos(bots, requests_per_bot).await
                }
            }
            .context("Simulation failed")?;

            print_lines(simulation_lines(&result));
        }
    }

    Ok(())
}

async fn run_ip(api: AdminApi, config: &ConsoleConfig, command: IpCommand) -> Result<()> {
    let mut view = RegistryView::new(api, &config.polling);

    match command {
        IpCommand::List { list } => {
            view.select(list);
            view.mount();
            view.next_update()
                .await
                .with_context(|| format!("Failed to fetch the {} list", list))?;

            if view.is_empty() {
                println!("{}", guard_console::registry::EMPTY_MESSAGE);
            } else {
                print_lines(registry_lines(list, view.entries(), current_time_secs()));
            }
        }

        IpCommand::Add { list, ip, reason } => {
            let ip = parse_address(&ip)?;
            if reason.is_some() && list != Registry::Blacklist {
                bail!("--reason only applies to the blacklist");
            }

            view.select(list);
            view.set_ip_input(&ip);
            view.set_reason_input(reason.as_deref().unwrap_or(""));

            if !view.add().await.with_context(|| format!("Failed to add {} to the {}", ip, list))? {
                return Err(anyhow!("IP address must not be empty"));
            }
            println!("Added {} to the {}", ip, list);
        }

        IpCommand::Remove { list, ip, yes } => {
            let ip = parse_address(&ip)?;

            view.select(list);
            let request = view.prepare_remove(&ip);

            if !yes {
                let stdin = io::stdin();
                let confirmed = confirm(&mut stdin.lock(), &mut io::stdout(), &request.prompt())
                    .context("Failed to read confirmation")?;
                if !confirmed {
                    println!("Cancelled");
                    return Ok(());
                }
            }

            view.remove(request)
                .await
                .with_context(|| format!("Failed to remove {} from the {}", ip, list))?;
            println!("Removed {} from the {}", ip, list);
        }
    }

    view.unmount();
    Ok(())
}

fn print_logs(view: &LogStreamView) {
    let entries = view.filtered();
    if entries.is_empty() {
        println!("No logs found");
        return;
    }
    for entry in entries {
        println!("{}", log_line(entry));
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 명령줄 인수 파싱
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
