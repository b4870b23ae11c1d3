//! Secure Data Monitor CLI
//!
//! 监控大屏的终端客户端：OTP 登录 → 摄像头网格 + 实时告警

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use secure_data_monitor::{
    auth::{interactive_login, shared_session, ApiClient, SharedSession, UserModel},
    classify, shared_store, ChannelOptions, Config, PushChannel,
    tui,
};

#[derive(Parser)]
#[command(name = "sdm")]
#[command(about = "Secure Data Monitor - 监控大屏终端客户端")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 登录并进入监控大屏（默认命令）
    Dashboard {
        /// 跳过交互登录，直接使用该 access token
        #[arg(long)]
        token: Option<String>,
    },
    /// 只执行 OTP 登录并打印 access token
    Login,
    /// 无界面模式：把推送通道的检测事件打印到标准输出
    Events {
        /// 跳过交互登录，直接使用该 access token
        #[arg(long)]
        token: Option<String>,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load();

    match cli.command.unwrap_or(Commands::Dashboard { token: None }) {
        Commands::Dashboard { token } => {
            // TUI 占用终端，日志写到缓存目录下的文件
            init_file_logging()?;
            run_dashboard(&config, token).await
        }
        Commands::Login => {
            init_stderr_logging();
            run_login(&config).await
        }
        Commands::Events { token, json } => {
            init_stderr_logging();
            run_events(&config, token, json).await
        }
    }
}

/// 建立会话：有现成 token 直接用，否则走交互登录
async fn establish_session(
    config: &Config,
    api: &mut ApiClient,
    session: &SharedSession,
    token: Option<String>,
) -> Result<()> {
    match token {
        Some(token) => {
            api.set_access_token(&token);
            session
                .write()
                .expect("session lock poisoned")
                .set_authenticated(&token, UserModel::from_identifier("operator@local"));
        }
        None => {
            interactive_login(config, api, session).await?;
        }
    }
    Ok(())
}

fn channel_options(config: &Config) -> ChannelOptions {
    ChannelOptions {
        ws_base_url: config.ws_base_url.clone(),
        accept_event_type: config.accept_event_type.clone(),
        reconnect_delay: config.reconnect_delay,
    }
}

async fn run_dashboard(config: &Config, token: Option<String>) -> Result<()> {
    let session = shared_session();
    let mut api = ApiClient::new(&config.api_base_url);
    establish_session(config, &mut api, &session, token).await?;

    let store = shared_store(config.store_cap);
    let channel = PushChannel::new(session.clone(), store.clone(), channel_options(config));
    let handle = channel.spawn();

    let mut app = tui::App::new(config, store, session);
    let ui_result = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut terminal = tui::init_terminal()?;
        let result = tui::run(&mut terminal, &mut app);
        let restore = tui::restore_terminal();
        result.and(restore)
    })
    .await?;

    // 无论界面如何退出，通道都在这里确定性拆除
    handle.close().await;
    info!("Dashboard closed");
    ui_result
}

async fn run_login(config: &Config) -> Result<()> {
    let session = shared_session();
    let mut api = ApiClient::new(&config.api_base_url);
    let user = interactive_login(config, &mut api, &session).await?;

    let guard = session.read().expect("session lock poisoned");
    println!("operator: {}", user.email);
    println!(
        "access_token: {}",
        guard.access_token().unwrap_or_default()
    );
    Ok(())
}

async fn run_events(config: &Config, token: Option<String>, json: bool) -> Result<()> {
    let session = shared_session();
    let mut api = ApiClient::new(&config.api_base_url);
    establish_session(config, &mut api, &session, token).await?;

    let store = shared_store(config.store_cap);
    let channel = PushChannel::new(session.clone(), store.clone(), channel_options(config));
    let handle = channel.spawn();
    eprintln!("Listening for detection events. Ctrl-C to stop.");

    let mut last_id = 0u64;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                let store = store.lock().expect("store lock poisoned");
                for record in store.records().iter().rev() {
                    if record.id <= last_id {
                        continue;
                    }
                    last_id = record.id;
                    if json {
                        println!("{}", serde_json::to_string(record)?);
                    } else {
                        let severity = classify(record.event.classification.as_deref());
                        println!(
                            "[{}] {} · confidence {}",
                            severity,
                            record.summary(),
                            record.event.confidence_percent()
                        );
                    }
                }
            }
        }
    }

    handle.close().await;
    Ok(())
}

/// TUI 模式：日志写入 `<cache>/secure-data-monitor/sdm.log`
fn init_file_logging() -> Result<()> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("secure-data-monitor");
    fs::create_dir_all(&dir)?;
    let file = fs::File::create(dir.join("sdm.log"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
