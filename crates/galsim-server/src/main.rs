use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use galsim_config::ConfigManager;
use galsim_server::{
    logging::init_logging, run_server, AppState, DialogueService, ScriptedEngine, ServerConfig,
};
use galsim_session::{SessionStore, SessionStoreConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "galsim-server")]
#[command(about = "GalSim dialogue session server")]
#[command(version)]
struct Cli {
    /// Enable debug mode
    #[arg(long, env = "DEBUG", default_value = "false")]
    debug: bool,

    /// Server port (overrides config)
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Log level (overrides config)
    #[arg(long, env = "GALSIM_LOG")]
    log_level: Option<String>,

    /// Config file path
    #[arg(long, env = "GALSIM_CONFIG", default_value = "~/.galsim/config.json")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// 启动服务（默认）
    Serve,
    /// 配置管理命令
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug, Clone)]
enum ConfigCommands {
    /// 获取配置值
    Get {
        /// 配置键 (如: server.port, session.max_sessions)
        key: String,
    },
    /// 设置配置值
    Set {
        /// 配置键 (如: server.port, session.max_sessions)
        key: String,
        /// 配置值
        value: String,
    },
    /// 显示当前配置
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 展开配置文件路径
    let config_path = galsim_config::expand_tilde(&cli.config)
        .unwrap_or_else(|| std::path::PathBuf::from(&cli.config));

    // 初始化 GalSim 目录结构
    if let Err(e) = galsim_config::init_galsim_dirs().await {
        eprintln!("Warning: Failed to init galsim directories: {}", e);
    }

    // 加载配置
    let config_manager = match ConfigManager::load(&config_path).await {
        Ok(cm) => cm,
        Err(e) => {
            eprintln!("Failed to load config from {:?}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    if let Some(Commands::Config(args)) = &cli.command {
        return run_config_command(&config_manager, &args.command).await;
    }

    let config = config_manager.snapshot().await;

    // 初始化日志（CLI 参数覆盖配置文件）
    let log_level = match (&cli.log_level, cli.debug) {
        (Some(level), _) => level.clone(),
        (None, true) => "debug".to_string(),
        (None, false) => config.logging.level.as_filter().to_string(),
    };
    let log_file = config
        .logging
        .file
        .as_deref()
        .and_then(galsim_config::expand_tilde);
    init_logging(&log_level, log_file.as_deref())?;

    tracing::info!("Config loaded from {:?}", config_path);

    let mut server_config = ServerConfig::from(&config.server);
    if let Some(port) = cli.port {
        server_config.port = port;
    }
    if let Some(host) = cli.host {
        server_config.host = host;
    }

    tracing::info!(
        "Starting GalSim server on {}:{}",
        server_config.host,
        server_config.port
    );
    tracing::info!("Session configuration:");
    tracing::info!("  TTL: {}s", config.session.ttl_secs);
    tracing::info!("  Initial affection: {}", config.session.initial_affection);
    tracing::info!("  Context window: {}", config.session.context_window);
    tracing::info!("  Max sessions: {}", config.session.max_sessions);

    if cli.debug {
        tracing::debug!("Debug mode enabled");
        tracing::debug!("  CORS: {}", server_config.cors);
        tracing::debug!("  Cleanup interval: {}s", config.session.cleanup_interval_secs);
    }

    // 会话存储与过期清理
    let store = SessionStore::new(
        SessionStoreConfig::default()
            .with_ttl(Duration::from_secs(config.session.ttl_secs))
            .with_cleanup_interval(Duration::from_secs(config.session.cleanup_interval_secs))
            .with_initial_affection(config.session.initial_affection)
            .with_max_sessions(config.session.max_sessions),
    );
    let cleanup = store.start_cleanup_task();

    let service = DialogueService::new(
        store,
        Arc::new(ScriptedEngine::new()),
        config.session.context_window,
    );

    let result = tokio::select! {
        result = run_server(AppState::new(service, server_config)) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            Ok(())
        }
    };

    cleanup.abort();
    result
}

async fn run_config_command(
    manager: &ConfigManager,
    command: &ConfigCommands,
) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Get { key } => {
            println!("{}", manager.get_value(key).await?);
        }
        ConfigCommands::Set { key, value } => {
            manager.set_value(key, value).await?;
            println!("{} = {} ({})", key, value, manager.path().display());
        }
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&manager.snapshot().await)?);
        }
    }
    Ok(())
}
