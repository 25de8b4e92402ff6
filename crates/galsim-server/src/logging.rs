//! 结构化日志初始化

use std::path::Path;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 构建环境过滤器，`RUST_LOG` 优先于配置中的级别
fn build_filter(level: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| anyhow::anyhow!("Invalid log level {:?}: {}", level, e)),
    }
}

/// 初始化日志系统；指定 `file` 时追加写入该文件，否则输出到 stderr
pub fn init_logging(level: &str, file: Option<&Path>) -> anyhow::Result<()> {
    let filter = build_filter(level)?;
    let registry = tracing_subscriber::registry().with(filter);

    match file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(std::sync::Mutex::new(file));
            registry.with(layer).try_init()?;
        }
        None => {
            let layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr);
            registry.with(layer).try_init()?;
        }
    }

    tracing::debug!("Logging initialized with level: {}", level);
    Ok(())
}
