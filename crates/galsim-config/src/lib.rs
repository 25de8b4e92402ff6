pub mod config;
pub mod manager;

pub use config::{
    ClientConfig, Config, ConfigError, ConfigResult, LogLevel, LoggingConfig, ServerConfig,
    SessionConfig,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// 获取 GalSim 配置目录路径
pub fn galsim_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".galsim"))
}

/// 初始化 GalSim 目录结构
pub async fn init_galsim_dirs() -> ConfigResult<()> {
    if let Some(root) = galsim_dir() {
        tokio::fs::create_dir_all(&root).await?;
        tokio::fs::create_dir_all(root.join("logs")).await?;
    }
    Ok(())
}

/// 展开路径中的 ~ 为用户主目录
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir().map(|home| home.join(rest))
    } else {
        Some(PathBuf::from(path))
    }
}
