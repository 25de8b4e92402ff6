use crate::config::{Config, ConfigError, ConfigResult};
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::info;

/// 配置文件的读写入口
///
/// 文件中的 `${VAR}` / `${VAR:-default}` 在加载时展开；写回时保存展开后的值。
pub struct ConfigManager {
    path: PathBuf,
    config: RwLock<Config>,
}

impl ConfigManager {
    /// 加载配置文件，不存在时写入默认配置
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let config = if path.exists() {
            info!("Loading config from {:?}", path);
            let raw = tokio::fs::read_to_string(path).await?;
            let config: Config = serde_json::from_str(&expand_env_vars(&raw)?)?;
            Self::validate(&config)?;
            config
        } else {
            info!("No config at {:?}, writing defaults", path);
            let config = Config::default();
            write_config(path, &config).await?;
            config
        };

        Ok(Self {
            path: path.to_path_buf(),
            config: RwLock::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 当前配置快照
    pub async fn snapshot(&self) -> Config {
        self.config.read().await.clone()
    }

    /// 按点分键读取配置值，如 `session.ttl_secs`
    pub async fn get_value(&self, key: &str) -> ConfigResult<String> {
        self.config
            .read()
            .await
            .get_value(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    /// 按点分键修改配置值，校验通过后落盘；失败时内存与文件都保持原样
    pub async fn set_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let mut config = self.config.write().await;
        let mut candidate = config.clone();
        candidate.set_value(key, value)?;
        Self::validate(&candidate)?;
        write_config(&self.path, &candidate).await?;
        *config = candidate;
        info!("Set {} in {:?}", key, self.path);
        Ok(())
    }

    /// 验证配置
    pub fn validate(config: &Config) -> ConfigResult<()> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        if config.server.port == 0 {
            return invalid("Server port cannot be 0".to_string());
        }

        let base_url = &config.client.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return invalid(format!("Client base_url must be an http(s) URL: {}", base_url));
        }

        if config.client.request_timeout_secs == 0 {
            return invalid("Client request_timeout_secs must be greater than 0".to_string());
        }

        let session = &config.session;
        if session.ttl_secs == 0 || session.cleanup_interval_secs == 0 {
            return invalid(
                "Session ttl_secs and cleanup_interval_secs must be greater than 0".to_string(),
            );
        }
        if session.max_sessions == 0 {
            return invalid("Session max_sessions must be greater than 0".to_string());
        }
        if session.context_window == 0 {
            return invalid("Session context_window must be greater than 0".to_string());
        }
        if !(0..=100).contains(&session.initial_affection) {
            return invalid(format!(
                "Session initial_affection must be within 0..=100, got {}",
                session.initial_affection
            ));
        }

        Ok(())
    }
}

async fn write_config(path: &Path, config: &Config) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, serde_json::to_string_pretty(config)?).await?;
    Ok(())
}

/// 展开 `${VAR}` 与 `${VAR:-default}`；未设置且无默认值时报错
fn expand_env_vars(content: &str) -> ConfigResult<String> {
    let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}")
        .map_err(|e| ConfigError::Validation(format!("Invalid env pattern: {}", e)))?;

    let mut missing = None;
    let expanded = re.replace_all(content, |caps: &Captures| {
        let name = &caps[1];
        std::env::var(name)
            .ok()
            .or_else(|| caps.get(2).map(|d| d.as_str().to_string()))
            .unwrap_or_else(|| {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            })
    });

    match missing {
        Some(name) => Err(ConfigError::EnvVarNotFound(name)),
        None => Ok(expanded.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_gets_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let manager = ConfigManager::load(&config_path).await.unwrap();
        assert!(config_path.exists());
        assert_eq!(manager.path(), config_path.as_path());
        assert_eq!(manager.snapshot().await, Config::default());
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("GALSIM_TEST_PORT", "9100");
        let expanded = expand_env_vars(r#"{"port": ${GALSIM_TEST_PORT}}"#).unwrap();
        assert_eq!(expanded, r#"{"port": 9100}"#);

        let with_default =
            expand_env_vars(r#"{"host": "${GALSIM_TEST_UNSET_HOST:-0.0.0.0}"}"#).unwrap();
        assert_eq!(with_default, r#"{"host": "0.0.0.0"}"#);

        let err = expand_env_vars("${GALSIM_TEST_DEFINITELY_UNSET}").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound(name) if name == "GALSIM_TEST_DEFINITELY_UNSET"));
    }

    #[tokio::test]
    async fn test_load_expands_env_from_file() {
        std::env::set_var("GALSIM_TEST_TTL", "120");
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(
            &config_path,
            r#"{"session": {"ttl_secs": ${GALSIM_TEST_TTL}, "cleanup_interval_secs": 30, "initial_affection": 40, "context_window": 6}}"#,
        )
        .await
        .unwrap();

        let config = ConfigManager::load(&config_path).await.unwrap().snapshot().await;
        assert_eq!(config.session.ttl_secs, 120);
        assert_eq!(config.session.initial_affection, 40);
        assert_eq!(config.session.max_sessions, 10_000);
    }

    #[tokio::test]
    async fn test_set_value_persists() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let manager = ConfigManager::load(&config_path).await.unwrap();

        manager.set_value("session.max_sessions", "25").await.unwrap();
        assert_eq!(manager.get_value("session.max_sessions").await.unwrap(), "25");

        let reloaded = ConfigManager::load(&config_path).await.unwrap();
        assert_eq!(reloaded.snapshot().await.session.max_sessions, 25);
    }

    #[tokio::test]
    async fn test_rejected_update_leaves_file_alone() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let manager = ConfigManager::load(&config_path).await.unwrap();

        let err = manager
            .set_value("session.initial_affection", "150")
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(matches!(
            manager.set_value("session.unknown", "1").await,
            Err(ConfigError::KeyNotFound(_))
        ));
        assert!(matches!(
            manager.get_value("session.unknown").await,
            Err(ConfigError::KeyNotFound(_))
        ));

        let reloaded = ConfigManager::load(&config_path).await.unwrap();
        assert_eq!(reloaded.snapshot().await, Config::default());
        assert_eq!(manager.snapshot().await, Config::default());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        assert!(ConfigManager::validate(&config).is_ok());

        config.session.max_sessions = 0;
        assert!(ConfigManager::validate(&config).is_err());

        config = Config::default();
        config.client.base_url = "ftp://example.com".to_string();
        assert!(ConfigManager::validate(&config).is_err());
    }
}
