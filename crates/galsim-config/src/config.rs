use serde::{Deserialize, Serialize};

/// 主配置结构体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            server: ServerConfig::default(),
            client: ClientConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// 获取配置值的快捷方法
    pub fn get_value(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["version"] => Some(self.version.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),
            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "cors"] => Some(self.server.cors.to_string()),
            ["client", "base_url"] => Some(self.client.base_url.clone()),
            ["client", "request_timeout_secs"] => {
                Some(self.client.request_timeout_secs.to_string())
            }
            ["session", "ttl_secs"] => Some(self.session.ttl_secs.to_string()),
            ["session", "cleanup_interval_secs"] => {
                Some(self.session.cleanup_interval_secs.to_string())
            }
            ["session", "initial_affection"] => Some(self.session.initial_affection.to_string()),
            ["session", "context_window"] => Some(self.session.context_window.to_string()),
            ["session", "max_sessions"] => Some(self.session.max_sessions.to_string()),
            ["logging", "level"] => Some(format!("{:?}", self.logging.level)),
            ["logging", "file"] => self.logging.file.clone(),
            _ => None,
        }
    }

    /// 设置配置值
    pub fn set_value(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["server", "port"] => {
                self.server.port = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid port number: {}", value))
                })?;
            }
            ["server", "host"] => {
                self.server.host = value.to_string();
            }
            ["server", "cors"] => {
                self.server.cors = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid boolean: {}", value))
                })?;
            }
            ["client", "base_url"] => {
                self.client.base_url = value.trim_end_matches('/').to_string();
            }
            ["client", "request_timeout_secs"] => {
                self.client.request_timeout_secs = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["session", "ttl_secs"] => {
                self.session.ttl_secs = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["session", "cleanup_interval_secs"] => {
                self.session.cleanup_interval_secs = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["session", "initial_affection"] => {
                self.session.initial_affection = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["session", "context_window"] => {
                self.session.context_window = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["session", "max_sessions"] => {
                self.session.max_sessions = value.parse().map_err(|_| {
                    ConfigError::Validation(format!("Invalid number: {}", value))
                })?;
            }
            ["logging", "level"] => {
                self.logging.level = value.parse()?;
            }
            ["logging", "file"] => {
                self.logging.file = Some(value.to_string());
            }
            _ => return Err(ConfigError::KeyNotFound(key.to_string())),
        }
        Ok(())
    }
}

/// Server 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "127.0.0.1".to_string(),
            cors: true,
        }
    }
}

/// 客户端配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// 服务地址 (e.g., "http://127.0.0.1:8000")
    pub base_url: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// 会话配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// 空闲超时（秒）
    pub ttl_secs: u64,
    /// 过期清理间隔（秒）
    pub cleanup_interval_secs: u64,
    /// 初始好感度
    pub initial_affection: i64,
    /// 交给对话引擎的最近历史条数
    pub context_window: usize,
    /// 同时存活的会话上限
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            cleanup_interval_secs: 300,
            initial_affection: 50,
            context_window: 10,
            max_sessions: 10_000,
        }
    }
}

/// 日志级别
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// 转换为 tracing / env_logger 过滤字符串
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::Validation(format!("Invalid log level: {}", s))),
        }
    }
}

/// Logging 配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.client.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.session.initial_affection, 50);
        assert_eq!(config.session.ttl_secs, 3600);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"server": {"port": 9100, "host": "0.0.0.0", "cors": false}}"#)
                .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.session, SessionConfig::default());

        let config: Config =
            serde_json::from_str(r#"{"session": {"ttl_secs": 60}}"#).unwrap();
        assert_eq!(config.session.ttl_secs, 60);
        assert_eq!(config.session.max_sessions, 10_000);
    }

    #[test]
    fn test_get_and_set_value() {
        let mut config = Config::default();
        config.set_value("client.base_url", "http://localhost:9000/").unwrap();
        assert_eq!(
            config.get_value("client.base_url").as_deref(),
            Some("http://localhost:9000")
        );

        config.set_value("logging.level", "warning").unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);

        assert!(matches!(
            config.set_value("server.port", "not-a-port"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            config.set_value("nope.key", "1"),
            Err(ConfigError::KeyNotFound(_))
        ));
    }
}
