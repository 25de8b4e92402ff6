//! # Session Error Types
//!
//! 定义会话存储相关的错误类型。

use thiserror::Error;

/// 会话错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// 会话不存在
    #[error("Session not found: {id}")]
    NotFound { id: String },

    /// 会话已过期
    #[error("Session expired: {id}")]
    Expired { id: String },

    /// 活跃会话数已达上限
    #[error("Session capacity exceeded: {limit}")]
    CapacityExceeded { limit: usize },
}

impl SessionError {
    /// 对客户端而言，过期与不存在没有区别
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Expired { .. })
    }
}

/// 会话结果类型
pub type SessionResult<T> = Result<T, SessionError>;
