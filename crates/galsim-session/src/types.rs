//! # Session Types
//!
//! 服务端持有的会话记录：主题、好感度与按时间顺序追加的对话历史。

use chrono::{DateTime, Utc};
use galsim_core::{Role, SessionInfo};
use serde::{Deserialize, Serialize};

/// 好感度下限
pub const MIN_AFFECTION: i64 = 0;
/// 好感度上限
pub const MAX_AFFECTION: i64 = 100;

/// 历史消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// 创建用户消息
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// 创建角色消息
    pub fn character(content: impl Into<String>) -> Self {
        Self {
            role: Role::Character,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// 会话记录
///
/// `session_id` 与 `theme` 在创建时绑定，之后不再修改；`history` 只追加。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    session_id: String,
    theme: String,
    affection: i64,
    history: Vec<Message>,
    /// 最近一次提供给玩家的选项（每回合整体替换）
    offered_choices: Vec<String>,
    created_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, theme: impl Into<String>, affection: i64) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            theme: theme.into(),
            affection: affection.clamp(MIN_AFFECTION, MAX_AFFECTION),
            history: Vec::new(),
            offered_choices: Vec::new(),
            created_at: now,
            last_accessed: now,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn affection(&self) -> i64 {
        self.affection
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn offered_choices(&self) -> &[String] {
        &self.offered_choices
    }

    /// 替换当前选项
    pub fn offer_choices(&mut self, choices: Vec<String>) {
        self.offered_choices = choices;
    }

    /// 玩家输入对应的选项位置（忽略首尾空白）
    pub fn choice_position(&self, user_input: &str) -> Option<usize> {
        let input = user_input.trim();
        self.offered_choices.iter().position(|c| c.trim() == input)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    /// 追加消息
    pub fn add_message(&mut self, message: Message) {
        self.history.push(message);
        self.touch();
    }

    /// 按增量更新好感度，结果限制在 0..=100
    pub fn apply_affection_delta(&mut self, delta: i64) -> i64 {
        self.affection = self
            .affection
            .saturating_add(delta)
            .clamp(MIN_AFFECTION, MAX_AFFECTION);
        self.touch();
        self.affection
    }

    /// 最近 `window` 条历史，交给对话引擎作为上下文
    pub fn context(&self, window: usize) -> &[Message] {
        let start = self.history.len().saturating_sub(window);
        &self.history[start..]
    }

    /// 更新访问时间
    pub fn touch(&mut self) {
        self.last_accessed = Utc::now();
    }

    /// 空闲时间是否超过 `ttl`
    pub fn is_expired(&self, ttl: std::time::Duration) -> bool {
        match (Utc::now() - self.last_accessed).to_std() {
            Ok(idle) => idle > ttl,
            Err(_) => false,
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id.clone(),
            theme: self.theme.clone(),
            affection: self.affection,
            history_length: self.history.len(),
            created_at: self.created_at,
            last_accessed: self.last_accessed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affection_is_clamped() {
        let mut record = SessionRecord::new("s", "theme", 98);
        assert_eq!(record.apply_affection_delta(3), 100);
        assert_eq!(record.apply_affection_delta(-1), 99);

        let mut low = SessionRecord::new("s", "theme", 1);
        assert_eq!(low.apply_affection_delta(-3), 0);
    }

    #[test]
    fn test_context_window() {
        let mut record = SessionRecord::new("s", "theme", 50);
        for i in 0..15 {
            record.add_message(Message::user(format!("line {}", i)));
        }
        let context = record.context(10);
        assert_eq!(context.len(), 10);
        assert_eq!(context[0].content, "line 5");
        assert_eq!(record.history().len(), 15);
        assert_eq!(record.context(100).len(), 15);
    }

    #[test]
    fn test_offered_choices_replaced_wholesale() {
        let mut record = SessionRecord::new("s", "theme", 50);
        record.offer_choices(vec!["Wave".into(), "Bow".into()]);
        assert_eq!(record.choice_position(" Bow "), Some(1));

        record.offer_choices(vec!["Leave".into()]);
        assert_eq!(record.choice_position("Bow"), None);
        assert_eq!(record.offered_choices(), ["Leave".to_string()]);
    }

    #[test]
    fn test_info_snapshot() {
        let mut record = SessionRecord::new("s-42", "Seaside town", 50);
        record.add_message(Message::character("Hi"));
        let info = record.info();
        assert_eq!(info.session_id, "s-42");
        assert_eq!(info.theme, "Seaside town");
        assert_eq!(info.history_length, 1);
    }
}
