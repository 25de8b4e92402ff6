//! 对话引擎接口
//!
//! 引擎只负责生成主题、开场白、角色回应和候选选项；会话状态与好感度由服务层维护。

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use galsim_core::MAX_CHOICES;
use galsim_session::Message;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("engine produced no usable output: {0}")]
    EmptyOutput(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// 一段角色台词与后续选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub choices: Vec<String>,
}

impl Utterance {
    pub fn new(text: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            text: text.into(),
            choices,
        }
    }

    /// 压缩空白、去掉空选项、最多保留 4 个选项
    pub fn normalized(self) -> EngineResult<Self> {
        let text = collapse_whitespace(&self.text);
        if text.is_empty() {
            return Err(EngineError::EmptyOutput("empty character line".to_string()));
        }
        let choices = self
            .choices
            .iter()
            .map(|c| collapse_whitespace(c))
            .filter(|c| !c.is_empty())
            .take(MAX_CHOICES)
            .collect();
        Ok(Self { text, choices })
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 对话引擎
///
/// 选项顺序有意义：第一个选项最讨角色喜欢，最后一个最冒犯。
#[async_trait]
pub trait DialogueEngine: Send + Sync {
    /// 选择一个主题（`theme == "auto"` 时调用）
    async fn pick_theme(&self) -> EngineResult<String>;

    /// 开场白
    async fn opening(&self, theme: &str) -> EngineResult<Utterance>;

    /// 根据最近历史和玩家选择生成回应
    async fn reply(
        &self,
        theme: &str,
        context: &[Message],
        user_input: &str,
    ) -> EngineResult<Utterance>;
}

const THEMES: &[&str] = &[
    "Cherry blossoms at the school gate",
    "A chance meeting at the magic academy",
    "Robot companion in a neon future city",
    "Summer festival by the sea",
    "Late nights at the rainy-day bookshop",
];

const OPENING_CHOICES: [&str; MAX_CHOICES] = [
    "Smile and say it's nice to finally meet her",
    "Ask what brought her here today",
    "Shrug and say you're only passing through",
    "Ignore her and look at your phone",
];

const FOLLOW_UPS: &[[&str; MAX_CHOICES]] = &[
    [
        "Tell her you'd love to hear more",
        "Nod and share a story of your own",
        "Change the subject abruptly",
        "Laugh at her for being so earnest",
    ],
    [
        "Offer to walk together for a while",
        "Ask about her favourite place around here",
        "Say you're busy and check the time",
        "Tell her she's being annoying",
    ],
    [
        "Promise to meet again tomorrow",
        "Thank her for today",
        "Say maybe, if you remember",
        "Walk off without saying goodbye",
    ],
];

/// 内置的确定性引擎
///
/// 不依赖外部模型，主题轮换、台词模板化，适合离线运行与测试。
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    next_theme: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn reaction(position: Option<usize>) -> &'static str {
        match position {
            Some(0) => "Her face lights up.",
            Some(1) => "She smiles softly.",
            Some(2) => "She hesitates for a moment.",
            Some(_) => "Her expression turns cold.",
            None => "She tilts her head, curious.",
        }
    }

    /// 玩家选项在剧本中的位置，以及下一组选项所在的行
    fn locate(said: &str) -> (Option<usize>, usize) {
        if let Some(pos) = OPENING_CHOICES.iter().position(|c| *c == said) {
            return (Some(pos), 0);
        }
        FOLLOW_UPS
            .iter()
            .enumerate()
            .find_map(|(row, choices)| {
                choices
                    .iter()
                    .position(|c| *c == said)
                    .map(|pos| (Some(pos), (row + 1) % FOLLOW_UPS.len()))
            })
            .unwrap_or((None, 0))
    }
}

#[async_trait]
impl DialogueEngine for ScriptedEngine {
    async fn pick_theme(&self) -> EngineResult<String> {
        let idx = self.next_theme.fetch_add(1, Ordering::Relaxed) % THEMES.len();
        Ok(THEMES[idx].to_string())
    }

    async fn opening(&self, theme: &str) -> EngineResult<Utterance> {
        Utterance::new(
            format!(
                "Oh! You must be new here. Welcome to \"{}\". I'm Hikari, nice to meet you.",
                theme
            ),
            OPENING_CHOICES.iter().map(|c| c.to_string()).collect(),
        )
        .normalized()
    }

    async fn reply(
        &self,
        theme: &str,
        _context: &[Message],
        user_input: &str,
    ) -> EngineResult<Utterance> {
        let said = user_input.trim();
        let (position, next_row) = Self::locate(said);

        Utterance::new(
            format!(
                "{} \"{}\"... In a place like {}, I didn't expect that.",
                Self::reaction(position),
                said,
                theme
            ),
            FOLLOW_UPS[next_row].iter().map(|c| c.to_string()).collect(),
        )
        .normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_utterance() {
        let utterance = Utterance::new(
            "  Hello\n\n  there  ",
            vec![
                " A  ".into(),
                "".into(),
                "   ".into(),
                "B".into(),
                "C".into(),
                "D".into(),
                "E".into(),
            ],
        )
        .normalized()
        .unwrap();

        assert_eq!(utterance.text, "Hello there");
        assert_eq!(utterance.choices, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_empty_line_rejected() {
        let result = Utterance::new("  ", vec![]).normalized();
        assert!(matches!(result, Err(EngineError::EmptyOutput(_))));
    }

    #[tokio::test]
    async fn test_scripted_engine_rotates_themes() {
        let engine = ScriptedEngine::new();
        let first = engine.pick_theme().await.unwrap();
        let second = engine.pick_theme().await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_scripted_engine_reply() {
        let engine = ScriptedEngine::new();
        let opening = engine.opening("Rainy bookshop").await.unwrap();
        assert_eq!(opening.choices.len(), MAX_CHOICES);
        assert!(opening.text.contains("Rainy bookshop"));

        let context = vec![
            Message::character(opening.text.clone()),
            Message::user(opening.choices[0].clone()),
        ];
        let reply = engine
            .reply("Rainy bookshop", &context, &opening.choices[0])
            .await
            .unwrap();
        assert!(reply.text.starts_with("Her face lights up."));
        assert_eq!(reply.choices.len(), MAX_CHOICES);

        let rude = engine
            .reply("Rainy bookshop", &context, &reply.choices[3])
            .await
            .unwrap();
        assert!(rude.text.starts_with("Her expression turns cold."));
        assert_ne!(rude.choices, reply.choices);

        let free_text = engine
            .reply("Rainy bookshop", &context, "What's your name?")
            .await
            .unwrap();
        assert!(free_text.text.starts_with("She tilts her head"));
    }
}
