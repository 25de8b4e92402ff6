//! 好感度变化规则
//!
//! 优先级：命中上回合的选项位置 > 显式标记（`好感度 +3` / `affection -1`）> 关键词 > 0。

use std::sync::OnceLock;

use galsim_core::MAX_CHOICES;
use regex::Regex;

/// 按选项位置的好感度变化：A +3，B +1，C -1，D -3
pub const POSITION_DELTAS: [i64; MAX_CHOICES] = [3, 1, -1, -3];

/// 单回合好感度变化的绝对值上限
pub const MAX_DELTA: i64 = 3;

const WARM_KEYWORDS: &[&str] = &[
    "亲密", "拥抱", "喜欢", "爱", "支持", "温柔", "关心", "理解", "hug", "love", "support",
    "gentle", "care", "understand", "thank",
];

const COLD_KEYWORDS: &[&str] = &[
    "冷漠", "忽视", "离开", "生气", "愤怒", "讨厌", "ignore", "leave", "angry", "hate",
    "annoying",
];

fn marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:好感度|affection)\s*([+-])\s*(\d+)").expect("marker pattern is valid")
    })
}

/// 计算玩家这句话带来的好感度变化
pub fn affection_delta(offered_position: Option<usize>, user_input: &str) -> i64 {
    if let Some(delta) = offered_position.and_then(|pos| POSITION_DELTAS.get(pos)) {
        return *delta;
    }

    if let Some(caps) = marker_pattern().captures(user_input) {
        let magnitude: i64 = caps[2].parse().unwrap_or(0);
        let magnitude = magnitude.min(MAX_DELTA);
        return if &caps[1] == "-" { -magnitude } else { magnitude };
    }

    let lower = user_input.to_lowercase();
    if WARM_KEYWORDS.iter().any(|k| lower.contains(k)) {
        1
    } else if COLD_KEYWORDS.iter().any(|k| lower.contains(k)) {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_wins() {
        assert_eq!(affection_delta(Some(0), "anything"), 3);
        assert_eq!(affection_delta(Some(1), "I hate this"), 1);
        assert_eq!(affection_delta(Some(2), ""), -1);
        assert_eq!(affection_delta(Some(3), "hug"), -3);
    }

    #[test]
    fn test_out_of_range_position_falls_through() {
        assert_eq!(affection_delta(Some(7), "neutral words"), 0);
    }

    #[test]
    fn test_explicit_markers() {
        assert_eq!(affection_delta(None, "陪她去看烟花（好感度 +3）"), 3);
        assert_eq!(affection_delta(None, "转身离开 好感度-1"), -1);
        assert_eq!(affection_delta(None, "Affection +10 bribe"), MAX_DELTA);
        assert_eq!(affection_delta(None, "(affection - 3)"), -3);
    }

    #[test]
    fn test_keywords() {
        assert_eq!(affection_delta(None, "给她一个拥抱"), 1);
        assert_eq!(affection_delta(None, "Thank her warmly"), 1);
        assert_eq!(affection_delta(None, "装作冷漠"), -1);
        assert_eq!(affection_delta(None, "IGNORE her"), -1);
        assert_eq!(affection_delta(None, "Look at the sky"), 0);
    }
}
