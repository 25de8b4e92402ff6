//! Pure presentation mapping shared by every UI surface.

use crate::protocol::MAX_CHOICES;

const LETTERS: [char; MAX_CHOICES] = ['A', 'B', 'C', 'D'];

/// A choice as shown to the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledChoice {
    pub letter: char,
    pub text: String,
}

/// Drop blank entries, then letter the rest in order.
///
/// Letters are consumed per displayed entry, so `["Agree", "", "Disagree"]`
/// renders as `A: Agree, B: Disagree`.
pub fn render_choices(choices: &[String]) -> Vec<LabeledChoice> {
    choices
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .zip(LETTERS)
        .map(|(text, letter)| LabeledChoice {
            letter,
            text: text.to_string(),
        })
        .collect()
}

/// Five closed-open bands over the clamped gauge; the top band includes 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AffectionBand {
    Cold,
    Distant,
    Neutral,
    Friendly,
    Devoted,
}

impl AffectionBand {
    fn from_percent(percent: u8) -> Self {
        match percent {
            0..=19 => AffectionBand::Cold,
            20..=39 => AffectionBand::Distant,
            40..=59 => AffectionBand::Neutral,
            60..=79 => AffectionBand::Friendly,
            _ => AffectionBand::Devoted,
        }
    }

    /// Start and end colors of the gauge fill
    pub fn gradient(self) -> (&'static str, &'static str) {
        match self {
            AffectionBand::Cold => ("#ff6b6b", "#ffa5a5"),
            AffectionBand::Distant => ("#ffa5a5", "#ffd700"),
            AffectionBand::Neutral => ("#ffd700", "#98fb98"),
            AffectionBand::Friendly => ("#98fb98", "#87ceeb"),
            AffectionBand::Devoted => ("#87ceeb", "#4ecdc4"),
        }
    }

    /// Parse a `#rrggbb` stop into RGB components.
    pub fn rgb(hex: &str) -> Option<(u8, u8, u8)> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some((r, g, b))
    }
}

impl std::fmt::Display for AffectionBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AffectionBand::Cold => write!(f, "cold"),
            AffectionBand::Distant => write!(f, "distant"),
            AffectionBand::Neutral => write!(f, "neutral"),
            AffectionBand::Friendly => write!(f, "friendly"),
            AffectionBand::Devoted => write!(f, "devoted"),
        }
    }
}

/// Display state of the affection meter.
///
/// `value` is the raw number from the service; only `percent` is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffectionGauge {
    pub value: i64,
    pub percent: u8,
    pub band: AffectionBand,
}

impl AffectionGauge {
    pub fn new(value: i64) -> Self {
        let percent = value.clamp(0, 100) as u8;
        Self {
            value,
            percent,
            band: AffectionBand::from_percent(percent),
        }
    }
}
